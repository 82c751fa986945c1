//! Subcommands and the setup they share.

pub mod batch;
pub mod config;
pub mod parse;
pub mod process;
pub mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::warn;

use medbill_core::models::config::ExtractorKind;
use medbill_core::{
    extract_document, Document, DocumentFetcher, DocumentKind, ExtractResponse, Extractor,
    MedbillConfig, OcrBackend, OcrEnginePool, TextAcquirer, UnavailableOcr,
};

/// Acquirer over whichever OCR backend could be loaded.
pub type Acquirer = TextAcquirer<Box<dyn OcrBackend>>;

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("medbill")
        .join("config.json")
}

/// Load the config file (explicit path, else the default one if present)
/// and overlay the environment.
pub fn load_config(path: Option<&str>) -> anyhow::Result<MedbillConfig> {
    let mut config = match path {
        Some(path) => MedbillConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to read config file {}", path))?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                MedbillConfig::from_file(&default_path).with_context(|| {
                    format!("Failed to read config file {}", default_path.display())
                })?
            } else {
                MedbillConfig::default()
            }
        }
    };
    config.apply_env();
    Ok(config)
}

/// Command-line overrides shared by the extraction commands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ExtractionOverrides {
    /// Page extractor to use (heuristic or llm)
    #[arg(short, long)]
    extractor: Option<ExtractorKind>,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Number of parallel OCR workers
    #[arg(long)]
    ocr_workers: Option<usize>,
}

impl ExtractionOverrides {
    pub fn apply(&self, config: &mut MedbillConfig) {
        if let Some(kind) = self.extractor {
            config.extractor = kind;
        }
        if let Some(dir) = &self.model_dir {
            config.ocr.model_dir = dir.clone();
        }
        if let Some(workers) = self.ocr_workers {
            config.ocr.workers = workers;
        }
    }
}

/// Build the page text acquirer. Missing OCR models are not fatal:
/// pages with a text layer still work and scanned pages report the
/// load error.
pub fn build_acquirer(config: &MedbillConfig) -> anyhow::Result<Acquirer> {
    let ocr: Box<dyn OcrBackend> = match OcrEnginePool::from_config(&config.ocr) {
        Ok(pool) => Box::new(pool),
        Err(e) => {
            warn!(
                "OCR models unavailable at {}, scanned pages will fail: {}",
                config.ocr.model_dir.display(),
                e
            );
            Box::new(UnavailableOcr::new(e.to_string()))
        }
    };
    Ok(TextAcquirer::new(ocr, config)?)
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read a local bill file, or download it when `input` is a URL.
pub async fn load_document(input: &str, config: &MedbillConfig) -> anyhow::Result<Document> {
    if is_url(input) {
        let fetcher = DocumentFetcher::new(Duration::from_secs(config.server.fetch_timeout_secs))?;
        return Ok(fetcher.fetch(input).await?);
    }

    let path = Path::new(input);
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    let kind = DocumentKind::from_path(path)
        .with_context(|| format!("Unsupported file format: {}", path.display()))?;
    let bytes = std::fs::read(path)?;
    Ok(Document::new(bytes, kind))
}

/// Acquire page texts on the blocking pool, then run the extractor.
pub async fn extract(
    acquirer: Arc<Acquirer>,
    extractor: &Extractor,
    document: Document,
) -> anyhow::Result<ExtractResponse> {
    let pages = tokio::task::spawn_blocking(move || acquirer.acquire(&document)).await??;
    let extraction = extract_document(extractor, &pages).await?;
    Ok(extraction.into_response())
}
