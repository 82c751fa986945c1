//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the medbill pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedbillConfig {
    /// Which page extractor to run.
    pub extractor: ExtractorKind,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// LLM extractor configuration.
    pub llm: LlmConfig,

    /// HTTP service configuration.
    pub server: ServerConfig,
}

/// Page extractor selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// Rule-based line parser.
    #[default]
    Heuristic,
    /// Chat completions API.
    Llm,
}

impl std::str::FromStr for ExtractorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "heuristic" => Ok(ExtractorKind::Heuristic),
            "llm" => Ok(ExtractorKind::Llm),
            other => Err(format!("unknown extractor: {}", other)),
        }
    }
}

/// What to do with a page whose OCR invocation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrFailurePolicy {
    /// Fail the whole document.
    #[default]
    Fail,
    /// Log a warning and use an empty string as the page text.
    EmptyPage,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing det.onnx, latin_rec.onnx and latin_dict.txt.
    pub model_dir: PathBuf,

    /// Keep `[UNK]` markers in recognized text.
    pub keep_unk: bool,

    /// Number of OCR workers (and engine instances).
    pub workers: usize,

    /// Failure policy for individual pages.
    pub on_failure: OcrFailurePolicy,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            keep_unk: false,
            workers: 1,
            on_failure: OcrFailurePolicy::Fail,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 300,
            max_pages: 0,
        }
    }
}

/// LLM extractor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key. Usually supplied through `OPENAI_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name.
    pub model: String,

    /// API base URL (without the `/chat/completions` suffix).
    pub base_url: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4.1-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.1,
            timeout_secs: 120,
        }
    }
}

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,

    /// Directory served under `/static`.
    pub static_dir: PathBuf,

    /// Timeout for downloading documents, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            static_dir: PathBuf::from("static"),
            fetch_timeout_secs: 40,
        }
    }
}

impl MedbillConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// Recognized keys: `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_API_BASE`,
    /// `MEDBILL_OCR_MODEL_DIR`, `MEDBILL_EXTRACTOR`, `MEDBILL_BIND`.
    /// Empty values are ignored, as are unknown extractor names.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(base) = get("OPENAI_API_BASE") {
            self.llm.base_url = base;
        }
        if let Some(dir) = get("MEDBILL_OCR_MODEL_DIR") {
            self.ocr.model_dir = PathBuf::from(dir);
        }
        if let Some(kind) = get("MEDBILL_EXTRACTOR") {
            match kind.parse() {
                Ok(kind) => self.extractor = kind,
                Err(e) => tracing::warn!("ignoring MEDBILL_EXTRACTOR: {}", e),
            }
        }
        if let Some(bind) = get("MEDBILL_BIND") {
            self.server.bind = bind;
        }
    }
}
