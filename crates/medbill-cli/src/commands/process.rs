//! Process command - extract line items from a single bill.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use medbill_core::Extractor;

use super::{build_acquirer, extract, load_config, load_document, ExtractionOverrides};
use crate::output::{format_response, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image) or http(s) URL
    #[arg(required = true)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    overrides: ExtractionOverrides,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.overrides.apply(&mut config);

    info!("Processing {}", args.input);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Loading document...");
    let document = load_document(&args.input, &config).await?;

    pb.set_message("Loading OCR models...");
    let acquirer = Arc::new(build_acquirer(&config)?);
    let extractor = Extractor::from_config(&config)?;
    debug!("Using {} extractor", extractor.name());

    pb.set_message(format!("Extracting line items ({})...", document.kind()));
    let response = extract(acquirer, &extractor, document).await;
    pb.finish_and_clear();
    let response = response?;

    let output = format_response(&response, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!(
        "{} item(s) on {} page(s) in {:?}",
        response.data.total_item_count,
        response.data.pagewise_line_items.len(),
        start.elapsed()
    );

    Ok(())
}
