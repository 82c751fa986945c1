//! Parse command - run the heuristic parser on page text.
//!
//! Useful for checking the parser against text produced by another tool,
//! such as `pdftotext`, which separates pages with form feeds.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;

use medbill_core::{extract_pages, DocumentExtraction};

use crate::output::{format_response, OutputFormat};

const PAGE_SEPARATOR: char = '\x0c';

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Text file, pages separated by form feeds
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ParseArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let text = fs::read_to_string(&args.input)?;
    let pages = split_pages(&text);

    let response = DocumentExtraction {
        pages: extract_pages(&pages),
        usage: Default::default(),
    }
    .into_response();

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

    Ok(())
}

/// Split text into pages. A trailing form feed does not open a new page.
fn split_pages(text: &str) -> Vec<&str> {
    let mut pages: Vec<&str> = text.split(PAGE_SEPARATOR).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}
