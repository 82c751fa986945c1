//! Heuristic bill line-item extraction.
//!
//! Pure, synchronous functions: summary-line detection, line parsing and
//! page classification, plus the page-wise orchestrator and the
//! [`PageExtractor`] capability shared with the LLM extractor.

mod line;
mod page;
pub mod patterns;
mod pipeline;
mod summary;

pub use line::parse_line;
pub use page::classify_page;
pub use pipeline::{
    extract_document, extract_pages, DocumentExtraction, Extractor, HeuristicExtractor,
    PageExtraction, PageExtractor,
};
pub use summary::is_summary_line;
