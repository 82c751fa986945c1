//! Core library for medical bill line-item extraction.
//!
//! This crate provides:
//! - Page text acquisition (native PDF text, OCR fallback for scanned pages)
//! - Heuristic line-item parsing and page classification
//! - An LLM-backed page extractor behind the same interface
//! - Bill data models and the extraction response schema

pub mod acquire;
pub mod bill;
pub mod document;
pub mod error;
#[cfg(feature = "remote")]
pub mod fetch;
#[cfg(feature = "remote")]
pub mod llm;
pub mod models;
pub mod ocr;
pub mod pdf;

pub use acquire::TextAcquirer;
pub use bill::{
    classify_page, extract_document, extract_pages, is_summary_line, parse_line,
    DocumentExtraction, Extractor, HeuristicExtractor, PageExtraction, PageExtractor,
};
pub use document::{Document, DocumentKind};
pub use error::{BillError, Result};
pub use models::bill::{BillItem, ExtractResponse, PageResult, PageType, TokenUsage};
pub use models::config::MedbillConfig;
pub use ocr::{OcrBackend, UnavailableOcr};
#[cfg(feature = "native")]
pub use ocr::OcrEnginePool;
pub use pdf::{PdfExtractor, PdfProcessor};

#[cfg(feature = "remote")]
pub use fetch::DocumentFetcher;
#[cfg(feature = "remote")]
pub use llm::LlmExtractor;
