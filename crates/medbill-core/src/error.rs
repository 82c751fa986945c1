//! Error types for the medbill-core library.

use thiserror::Error;

/// Main error type for the medbill library.
#[derive(Error, Debug)]
pub enum BillError {
    /// The document could not be opened as its declared type.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// LLM extraction error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Document download error.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised when document bytes cannot be parsed as the declared type.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// The page would rasterize to more pixels than allowed.
    #[error("page {page} too large to render: {width}x{height} pixels")]
    PageTooLarge { page: u32, width: u64, height: u64 },

    /// The image bytes could not be decoded.
    #[error("unreadable image: {0}")]
    UnreadableImage(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The OCR worker pool could not be built.
    #[error("worker pool: {0}")]
    WorkerPool(String),
}

/// Errors from the LLM-backed page extractor.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// Non-success HTTP status.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response envelope did not match the chat completions schema.
    #[error("malformed response: {0}")]
    Response(String),
}

/// Errors from downloading a remote document.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// Non-success HTTP status.
    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },
}

/// Result type for the medbill library.
pub type Result<T> = std::result::Result<T, BillError>;
