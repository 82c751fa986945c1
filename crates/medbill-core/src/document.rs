//! Input documents and their declared type.

use serde::{Deserialize, Serialize};

/// Declared document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Multi-page PDF, possibly without a text layer.
    #[default]
    Pdf,
    /// Single raster image.
    Image,
}

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".tif", ".tiff"];

impl DocumentKind {
    /// Guess the type of a remote document.
    ///
    /// A PDF content type or a `.pdf` URL wins, then an image extension
    /// anywhere in the URL, then an image content type. Anything else is
    /// treated as PDF.
    pub fn detect(content_type: Option<&str>, url: &str) -> Self {
        let content_type = content_type.unwrap_or("").to_lowercase();
        let url = url.to_lowercase();

        if content_type.contains("pdf") || url.ends_with(".pdf") {
            return DocumentKind::Pdf;
        }
        if IMAGE_EXTENSIONS.iter().any(|ext| url.contains(ext)) {
            return DocumentKind::Image;
        }
        if content_type.contains("image") {
            return DocumentKind::Image;
        }
        DocumentKind::Pdf
    }

    /// Guess the type of a local file from its extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" => Some(DocumentKind::Image),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Pdf => f.write_str("pdf"),
            DocumentKind::Image => f.write_str("image"),
        }
    }
}

/// Raw document bytes with their declared type.
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Vec<u8>,
    kind: DocumentKind,
}

impl Document {
    pub fn new(bytes: Vec<u8>, kind: DocumentKind) -> Self {
        Self { bytes, kind }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }
}
