//! Remote document download.

use std::time::Duration;

use tracing::{debug, info};

use crate::document::{Document, DocumentKind};
use crate::error::{BillError, FetchError, Result};

/// Downloads bill documents over HTTP.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    http_client: reqwest::Client,
}

impl DocumentFetcher {
    /// Create a fetcher with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BillError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }

    /// Download a document and detect its type from the response
    /// content type and the URL.
    pub async fn fetch(&self, url: &str) -> Result<Document> {
        debug!("Downloading {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let kind = DocumentKind::detect(content_type.as_deref(), url);
        info!("Downloaded {} bytes ({}) from {}", bytes.len(), kind, url);

        Ok(Document::new(bytes.to_vec(), kind))
    }
}
