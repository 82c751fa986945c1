use std::sync::Arc;

use medbill_core::{DocumentFetcher, Extractor};

use crate::commands::Acquirer;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub acquirer: Arc<Acquirer>,
    pub extractor: Extractor,
    pub fetcher: DocumentFetcher,
}
