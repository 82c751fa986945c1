use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, info};

use medbill_core::models::bill::ExtractRequest;
use medbill_core::ExtractResponse;

use crate::commands::extract;
use crate::server::state::AppState;

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "detail": message.into() })),
    )
        .into_response()
}

/// Only absolute http(s) URLs are accepted as documents.
fn validate_document_url(document: &str) -> Result<(), String> {
    let url = reqwest::Url::parse(document).map_err(|e| format!("invalid document URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported URL scheme: {}", other)),
    }
}

pub async fn extract_bill_data(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return detail(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text());
        }
    };

    if let Err(message) = validate_document_url(&req.document) {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, message);
    }

    match run_extraction(&state, &req.document).await {
        Ok(response) => {
            info!(
                "Extracted {} item(s) from {}",
                response.data.total_item_count, req.document
            );
            Json(response).into_response()
        }
        Err(e) => {
            error!("Extraction failed for {}: {:#}", req.document, e);
            detail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn run_extraction(state: &AppState, url: &str) -> anyhow::Result<ExtractResponse> {
    let document = state.fetcher.fetch(url).await?;
    extract(state.acquirer.clone(), &state.extractor, document).await
}
