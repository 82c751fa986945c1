//! HTTP service exposing the extraction pipeline.

pub mod handlers;
pub mod state;

use std::path::Path;
use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub use state::AppState;

pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/extract-bill-data", post(handlers::extract_bill_data))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use medbill_core::{DocumentFetcher, Extractor, MedbillConfig, OcrBackend, TextAcquirer, UnavailableOcr};

    async fn spawn_server(static_dir: &Path) -> String {
        let config = MedbillConfig::default();
        let ocr: Box<dyn OcrBackend> = Box::new(UnavailableOcr::new("no models in tests"));
        let state = Arc::new(AppState {
            acquirer: Arc::new(TextAcquirer::new(ocr, &config).unwrap()),
            extractor: Extractor::from_config(&config).unwrap(),
            fetcher: DocumentFetcher::new(Duration::from_secs(2)).unwrap(),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state, static_dir);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_invalid_url_is_unprocessable() {
        let base = spawn_server(Path::new("static")).await;
        let response = reqwest::Client::new()
            .post(format!("{}/extract-bill-data", base))
            .json(&json!({ "document": "not a url" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 422);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("invalid document URL"));
    }

    #[tokio::test]
    async fn test_malformed_body_gets_detail() {
        let base = spawn_server(Path::new("static")).await;
        let client = reqwest::Client::new();

        for body in [r#"{"url": "https://example.com/bill.pdf"}"#, "{not json"] {
            let response = client
                .post(format!("{}/extract-bill-data", base))
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await
                .unwrap();

            assert_eq!(response.status().as_u16(), 422, "body {:?}", body);
            let json: Value = response.json().await.unwrap();
            assert!(json["detail"].is_string(), "body {:?}", body);
        }
    }

    #[tokio::test]
    async fn test_download_failure_is_server_error() {
        let base = spawn_server(Path::new("static")).await;
        let response = reqwest::Client::new()
            .post(format!("{}/extract-bill-data", base))
            .json(&json!({ "document": "http://127.0.0.1:9/bill.pdf" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 500);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().starts_with("fetch error"));
    }

    #[tokio::test]
    async fn test_extracts_image_served_by_itself() {
        // The server fetches a PNG from its own static dir; without OCR
        // models the page fails to load, which surfaces as a 500.
        let dir = std::env::temp_dir().join(format!("medbill-static-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        image::DynamicImage::new_luma8(4, 4)
            .save(dir.join("scan.png"))
            .unwrap();

        let base = spawn_server(&dir).await;
        let client = reqwest::Client::new();

        let served = client.get(format!("{}/static/scan.png", base)).send().await.unwrap();
        assert_eq!(served.status().as_u16(), 200);

        let response = client
            .post(format!("{}/extract-bill-data", base))
            .json(&json!({ "document": format!("{}/static/scan.png", base) }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 500);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("failed to load model"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_cors_is_permissive() {
        let base = spawn_server(Path::new("static")).await;
        let response = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{}/extract-bill-data", base))
            .header("Origin", "http://example.com")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }
}
