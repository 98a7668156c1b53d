//! Document Processing API — upload → rasterize → layout parse → LLM evaluation.

mod config;
mod error;
mod etl;
mod evaluation;
mod layout;
mod openrouter;
mod raster;
mod schema;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Settings;
use error::ApiError;
use etl::EtlPipeline;
use evaluation::EvaluationAgent;
use layout::sidecar::LayoutSidecar;
use openrouter::OpenRouterClient;
use raster::RasterizerSidecar;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<EtlPipeline>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_processor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    tokio::fs::create_dir_all(&settings.page_image_dir).await?;
    tokio::fs::create_dir_all(&settings.parsed_sections_dir).await?;

    // One HTTP client shared by the sidecars and the LLM gateway
    let http = reqwest::Client::new();
    let rasterizer = RasterizerSidecar::new(settings.rasterizer_url.clone(), http.clone());
    let detector = LayoutSidecar::new(settings.layout_model_url.clone(), http.clone());
    let agent = EvaluationAgent::new(OpenRouterClient::from_env(http)?);
    info!("OpenRouter client initialized");

    let pipeline = EtlPipeline::new(
        Arc::new(rasterizer),
        Arc::new(detector),
        agent,
        settings.page_image_dir.clone(),
        settings.parsed_sections_dir.clone(),
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let app = Router::new()
        .route("/", get(read_root))
        .route("/health", get(health))
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    info!("Server listening on http://{}", settings.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn read_root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Document Processing API" }))
}

/// Upload a document and run the full extraction pipeline.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let start = Instant::now();

    // Read the uploaded file
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("document").to_string();
            file_data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
                .to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err(ApiError::bad_request("No file uploaded"));
    }

    info!("Received file: {} ({} bytes)", filename, file_data.len());

    // Spool the upload to a scoped temp file; removed on drop, so every exit
    // path below releases it.
    let temp_file = spool_upload(&filename, &file_data).await?;

    let image_paths = state
        .pipeline
        .convert_document_to_images(temp_file.path(), &filename)
        .await?;
    let pages = state.pipeline.parse_document_pages(&image_paths).await?;
    let final_output = state.pipeline.evaluate(&pages).await?;

    info!(
        "Total processing time: {:.2} seconds",
        start.elapsed().as_secs_f64()
    );
    Ok(Json(final_output))
}

/// Write the upload to a temp file preserving the original extension, so the
/// rasterizer can sniff the format from the name.
async fn spool_upload(filename: &str, data: &[u8]) -> Result<tempfile::NamedTempFile, ApiError> {
    let suffix = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let temp_file = tempfile::Builder::new()
        .prefix("upload_")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| ApiError::internal(format!("Failed to create temp file: {}", e)))?;

    tokio::fs::write(temp_file.path(), data)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to write temp file: {}", e)))?;

    Ok(temp_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn welcome_payload_is_fixed() {
        let Json(value) = read_root().await;
        assert_eq!(value["message"], "Welcome to the Document Processing API");
    }

    #[tokio::test]
    async fn temp_file_keeps_extension_and_is_removed_on_drop() {
        let temp = spool_upload("contract.pdf", b"%PDF-1.4").await.unwrap();
        let path = temp.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");

        drop(temp);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn extensionless_upload_still_spools() {
        let temp = spool_upload("README", b"plain text").await.unwrap();
        assert!(temp.path().exists());
    }
}
