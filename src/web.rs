use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::services::ServeDir;

use crate::config::{Config, Thresholds};
use crate::error::AnalysisError;
use crate::types::{Analysis, ColumnMapping, CsvPreview, GENERATED_TIMESTAMP, GENERATED_TX_ID};
use crate::{analyze_csv, ingest, selfcheck};

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

struct AppState {
    thresholds: Thresholds,
}

/// Optional column mapping passed as query parameters on `/api/analyze`.
/// Either none or all of sender, receiver and amount must be present.
#[derive(Debug, Default, Deserialize)]
pub struct MappingParams {
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub amount: Option<String>,
    pub timestamp: Option<String>,
    pub transaction_id: Option<String>,
}

impl MappingParams {
    fn into_mapping(self) -> Result<Option<ColumnMapping>, ApiError> {
        match (self.sender_id, self.receiver_id, self.amount) {
            (None, None, None) => Ok(None),
            (Some(sender_id), Some(receiver_id), Some(amount)) => Ok(Some(ColumnMapping {
                sender_id,
                receiver_id,
                amount,
                timestamp: self.timestamp.unwrap_or_else(|| GENERATED_TIMESTAMP.to_string()),
                transaction_id: self.transaction_id.unwrap_or_else(|| GENERATED_TX_ID.to_string()),
            })),
            _ => Err(ApiError::BadRequest(
                "mapping needs sender_id, receiver_id and amount together".to_string(),
            )),
        }
    }
}

pub enum ApiError {
    Analysis(AnalysisError),
    BadRequest(String),
    Internal(String),
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        ApiError::Analysis(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Analysis(AnalysisError::NeedsMapping { headers }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "NEEDS_MAPPING", "headers": headers })),
            )
                .into_response(),
            ApiError::Analysis(e) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg }))).into_response()
            }
        }
    }
}

/// API routes, with `static_dir` served for everything else.
pub fn router(thresholds: Thresholds, static_dir: impl AsRef<Path>) -> Router {
    let state = Arc::new(AppState { thresholds });

    Router::new()
        .route("/api/health", get(health))
        .route("/api/preview", post(preview))
        .route("/api/analyze", post(analyze))
        .route("/api/test-detection", get(test_detection))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .with_state(state)
}

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let app = router(config.detection.clone(), &config.server.static_dir);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    tracing::info!(
        addr = %config.server.bind,
        static_dir = %config.server.static_dir.display(),
        "serving analysis API"
    );
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn preview(body: String) -> Result<Json<CsvPreview>, ApiError> {
    Ok(Json(ingest::preview_csv(&body)?))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MappingParams>,
    body: String,
) -> Result<Json<Analysis>, ApiError> {
    let mapping = params.into_mapping()?;
    tracing::debug!(bytes = body.len(), mapped = mapping.is_some(), "analyze request");

    // The engine is synchronous and CPU-bound.
    let analysis = tokio::task::spawn_blocking(move || analyze_csv(&body, mapping.as_ref(), &state.thresholds))
        .await
        .map_err(|e| ApiError::Internal(format!("analysis task failed: {e}")))??;
    Ok(Json(analysis))
}

async fn test_detection(State(state): State<Arc<AppState>>) -> Result<Json<selfcheck::SelfCheckResult>, ApiError> {
    let result = tokio::task::spawn_blocking(move || selfcheck::run(&state.thresholds))
        .await
        .map_err(|e| ApiError::Internal(format!("self-check task failed: {e}")))??;
    Ok(Json(result))
}
