//! HTTP shell around the Parlance pipeline.
//!
//! Routes:
//! - `POST /translate`: run one message through the pipeline
//! - `GET /health`: liveness and configured model

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parlance_core::{Pipeline, TranslateResponse};
use parlance_shared::{ParlanceError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Request body of `POST /translate`.
#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub model: String,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/translate", post(translate))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ParlanceError::config(format!("failed to bind {addr}: {e}")))?;

    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ParlanceError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn translate(
    State(state): State<AppState>,
    body: std::result::Result<Json<TranslateRequest>, JsonRejection>,
) -> std::result::Result<Json<TranslateResponse>, ApiError> {
    let message = match body {
        Ok(Json(request)) => request.message.trim().to_string(),
        Err(rejection) => {
            warn!(error = %rejection, "rejected translate request body");
            String::new()
        }
    };

    if message.is_empty() {
        return Err(ApiError(ParlanceError::EmptyInput));
    }

    let final_state = state.pipeline.run(&message).await.map_err(ApiError)?;
    Ok(Json(TranslateResponse::from(final_state)))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.pipeline.model();
    Json(HealthResponse {
        status: "ok".into(),
        backend: model.backend_name().into(),
        model: model.model().into(),
    })
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Maps a pipeline error onto a generic JSON failure response.
#[derive(Debug)]
pub struct ApiError(pub ParlanceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ParlanceError::EmptyInput => (StatusCode::BAD_REQUEST, "No text provided"),
            ParlanceError::ModelUnavailable(_) => {
                (StatusCode::BAD_GATEWAY, "model backend unavailable")
            }
            ParlanceError::ModelOutputParse { .. } => {
                (StatusCode::BAD_GATEWAY, "model returned an unusable reply")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };

        if status.is_server_error() {
            error!(error = %self.0, %status, "translate request failed");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
