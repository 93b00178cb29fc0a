//! HTTP chat server.
//!
//! Exposes the RAG pipeline to the web client as a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Run one chat turn |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! ```json
//! POST /chat
//! { "query": "Where can I park?", "history": [], "return_history": false }
//!
//! 200 OK
//! { "answer": "Car parks are available at every terminal ..." }
//! ```
//!
//! # Error Contract
//!
//! Backend failures never reach this layer; the pipeline already turned
//! them into a fallback answer or an empty context. The remaining faults
//! are logged in full and answered with a generic body so nothing internal
//! leaks to the client:
//!
//! ```json
//! { "error": { "code": "internal", "message": "An internal error occurred. Please try again later." } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser client
//! can be hosted anywhere.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use changi_rag_core::models::{ChatTurnRequest, ChatTurnResult};
use changi_rag_core::pipeline::RagPipeline;

use crate::config::Config;
use crate::services::build_pipeline;

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred. Please try again later.";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<RagPipeline>,
}

/// Starts the chat server.
///
/// Builds every backend client from `config`, binds to `[server].bind`, and
/// serves until the process is terminated. Startup errors (missing
/// credentials, unreachable index) are returned before the socket is bound.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Arc::new(build_pipeline(config).await?);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;

    tracing::info!(bind = %config.server.bind, "Chat server listening");
    serve(listener, pipeline).await
}

/// Serve the chat API on an already-bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    pipeline: Arc<RagPipeline>,
) -> anyhow::Result<()> {
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

/// Build the router with CORS and request tracing applied.
pub fn router(pipeline: Arc<RagPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pipeline })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl AppError {
    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /chat ============

/// Handler for `POST /chat`.
///
/// Each turn runs inside a `chat_turn` span carrying a fresh turn id, so
/// every log line from the rewrite, retrievals, and answer can be grouped.
/// A body that does not decode as a chat turn is a fault like any other:
/// logged here, answered with the generic error body.
async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatTurnRequest>, JsonRejection>,
) -> Result<Json<ChatTurnResult>, AppError> {
    let turn_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("chat_turn", turn_id = %turn_id);

    async move {
        let Json(req) = payload.map_err(|rejection| {
            tracing::error!(
                status = %rejection.status(),
                error = %rejection.body_text(),
                "Malformed chat request"
            );
            AppError::internal()
        })?;
        tracing::info!(history_len = req.history.len(), "Chat turn received");
        state.pipeline.run_turn(&req).await.map(Json).map_err(|e| {
            tracing::error!(error = %format!("{:#}", e), "Chat turn failed");
            AppError::internal()
        })
    }
    .instrument(span)
    .await
}
