//! HTTP API server.
//!
//! Exposes the ingestion and answer pipelines as a JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/ingest/text` | Chunk, embed, and persist a document |
//! | `POST` | `/api/answer` | Answer a question via the LLM provider |
//! | `GET`  | `/api/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses use the envelope:
//!
//! ```json
//! { "error": { "code": "provider_unavailable", "message": "..." } }
//! ```
//!
//! Codes: `validation_error` (422), `empty_document` (400),
//! `configuration_error` (500), `provider_auth` (502), `provider_error`
//! (502), `provider_unavailable` (503), `malformed_output` (502),
//! `repair_failed` (502), `storage_failure` (500).
//!
//! Every request is assigned a UUID correlation id, attached to all log
//! lines for that request and echoed in the `x-request-id` response header.
//! Internal error detail never leaves the process; only the category's
//! display message does.

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::answer::generate_answer;
use crate::config::Config;
use crate::error::PipelineError;
use crate::ingest::ingest_text;
use crate::models::{AnswerRequest, AnswerResponse, IngestRequest, IngestResponse};
use crate::provider::{ProviderClient, ProviderError};
use crate::retry::RetryPolicy;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    retry: RetryPolicy,
}

/// Start the HTTP server on the configured bind address.
///
/// Runs migrations first, then serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::connect(&config.db.path).await?;
    crate::migrate::run_migrations(&pool).await?;

    let state = AppState {
        retry: RetryPolicy::new(&config.retry),
        config: Arc::new(config.clone()),
        pool,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors);

    info!(
        app = %config.app.name,
        environment = %config.app.environment,
        bind = %config.server.bind,
        "server listening"
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/ingest/text", post(handle_ingest))
        .route("/api/answer", post(handle_answer))
        .with_state(state)
}

// ============ Error response ============

/// JSON error envelope.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g. `"provider_unavailable"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&self.request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
}

/// 422 for boundary validation failures, before the core is invoked.
fn validation_error(request_id: &str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        code: "validation_error".to_string(),
        message: message.into(),
        request_id: request_id.to_string(),
    }
}

/// Map a core failure to its stable external category.
fn map_pipeline_error(request_id: &str, err: PipelineError) -> AppError {
    let status = match &err {
        PipelineError::EmptyDocument => StatusCode::BAD_REQUEST,
        PipelineError::Configuration(_) | PipelineError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        PipelineError::Provider(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Provider(ProviderError::Auth(_)) => StatusCode::BAD_GATEWAY,
        PipelineError::Provider(_)
        | PipelineError::MalformedOutput(_)
        | PipelineError::RepairFailed(_) => StatusCode::BAD_GATEWAY,
    };

    let code = err.code();
    error!(request_id, code, error = %err, "request failed");

    AppError {
        status,
        code: code.to_string(),
        message: err.to_string(),
        request_id: request_id.to_string(),
    }
}

fn with_request_id<T: Serialize>(request_id: String, body: T) -> Response {
    let mut response = Json(body).into_response();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/ingest/text ============

/// Chunk, embed, and persist one document.
///
/// Rejects empty `source` and `text` shorter than 10 characters with 422
/// before the pipeline runs; a text that chunks to nothing is a 400.
async fn handle_ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4().to_string();
    info!(
        request_id,
        source = %request.source,
        text_chars = request.text.chars().count(),
        "ingest request received"
    );

    if request.source.trim().is_empty() {
        return Err(validation_error(&request_id, "source must not be empty"));
    }
    if request.text.chars().count() < 10 {
        return Err(validation_error(
            &request_id,
            "text must be at least 10 characters",
        ));
    }

    // Provider client is acquired per call; a missing credential surfaces
    // here as a configuration fault without any network traffic.
    let provider = ProviderClient::new(&state.config.provider)
        .map_err(|e| map_pipeline_error(&request_id, e))?;

    let outcome: IngestResponse = ingest_text(
        &state.pool,
        &provider,
        &state.retry,
        &state.config.chunking,
        request.source.trim(),
        &request.text,
        request.metadata.as_ref(),
    )
    .await
    .map_err(|e| map_pipeline_error(&request_id, e))?;

    info!(
        request_id,
        document_id = %outcome.document_id,
        chunks_created = outcome.chunks_created,
        "ingest request succeeded"
    );
    Ok(with_request_id(request_id, outcome))
}

// ============ POST /api/answer ============

/// Answer a question through the LLM provider.
async fn handle_answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4().to_string();
    info!(
        request_id,
        question_chars = request.question.chars().count(),
        has_context = request.context.is_some(),
        "answer request received"
    );

    if request.question.chars().count() < 3 {
        return Err(validation_error(
            &request_id,
            "question must be at least 3 characters",
        ));
    }

    let provider = ProviderClient::new(&state.config.provider)
        .map_err(|e| map_pipeline_error(&request_id, e))?;

    let answer: AnswerResponse = generate_answer(&provider, &state.retry, &request)
        .await
        .map_err(|e| map_pipeline_error(&request_id, e))?;

    info!(request_id, confidence = answer.confidence, "answer request succeeded");
    Ok(with_request_id(request_id, answer))
}
