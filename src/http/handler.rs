//! Main axum router and HTTP request handlers.
//!
//! Routes:
//! - `POST /repository/create` - Provision a bare repository
//! - `GET  /healthz`           - Health check
//! - `GET  /metrics`           - Prometheus metrics

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{error, instrument, warn};

use crate::metrics::Outcome;
use crate::repository::ProvisionError;
use crate::AppState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the axum [`Router`] with all HTTP routes and shared state.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/repository/create", post(handle_create_repository))
        .route("/healthz", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CreatedResponse {
    message: &'static str,
    repository_path: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /repository/create`
///
/// The body is handed to the provisioner unparsed so that parse failures
/// are reported through the same error taxonomy as every other failure.
#[instrument(skip_all)]
async fn handle_create_repository(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let started = Instant::now();
    let result = state.provisioner.create_repository(&body).await;

    let outcome = match &result {
        Ok(_) => Outcome::Created,
        Err(err) => err.outcome(),
    };
    state
        .metrics
        .metrics
        .observe_create(outcome, started.elapsed().as_secs_f64());

    let record = result?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Repository created successfully.",
            repository_path: record.path,
        }),
    )
        .into_response())
}

/// `GET /healthz`
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health_state = crate::health::HealthState {
        pool: state.pool.clone(),
        git_root: state.provisioner.git_root().into(),
    };
    crate::health::health_handler(State(health_state)).await
}

/// `GET /metrics`
async fn handle_metrics(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let buf = state
        .metrics
        .encode()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("metrics encoding failed: {e}")))?;

    Ok((
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        buf,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Application-level error type that maps cleanly to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// A create-repository request failed.
    Provision(ProvisionError),
    /// An unexpected internal error.
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Provision(err) if err.is_client_error() => {
                warn!(error = %err, "rejected request");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Provision(err) => {
                error!(error = %err, outcome = ?err.outcome(), "provisioning failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            AppError::Internal(err) => {
                error!(error = %err, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ProvisionError> for AppError {
    fn from(err: ProvisionError) -> Self {
        AppError::Provision(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
