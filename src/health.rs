use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use sqlx::AnyPool;

use crate::store;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HealthChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
    pub git_root: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    fn healthy(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: Some(detail.into()),
        }
    }

    fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state expected by the handler
// ---------------------------------------------------------------------------

/// Minimal subset of `AppState` required by the health-check handler.
#[derive(Clone)]
pub struct HealthState {
    pub pool: AnyPool,
    pub git_root: PathBuf,
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

async fn check_database(pool: &AnyPool) -> CheckResult {
    match store::count_repositories(pool).await {
        Ok(count) => CheckResult::healthy(format!("{count} repositories recorded")),
        Err(e) => CheckResult::unhealthy(format!("query failed: {e}")),
    }
}

async fn check_git_root(git_root: &Path) -> CheckResult {
    match tokio::fs::metadata(git_root).await {
        Ok(meta) if !meta.is_dir() => {
            CheckResult::unhealthy(format!("{} is not a directory", git_root.display()))
        }
        Ok(meta) if meta.permissions().readonly() => {
            CheckResult::unhealthy(format!("{} is read-only", git_root.display()))
        }
        Ok(_) => CheckResult::healthy(git_root.display().to_string()),
        Err(e) => CheckResult::unhealthy(format!("{}: {e}", git_root.display())),
    }
}

// ---------------------------------------------------------------------------
// Aggregate status
// ---------------------------------------------------------------------------

fn aggregate_status(checks: &HealthChecks) -> HealthStatus {
    if checks.database.ok && checks.git_root.ok {
        HealthStatus::Ok
    } else if !checks.database.ok {
        // Nothing can be provisioned without the metadata store.
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Degraded
    }
}

// ---------------------------------------------------------------------------
// Axum handler
// ---------------------------------------------------------------------------

/// `GET /healthz` handler.  Returns 200 on Ok/Degraded, 503 on Unhealthy.
pub async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let (database, git_root) = tokio::join!(
        check_database(&state.pool),
        check_git_root(&state.git_root),
    );

    let checks = HealthChecks { database, git_root };
    let status = aggregate_status(&checks);
    let body = HealthResponse { status, checks };

    let http_status = match status {
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(database: bool, git_root: bool) -> HealthChecks {
        let result = |ok| CheckResult { ok, detail: None };
        HealthChecks {
            database: result(database),
            git_root: result(git_root),
        }
    }

    #[test]
    fn aggregate_prefers_database() {
        assert_eq!(aggregate_status(&checks(true, true)), HealthStatus::Ok);
        assert_eq!(aggregate_status(&checks(true, false)), HealthStatus::Degraded);
        assert_eq!(aggregate_status(&checks(false, true)), HealthStatus::Unhealthy);
        assert_eq!(aggregate_status(&checks(false, false)), HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn git_root_must_be_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(check_git_root(tmp.path()).await.ok);

        let file = tmp.path().join("file");
        std::fs::write(&file, "").unwrap();
        assert!(!check_git_root(&file).await.ok);
        assert!(!check_git_root(&tmp.path().join("missing")).await.ok);
    }
}
