//! Health & readiness handlers.
//!
//! - GET /api/health -> simple liveness
//! - GET /api/ready  -> readiness that checks gallery disk I/O

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /api/health`
///
/// Liveness probe. Always 200 and never performs I/O.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            message: "Server is running",
        }),
    )
}

/// `GET /api/ready`
///
/// Performs a write/read/delete round trip in the gallery directory.
/// HTTP 200 when it passes, HTTP 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    // The probe name has no image extension, so List never reports it.
    let tmp_path = state
        .gallery
        .root()
        .join(format!(".readyz-{}", Uuid::new_v4()));
    let disk_check = match fs::write(&tmp_path, b"readyz").await {
        Ok(_) => match fs::read(&tmp_path).await {
            Ok(bytes) if bytes == b"readyz" => match fs::remove_file(&tmp_path).await {
                Ok(_) => CheckStatus::ok(),
                Err(e) => CheckStatus {
                    error: Some(format!("could not remove tmp file: {}", e)),
                    ..CheckStatus::ok()
                },
            },
            Ok(_) => {
                let _ = fs::remove_file(&tmp_path).await;
                CheckStatus::failed("file content mismatch".to_string())
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp_path).await;
                CheckStatus::failed(format!("could not read tmp file: {}", e))
            }
        },
        Err(e) => CheckStatus::failed(format!("could not write tmp file: {}", e)),
    };

    if !disk_check.ok {
        tracing::warn!(error = ?disk_check.error, "gallery directory readiness check failed");
    }

    let overall_ok = disk_check.ok;
    let mut checks = HashMap::new();
    checks.insert("disk", disk_check);
    // Mail is informational: log-only mode is a valid configuration.
    checks.insert(
        "mail",
        CheckStatus {
            mode: Some(state.contact.mode_name()),
            ..CheckStatus::ok()
        },
    );

    let body = ReadyResponse {
        status: if overall_ok { "ok" } else { "error" },
        checks,
    };
    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<&'static str>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
            mode: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            ok: false,
            error: Some(error),
            mode: None,
        }
    }
}
