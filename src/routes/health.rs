//! Health check endpoint
//!
//! Reports `degraded` with 503 when the metadata store or the upload
//! directory cannot be reached.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub database: bool,
    pub storage: bool,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match sqlx::query("SELECT 1").execute(state.db()).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Health check: database unavailable: {}", e);
            false
        }
    };
    let storage = tokio::fs::metadata(&state.config().storage.root_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let (code, status) = if database && storage {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            service: "stash-server",
            database,
            storage,
        }),
    )
}
