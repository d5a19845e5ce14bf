//! Deletion routes
//!
//! The deletion token in the path is the only credential required.
//!
//! Endpoints:
//! - GET|POST|DELETE /api/delete-file/:token - Remove a stored file and its row
//! - GET|POST|DELETE /api/delete-url/:token - Remove a short URL

use std::io;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::db::{FileRepository, UrlRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Create the deletion router (mounted under `/api`)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/delete-file/:token",
            get(delete_file).post(delete_file).delete(delete_file),
        )
        .route(
            "/delete-url/:token",
            get(delete_url).post(delete_url).delete(delete_url),
        )
}

async fn delete_file(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let repo = FileRepository::new(state.db());
    let file = repo
        .find_by_deletion_token(&token)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let path = state.config().storage.root_dir.join(&file.name);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(name = %file.name, "Stored file already missing");
        }
        Err(e) => return Err(e.into()),
    }

    repo.delete_by_deletion_token(&token).await?;
    tracing::info!(name = %file.name, "File deleted");

    Ok(Json(DeleteResponse { success: true }))
}

async fn delete_url(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let repo = UrlRepository::new(state.db());
    let url = repo
        .find_by_deletion_token(&token)
        .await?
        .ok_or_else(|| AppError::NotFound("URL not found".to_string()))?;

    repo.delete_by_deletion_token(&token).await?;
    tracing::info!(short = %url.short, "Short URL deleted");

    Ok(Json(DeleteResponse { success: true }))
}
