//! Admin file listing
//!
//! Endpoints:
//! - GET /api/list - All stored files (admin only)

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::auth::{Access, Role};
use crate::db::{FileRecord, FileRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::human_readable_size;

/// One row of the listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedFile {
    pub name: String,
    pub views: i64,
    pub size: String,
    pub date: i64,
    pub deletion_url: Option<String>,
}

impl ListedFile {
    fn from_record(record: FileRecord, base_url: &str) -> Self {
        Self {
            deletion_url: record
                .deletion_token
                .map(|token| format!("{}/api/delete-file/{}", base_url, token)),
            size: human_readable_size(record.size.max(0) as u64),
            name: record.name,
            views: record.views,
            date: record.date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub files: Vec<ListedFile>,
}

/// Create the listing router
pub fn router() -> Router<AppState> {
    Router::new().route("/list", get(list_files))
}

/// List stored files; an admin password login also sets the session cookie
async fn list_files(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let cookie = match state.auth().authorize(&headers, Role::Admin)? {
        Access::Granted => None,
        Access::Issued(token) => Some(token.cookie()),
        Access::Denied | Access::NoCredentials => return Err(AppError::Unauthorized),
    };

    let files = FileRepository::new(state.db())
        .list()
        .await?
        .into_iter()
        .map(|record| ListedFile::from_record(record, state.base_url()))
        .collect();

    let mut response = Json(ListResponse { files }).into_response();
    if let Some(cookie) = cookie {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::Internal(format!("Invalid cookie value: {}", e)))?;
        response.headers_mut().insert(header::SET_COOKIE, value);
    }

    Ok(response)
}
