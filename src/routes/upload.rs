//! Upload Routes
//!
//! Endpoints:
//! - POST /api/upload - Stream a multipart file upload into storage
//!
//! Required headers:
//! - `Content-Type: multipart/form-data; boundary=...`
//! - `x-file-name: <url-encoded original name>`
//!
//! Credentials come from the session cookie or `x-password`; when neither
//! is present the `password` form field is checked once the body is read,
//! and the file may be at most `UPLOAD_ANON_MAX_BYTES` long.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::{Access, Role};
use crate::error::error_response;
use crate::state::AppState;
use crate::storage::sanitize_file_name;
use crate::upload::{ingest, parse_boundary, Finalizer, UploadError, UploadResponse};

/// Header carrying the original file name
pub const FILE_NAME_HEADER: &str = "x-file-name";

// ============================================================================
// Error Response
// ============================================================================

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Upload failed: {}", self);
        } else {
            tracing::debug!("Upload rejected: {}", self);
        }

        error_response(status, self.public_message())
    }
}

// ============================================================================
// Router
// ============================================================================

/// Create the upload router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::disable())
}

// ============================================================================
// Handlers
// ============================================================================

/// Stream one file upload to disk
async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<UploadResponse>, UploadError> {
    let access = state.auth().authorize(&headers, Role::User).map_err(|e| {
        tracing::error!("Authorization failed: {}", e);
        UploadError::Unauthorized
    })?;
    let preauthorized = match access {
        Access::Granted | Access::Issued(_) => true,
        Access::Denied => return Err(UploadError::Unauthorized),
        Access::NoCredentials => false,
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| UploadError::MalformedRequest("Invalid content type".to_string()))?;
    let boundary =
        parse_boundary(content_type).map_err(|e| UploadError::MalformedRequest(e.to_string()))?;

    let raw_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| UploadError::MalformedRequest("No filename provided".to_string()))?;
    let file_name = sanitize_file_name(raw_name)
        .ok_or_else(|| UploadError::MalformedRequest("Invalid filename".to_string()))?;

    let session_id = Uuid::new_v4();
    let span = tracing::info_span!("upload", %session_id, file_name = %file_name);

    async move {
        let config = state.config();
        let limits = if preauthorized {
            config.upload.limits()
        } else {
            config.upload.anonymous_limits()
        };
        let ingested = ingest(
            &config.storage.temp_dir,
            &file_name,
            &boundary,
            &limits,
            body.into_data_stream(),
        )
        .await?;

        if !preauthorized
            && !state
                .auth()
                .check_user_password(ingested.report.password.as_deref())
        {
            // Dropping the upload removes its temp file
            return Err(UploadError::Unauthorized);
        }

        let finalizer = Finalizer::new(&config.storage.root_dir, state.names());
        let result = finalizer
            .finalize(state.db(), state.base_url(), ingested, &file_name)
            .await?;

        tracing::info!(
            name = %result.final_name,
            size = result.byte_size,
            "Upload stored"
        );

        Ok(Json(UploadResponse::from(&result)))
    }
    .instrument(span)
    .await
}
