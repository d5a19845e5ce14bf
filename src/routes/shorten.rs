//! URL shortening routes
//!
//! Endpoints:
//! - POST /api/shorten - Create a short URL (multipart or urlencoded form)
//! - GET /u/:short - Redirect to the stored URL

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::header,
    response::Response,
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{Access, Role};
use crate::db::UrlRepository;
use crate::error::{AppError, Result};
use crate::routes::found;
use crate::state::AppState;
use crate::storage::names::{deletion_token, NAME_ALPHABET};
use crate::storage::NameMode;

/// Longest custom short code accepted
const MAX_SHORT_LEN: usize = 64;

/// Fields accepted by `POST /api/shorten`
#[derive(Debug, Default, Deserialize)]
pub struct ShortenForm {
    pub url: Option<String>,
    pub short: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub success: bool,
    pub filename: String,
    pub url: String,
    pub date: i64,
    pub deletion_url: String,
}

/// Create the shortening router (mounted under `/api`)
pub fn router() -> Router<AppState> {
    Router::new().route("/shorten", post(shorten))
}

/// Create the redirect router (mounted under `/u`)
pub fn redirect_router() -> Router<AppState> {
    Router::new().route("/:short", get(resolve))
}

async fn shorten(State(state): State<AppState>, request: Request) -> Result<Json<ShortenResponse>> {
    let access = state.auth().authorize(request.headers(), Role::User)?;
    let form = read_form(&state, request).await?;

    let authorized = match access {
        Access::Granted | Access::Issued(_) => true,
        Access::Denied => false,
        Access::NoCredentials => state.auth().check_user_password(form.password.as_deref()),
    };
    if !authorized {
        return Err(AppError::Unauthorized);
    }

    let target = form
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Invalid request".to_string()))?;
    validate_url(&target)?;

    let short = match form.short.filter(|s| !s.is_empty()) {
        Some(short) => {
            validate_short(&short)?;
            short
        }
        None => state.names().generate("", NameMode::Url),
    };

    let token = deletion_token();
    let date = Utc::now().timestamp_millis();

    match UrlRepository::new(state.db())
        .insert(&short, &token, &target, date)
        .await
    {
        Ok(()) => {}
        Err(AppError::UniqueConstraint(_)) => {
            return Err(AppError::BadRequest("Short URL already exists".to_string()));
        }
        Err(e) => return Err(e),
    }

    tracing::info!(short = %short, "Short URL created");

    let base_url = state.base_url();
    Ok(Json(ShortenResponse {
        success: true,
        url: format!("{}/u/{}", base_url, short),
        filename: short,
        date,
        deletion_url: format!("{}/api/delete-url/{}", base_url, token),
    }))
}

/// Follow a short URL, counting the view
async fn resolve(State(state): State<AppState>, Path(short): Path<String>) -> Result<Response> {
    let repo = UrlRepository::new(state.db());
    let url = repo
        .find_by_short(&short)
        .await?
        .ok_or_else(|| AppError::NotFound("URL not found".to_string()))?;

    repo.increment_views(&short).await?;

    Ok(found(&url.url))
}

/// Read the form from either encoding the upload page and scripts use
async fn read_form(state: &AppState, request: Request) -> Result<ShortenForm> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false);

    if !is_multipart {
        let Form(form) = Form::<ShortenForm>::from_request(request, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        return Ok(form);
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut form = ShortenForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        match name.as_str() {
            "url" => form.url = Some(value),
            "short" => form.short = Some(value),
            "password" => form.password = Some(value),
            _ => {}
        }
    }

    Ok(form)
}

fn validate_url(value: &str) -> Result<()> {
    let parsed = url::Url::parse(value.trim())
        .map_err(|_| AppError::BadRequest("Invalid URL".to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(AppError::BadRequest("Invalid URL".to_string())),
    }
}

/// Custom short codes use the same characters as generated ones
fn validate_short(short: &str) -> Result<()> {
    if short.len() > MAX_SHORT_LEN || !short.bytes().all(|b| NAME_ALPHABET.contains(&b)) {
        return Err(AppError::BadRequest("Invalid short URL".to_string()));
    }
    Ok(())
}
