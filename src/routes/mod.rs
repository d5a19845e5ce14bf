//! Route modules for Stash server

pub mod delete;
pub mod files;
pub mod health;
pub mod list;
pub mod public;
pub mod shorten;
pub mod upload;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// `302 Found` to `location`
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
