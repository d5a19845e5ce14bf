//! Static UI
//!
//! - GET / - Redirect to the upload page
//! - GET /public/* - Files from the public directory

use std::path::Path;

use axum::response::Response;
use tower_http::services::ServeDir;

use crate::routes::found;

/// Serve the public directory; directories resolve to their `index.html`
pub fn service(public_dir: &Path) -> ServeDir {
    ServeDir::new(public_dir).append_index_html_on_directories(true)
}

pub async fn redirect_to_ui() -> Response {
    found("/public/")
}
