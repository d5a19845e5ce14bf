//! Stash Server Library
//!
//! Self-hosted file uploads and link shortening. The interesting part is
//! [`upload`]: a streaming multipart ingester that stores files of any size
//! with memory bounded by one network read plus a small retention margin.
//!
//! The binary in main.rs wires configuration, the database and the
//! maintenance task around [`build_router`], which integration tests and
//! benches drive directly.
//!
//! # Modules
//!
//! - `upload`: Boundary scanner, chunk writer, session, finalizer, sweep
//! - `storage`: Name generation, size formatting, upload indexing
//! - `auth`: Credential lists and admin session tokens
//! - `db`: SQLite metadata for files and short URLs
//! - `routes`: HTTP handlers

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;
pub mod upload;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = routes::upload::router()
        .merge(routes::list::router())
        .merge(routes::shorten::router())
        .merge(routes::delete::router());

    let public_dir = state.config().server.public_dir.clone();

    Router::new()
        .route("/", get(routes::public::redirect_to_ui))
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .nest("/u", routes::shorten::redirect_router())
        .nest_service("/public", routes::public::service(&public_dir))
        .merge(routes::files::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
