//! Shared fixtures for HTTP-level tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;

use stash_server::config::Config;
use stash_server::state::AppState;
use stash_server::{build_router, db};

pub const USER_PASSWORD: &str = "wonderland";
pub const ADMIN_PASSWORD: &str = "toor";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Like [`TestApp::new`], with `adjust` applied to the config last
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.root_dir = dir.path().join("uploads");
        config.storage.temp_dir = dir.path().join("uploads").join(".incoming");
        config.server.public_dir = dir.path().join("public");
        config.auth.users = format!("alice:{}", USER_PASSWORD);
        config.auth.admins = format!("root:{}", ADMIN_PASSWORD);
        adjust(&mut config);

        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        let state = AppState::new(config, pool);

        Self {
            router: build_router(state.clone()),
            state,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn root_dir(&self) -> std::path::PathBuf {
        self.state.config().storage.root_dir.clone()
    }

    pub fn temp_dir(&self) -> std::path::PathBuf {
        self.state.config().storage.temp_dir.clone()
    }

    /// Number of files left in the temp directory
    pub fn temp_file_count(&self) -> usize {
        match std::fs::read_dir(self.temp_dir()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

/// A multipart body with one file part followed by plain fields
pub fn multipart_body(
    boundary: &str,
    file_name: &str,
    content: &[u8],
    fields: &[(&str, &str)],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    for (name, value) in fields {
        body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}").as_bytes(),
        );
    }
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// POST /api/upload request with the usual headers
pub fn upload_request(
    boundary: &str,
    file_name: &str,
    password: Option<&str>,
    body: Body,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header("x-file-name", urlencoding::encode(file_name).into_owned());
    if let Some(password) = password {
        builder = builder.header("x-password", password);
    }
    builder.body(body).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// The token at the end of a deletion URL
pub fn token_of(deletion_url: &str) -> String {
    deletion_url.rsplit('/').next().unwrap().to_string()
}
