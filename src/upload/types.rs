//! Upload types for the streaming multipart ingester

use serde::Serialize;

use super::scanner::PartHeader;

// ============================================================================
// Constants
// ============================================================================

/// Separator between a part's header block and its body
pub const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";

/// Default minimum number of bytes held back for boundary detection
pub const DEFAULT_SAFETY_MARGIN: usize = 100;

/// Default cap on a part header block (bytes before CRLF CRLF)
pub const DEFAULT_MAX_HEADER_BYTES: usize = 16 * 1024;

/// Default cap on file bytes accepted before the uploader is known
pub const DEFAULT_MAX_ANONYMOUS_BYTES: u64 = 32 * 1024 * 1024;

/// Largest value kept for a plain form field (`password`, `randomizeName`)
pub const FIELD_VALUE_LIMIT: usize = 4 * 1024;

/// Prefix of every in-flight temp file
pub const TEMP_FILE_PREFIX: &str = "temp_";

/// Form field that controls name randomization
pub const RANDOMIZE_FIELD: &str = "randomizeName";

/// Form field carrying the upload password
pub const PASSWORD_FIELD: &str = "password";

/// Longest boundary accepted (RFC 2046 allows 70)
pub const MAX_BOUNDARY_LEN: usize = 70;

// ============================================================================
// Parser State
// ============================================================================

/// What the bytes of the current part are used for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartKind {
    /// File content, written to the temp file
    File,
    /// Small form field, captured in memory up to [`FIELD_VALUE_LIMIT`]
    Field { name: String, value: Vec<u8> },
    /// Anything else (a second file part); scanned past and dropped
    Ignored,
}

/// Per-request parser state.
///
/// Owned by exactly one [`UploadSession`](super::UploadSession); never shared.
#[derive(Debug)]
pub struct ParseState {
    /// Bytes received but not yet resolved
    pub buffer: Vec<u8>,
    /// Whether the current part's header block has been consumed
    pub header_found: bool,
    /// Whether the bytes being read belong to the file part
    pub writing_body: bool,
    /// Whether the stored file gets a generated name
    pub randomize_name: bool,
    /// File content bytes written so far
    pub bytes_written: u64,
    /// Kind of the part currently being read
    pub part: Option<PartKind>,
    /// Set once the file part has been terminated by a boundary
    pub file_complete: bool,
    /// Set once any file part header has been seen
    pub file_seen: bool,
    /// A boundary was just consumed; the next bytes are `--` or a header
    pub after_boundary: bool,
    /// The closing delimiter has been read; remaining bytes are epilogue
    pub finished: bool,
    /// Offset the next header search may start from
    pub header_scan_from: usize,
    /// Header fields parsed from lines already dropped from the buffer
    pub pending_header: PartHeader,
    /// Header bytes of the current part already consumed
    pub header_bytes: usize,
    /// Largest buffer carried over to the next read while a header was incomplete
    pub header_carry: usize,
    /// Password captured from a `password` field, if any
    pub password: Option<String>,
    /// Largest buffer length observed after appending a chunk
    pub peak_buffer: usize,
}

impl ParseState {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            header_found: false,
            writing_body: false,
            randomize_name: true,
            bytes_written: 0,
            part: None,
            file_complete: false,
            file_seen: false,
            after_boundary: false,
            finished: false,
            header_scan_from: 0,
            pending_header: PartHeader::default(),
            header_bytes: 0,
            header_carry: 0,
            password: None,
            peak_buffer: 0,
        }
    }
}

impl Default for ParseState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Results
// ============================================================================

/// Summary of one ingested request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub bytes_written: u64,
    pub randomize_name: bool,
    pub password: Option<String>,
    pub peak_buffer: usize,
    pub largest_read: usize,
    pub safety_margin: usize,
    pub header_carry: usize,
}

impl IngestReport {
    /// Upper bound on `peak_buffer`: one read plus the bytes carried over.
    ///
    /// Equals `largest_read + safety_margin` unless a single part header line
    /// was longer than the margin.
    pub fn retention_bound(&self) -> usize {
        self.largest_read + self.safety_margin.max(self.header_carry)
    }
}

/// Outcome of a successful upload, built once by the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub final_name: String,
    pub public_url: String,
    pub deletion_url: String,
    pub timestamp_millis: i64,
    pub byte_size: u64,
}

/// JSON body returned by `POST /api/upload`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub name: String,
    pub url: String,
    pub deletion_url: String,
    pub date: i64,
    pub size: String,
}

impl From<&UploadResult> for UploadResponse {
    fn from(result: &UploadResult) -> Self {
        Self {
            success: true,
            name: result.final_name.clone(),
            url: result.public_url.clone(),
            deletion_url: result.deletion_url.clone(),
            date: result.timestamp_millis,
            size: crate::storage::human_readable_size(result.byte_size),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Upload error types
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{0}")]
    MalformedRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Upload stream failed: {0}")]
    Stream(String),

    #[error("Failed to write upload: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to move upload into place: {0}")]
    Rename(#[source] std::io::Error),

    #[error("Failed to record upload: {0}")]
    Metadata(#[from] crate::error::AppError),
}

impl UploadError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Stream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Write(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rename(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients
    pub fn public_message(&self) -> String {
        match self {
            Self::MalformedRequest(msg) => msg.clone(),
            Self::Unauthorized => "Unauthorized".to_string(),
            _ => "Failed to save file".to_string(),
        }
    }
}
