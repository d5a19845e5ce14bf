//! File serving routes
//!
//! Serves stored uploads from the local upload directory, with single
//! byte-range support. Files are streamed from disk, never read whole.

use std::io::{self, SeekFrom};

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};

use crate::db::FileRepository;
use crate::error::{error_response, AppError, Result};
use crate::state::AppState;

/// Bytes read from disk per body frame
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Create the files router
pub fn router() -> Router<AppState> {
    Router::new().route("/:file", get(serve_file))
}

/// Serve a stored file, or the requested byte range of it
async fn serve_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    // Dotfiles cover the temp directory and anything else kept private
    if name.starts_with('.') || name.contains('/') || name.contains('\\') {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    let path = state.config().storage.root_dir.join(&name);
    let mut file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(AppError::NotFound("File not found".to_string()));
    }
    let size = metadata.len();
    let content_type = mime_guess::from_path(&name)
        .first_or_octet_stream()
        .to_string();

    let Some(range) = headers.get(header::RANGE) else {
        FileRepository::new(state.db()).increment_views(&name).await?;

        return Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, size)
            .header(header::ACCEPT_RANGES, "bytes")
            .body(file_body(file, size))
            .map_err(|e| AppError::Internal(e.to_string()))?);
    };

    let range = range.to_str().unwrap_or_default();
    let (start, end) = match parse_range_header(range, size) {
        Ok(bounds) => bounds,
        Err(RangeError::Malformed) => {
            return Err(AppError::BadRequest("Invalid Range header".to_string()));
        }
        Err(RangeError::Unsatisfiable) => {
            let mut response =
                error_response(StatusCode::RANGE_NOT_SATISFIABLE, "Range not satisfiable");
            if let Ok(value) = format!("bytes */{}", size).parse() {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
            return Ok(response);
        }
    };

    file.seek(SeekFrom::Start(start)).await?;
    let len = end - start;

    Ok(Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len)
        .header(header::CONTENT_RANGE, format!("bytes {}-{}/{}", start, end - 1, size))
        .header(header::ACCEPT_RANGES, "bytes")
        .body(file_body(file, len))
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

/// Stream at most `len` bytes of `reader` as a response body
fn file_body<R>(reader: R, len: u64) -> Body
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let stream = futures::stream::try_unfold(reader.take(len), |mut reader| async move {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok::<_, io::Error>(None);
        }
        buf.truncate(n);
        Ok(Some((Bytes::from(buf), reader)))
    });

    Body::from_stream(stream)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeError {
    Malformed,
    Unsatisfiable,
}

/// Parse a single `bytes=` range into `(start, end)` with `end` exclusive.
///
/// Supports `start-end`, `start-` and `-suffix`. An end past the file is
/// clamped to its size.
fn parse_range_header(value: &str, total: u64) -> std::result::Result<(u64, u64), RangeError> {
    let ranges = value
        .trim()
        .strip_prefix("bytes=")
        .ok_or(RangeError::Malformed)?;
    if ranges.contains(',') {
        return Err(RangeError::Malformed);
    }
    let (start, end) = ranges.split_once('-').ok_or(RangeError::Malformed)?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let suffix: u64 = end.parse().map_err(|_| RangeError::Malformed)?;
        if suffix == 0 || total == 0 {
            return Err(RangeError::Unsatisfiable);
        }
        return Ok((total.saturating_sub(suffix), total));
    }

    let start: u64 = start.parse().map_err(|_| RangeError::Malformed)?;
    let end = if end.is_empty() {
        total
    } else {
        let last: u64 = end.parse().map_err(|_| RangeError::Malformed)?;
        if last < start {
            return Err(RangeError::Malformed);
        }
        last.saturating_add(1).min(total)
    };

    if start >= total {
        return Err(RangeError::Unsatisfiable);
    }

    Ok((start, end))
}
