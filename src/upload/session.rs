//! Upload Session
//!
//! Drives one request body through the boundary scanner and chunk writer:
//! - Reads the body stream sequentially, one chunk at a time
//! - Writes file content as soon as it is known not to hold a boundary
//! - Retains only the unresolved tail of the buffer between reads
//! - Captures the small form fields (`randomizeName`, `password`)

use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWrite;
use uuid::Uuid;

use super::scanner::{self, Delimiter};
use super::types::{
    IngestReport, ParseState, PartKind, UploadError, DEFAULT_MAX_HEADER_BYTES,
    DEFAULT_SAFETY_MARGIN, FIELD_VALUE_LIMIT, HEADER_SEPARATOR, PASSWORD_FIELD, RANDOMIZE_FIELD,
    TEMP_FILE_PREFIX,
};
use super::writer::{ChunkWriter, TempUpload};

/// Tunables for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Configured minimum of the boundary retention margin
    pub min_safety_margin: usize,
    /// Largest header block accepted before CRLF CRLF is found
    pub max_header_bytes: usize,
    /// File bytes accepted while the request carries no credentials yet;
    /// going past it rejects the upload as unauthorized
    pub max_unverified_bytes: Option<u64>,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            min_safety_margin: DEFAULT_SAFETY_MARGIN,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_unverified_bytes: None,
        }
    }
}

enum Progress {
    Continue,
    NeedMoreData,
}

// ============================================================================
// Session
// ============================================================================

/// Stateful multipart ingester for a single request
pub struct UploadSession<W = tokio::fs::File> {
    state: ParseState,
    delimiter: Delimiter,
    max_header_bytes: usize,
    max_unverified_bytes: Option<u64>,
    writer: ChunkWriter<W>,
    largest_read: usize,
}

impl<W: AsyncWrite + Unpin> UploadSession<W> {
    pub fn new(writer: ChunkWriter<W>, boundary: &str, limits: &SessionLimits) -> Self {
        Self {
            state: ParseState::new(),
            delimiter: Delimiter::new(boundary, limits.min_safety_margin),
            max_header_bytes: limits.max_header_bytes,
            max_unverified_bytes: limits.max_unverified_bytes,
            writer,
            largest_read: 0,
        }
    }

    /// Consume `body` to the end, returning the report and the writer.
    ///
    /// A read error aborts the session with [`UploadError::Stream`]; the
    /// writer is dropped with the session, releasing its handle.
    pub async fn run<S, B, E>(
        mut self,
        body: S,
    ) -> Result<(IngestReport, ChunkWriter<W>), UploadError>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        futures::pin_mut!(body);

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| UploadError::Stream(e.to_string()))?;
            self.process_chunk(chunk.as_ref()).await?;
        }

        self.finish_stream().await?;

        let report = IngestReport {
            bytes_written: self.state.bytes_written,
            randomize_name: self.state.randomize_name,
            password: self.state.password.take(),
            peak_buffer: self.state.peak_buffer,
            largest_read: self.largest_read,
            safety_margin: self.delimiter.margin(),
            header_carry: self.state.header_carry,
        };

        Ok((report, self.writer))
    }

    /// Append one network read to the buffer and resolve as much as possible
    pub async fn process_chunk(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        self.largest_read = self.largest_read.max(chunk.len());
        if self.state.finished {
            return Ok(());
        }

        self.state.buffer.extend_from_slice(chunk);
        self.state.peak_buffer = self.state.peak_buffer.max(self.state.buffer.len());

        loop {
            if self.state.finished {
                self.state.buffer.clear();
                return Ok(());
            }

            let progress = if self.state.header_found {
                self.read_body().await?
            } else {
                self.read_header()?
            };

            if let Progress::NeedMoreData = progress {
                return Ok(());
            }
        }
    }

    fn read_header(&mut self) -> Result<Progress, UploadError> {
        let state = &mut self.state;

        if state.after_boundary {
            if state.buffer.len() < 2 {
                state.header_carry = state.header_carry.max(state.buffer.len());
                return Ok(Progress::NeedMoreData);
            }
            if state.buffer.starts_with(b"--") {
                state.finished = true;
                return Ok(Progress::Continue);
            }
        }

        let location = scanner::locate(
            &state.buffer,
            &self.delimiter,
            false,
            state.header_scan_from,
        );

        let Some(header_end) = location.header_end else {
            // Keep only the unfinished line; the CRLF before it may open the separator
            if let Some(pos) = scanner::last_line_break(&state.buffer).filter(|&pos| pos > 0) {
                state.pending_header.absorb(&state.buffer[..pos]);
                state.buffer.drain(..pos);
                state.header_bytes += pos;
                state.after_boundary = false;
            }
            if state.header_bytes + state.buffer.len() > self.max_header_bytes {
                return Err(UploadError::MalformedRequest(
                    "Multipart part header too large".to_string(),
                ));
            }
            state.header_scan_from = state
                .buffer
                .len()
                .saturating_sub(HEADER_SEPARATOR.len() - 1);
            state.header_carry = state.header_carry.max(state.buffer.len());
            return Ok(Progress::NeedMoreData);
        };

        state.pending_header.absorb(&state.buffer[..header_end]);
        let header = std::mem::take(&mut state.pending_header);
        state.buffer.drain(..header_end + HEADER_SEPARATOR.len());
        state.header_found = true;
        state.after_boundary = false;
        state.header_scan_from = 0;
        state.header_bytes = 0;

        let part = if header.is_form_field() {
            PartKind::Field {
                name: header.name.unwrap_or_default(),
                value: Vec::new(),
            }
        } else if !state.file_seen {
            state.file_seen = true;
            PartKind::File
        } else {
            tracing::debug!(name = ?header.name, "Ignoring additional file part");
            PartKind::Ignored
        };

        state.writing_body = part == PartKind::File;
        state.part = Some(part);
        Ok(Progress::Continue)
    }

    async fn read_body(&mut self) -> Result<Progress, UploadError> {
        let location = scanner::locate(&self.state.buffer, &self.delimiter, true, 0);

        match location.boundary_pos {
            Some(boundary_pos) => {
                let end = scanner::content_end(&self.state.buffer, boundary_pos);
                self.emit(end).await?;
                self.state
                    .buffer
                    .drain(..boundary_pos + self.delimiter.token().len());
                self.end_part();
                Ok(Progress::Continue)
            }
            None => {
                let safe = self.delimiter.safe_flush_len(self.state.buffer.len());
                if safe > 0 {
                    self.emit(safe).await?;
                    self.state.buffer.drain(..safe);
                }
                Ok(Progress::NeedMoreData)
            }
        }
    }

    /// Hand the first `len` buffered bytes to the current part
    async fn emit(&mut self, len: usize) -> Result<(), UploadError> {
        let bytes = &self.state.buffer[..len];

        match self.state.part.as_mut() {
            Some(PartKind::File) => {
                if let Some(cap) = self.max_unverified_bytes {
                    if self.state.bytes_written + bytes.len() as u64 > cap {
                        tracing::debug!(cap, "Upload without credentials exceeds cap");
                        return Err(UploadError::Unauthorized);
                    }
                }
                let written = self
                    .writer
                    .append(bytes)
                    .await
                    .map_err(UploadError::Write)?;
                self.state.bytes_written += written as u64;
            }
            Some(PartKind::Field { value, .. }) => {
                let room = FIELD_VALUE_LIMIT.saturating_sub(value.len());
                value.extend_from_slice(&bytes[..bytes.len().min(room)]);
            }
            Some(PartKind::Ignored) | None => {}
        }

        Ok(())
    }

    fn end_part(&mut self) {
        let state = &mut self.state;

        match state.part.take() {
            Some(PartKind::File) => {
                state.file_complete = true;
                tracing::debug!(bytes = state.bytes_written, "File part complete");
            }
            Some(PartKind::Field { name, value }) => apply_field(state, &name, &value),
            Some(PartKind::Ignored) | None => {}
        }

        state.header_found = false;
        state.writing_body = false;
        state.after_boundary = true;
    }

    async fn finish_stream(&mut self) -> Result<(), UploadError> {
        if self.state.header_found && !self.state.finished {
            // Stream ended inside a part: everything left is its content
            let len = self.state.buffer.len();
            self.emit(len).await?;
            self.end_part();
        }

        self.state.buffer.clear();
        self.state.buffer.shrink_to_fit();

        if !self.state.file_seen {
            return Err(UploadError::MalformedRequest(
                "No file part found in request body".to_string(),
            ));
        }

        Ok(())
    }
}

fn apply_field(state: &mut ParseState, name: &str, value: &[u8]) {
    let text = String::from_utf8_lossy(value);
    match name {
        RANDOMIZE_FIELD => state.randomize_name = randomize_flag(&text),
        PASSWORD_FIELD => state.password = Some(text.into_owned()),
        _ => tracing::debug!(field = %name, "Ignoring form field"),
    }
}

/// Interpret a `randomizeName` value: any non-empty value keeps names random,
/// an empty one keeps the original name
pub fn randomize_flag(value: &str) -> bool {
    !value.is_empty()
}

// ============================================================================
// Temp-file ingest
// ============================================================================

/// A fully received upload waiting in its temp file
#[derive(Debug)]
pub struct IngestedUpload {
    pub temp: TempUpload,
    pub report: IngestReport,
}

/// Unique temp path for one session: time + random suffix + original name
pub fn temp_path(temp_dir: &Path, file_name: &str) -> PathBuf {
    let suffix = Uuid::new_v4().simple().to_string();
    temp_dir.join(format!(
        "{}{}_{}_{}",
        TEMP_FILE_PREFIX,
        Utc::now().timestamp_millis(),
        &suffix[..8],
        file_name
    ))
}

/// Stream `body` into a fresh temp file under `temp_dir`
pub async fn ingest<S, B, E>(
    temp_dir: &Path,
    file_name: &str,
    boundary: &str,
    limits: &SessionLimits,
    body: S,
) -> Result<IngestedUpload, UploadError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    tokio::fs::create_dir_all(temp_dir)
        .await
        .map_err(UploadError::Write)?;

    let path = temp_path(temp_dir, file_name);
    let writer = ChunkWriter::create(&path)
        .await
        .map_err(UploadError::Write)?;
    let temp = TempUpload::new(path);

    tracing::debug!(temp = %temp.path().display(), "Receiving upload");

    let session = UploadSession::new(writer, boundary, limits);
    let (report, writer) = session.run(body).await?;
    writer.finish().await.map_err(UploadError::Write)?;

    tracing::info!(
        bytes = report.bytes_written,
        peak_buffer = report.peak_buffer,
        "Upload received"
    );

    Ok(IngestedUpload { temp, report })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use rand::{rngs::StdRng, RngCore, SeedableRng};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;

    const BOUNDARY: &str = "XYZ";

    fn multipart_body(boundary: &str, content: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        for (name, value) in fields {
            body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                    .as_bytes(),
            );
        }
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body
    }

    async fn run_in_chunks(
        body: &[u8],
        chunk_size: usize,
        limits: SessionLimits,
    ) -> Result<(IngestReport, Vec<u8>), UploadError> {
        let chunks: Vec<Result<Vec<u8>, io::Error>> =
            body.chunks(chunk_size).map(|c| Ok(c.to_vec())).collect();
        let session = UploadSession::new(ChunkWriter::new(Vec::new()), BOUNDARY, &limits);
        let (report, writer) = session.run(stream::iter(chunks)).await?;
        Ok((report, writer.into_inner()))
    }

    fn tricky_content() -> Vec<u8> {
        let mut content = Vec::new();
        for i in 0..50u8 {
            content.extend_from_slice(b"line\r\n--XY\r\n-");
            content.push(i);
            content.extend_from_slice(b"\r\n\r\n--X");
        }
        content
    }

    #[tokio::test]
    async fn test_chunk_splits_give_identical_output() {
        let content = tricky_content();
        let body = multipart_body(BOUNDARY, &content, &[("password", "hunter2")]);
        let limits = SessionLimits {
            min_safety_margin: 0,
            ..SessionLimits::default()
        };

        let (whole, stored) = run_in_chunks(&body, body.len(), limits).await.unwrap();
        assert_eq!(stored, content);
        assert_eq!(whole.bytes_written, content.len() as u64);

        for chunk_size in 1..=64 {
            let (report, stored) = run_in_chunks(&body, chunk_size, limits).await.unwrap();
            assert_eq!(stored, content, "chunk size {}", chunk_size);
            assert_eq!(report.bytes_written, whole.bytes_written);
            assert_eq!(report.password.as_deref(), Some("hunter2"));
        }
    }

    #[tokio::test]
    async fn test_zero_length_file() {
        let body = multipart_body(BOUNDARY, b"", &[]);
        for chunk_size in [1, 3, body.len()] {
            let (report, stored) = run_in_chunks(&body, chunk_size, SessionLimits::default())
                .await
                .unwrap();
            assert_eq!(report.bytes_written, 0);
            assert!(stored.is_empty());
            assert!(report.randomize_name);
        }
    }

    #[tokio::test]
    async fn test_boundary_inside_content_truncates_part() {
        // Known limitation: a boundary token inside the content ends the part
        let content = b"before\r\n--XYZ after";
        let body = multipart_body(BOUNDARY, content, &[]);
        let (report, stored) = run_in_chunks(&body, 7, SessionLimits::default())
            .await
            .unwrap();
        assert_eq!(stored, b"before");
        assert_eq!(report.bytes_written, 6);
    }

    #[tokio::test]
    async fn test_randomize_field() {
        // Any non-empty value keeps the generated name, even "false"
        let body = multipart_body(BOUNDARY, b"abc", &[("randomizeName", "false")]);
        let (report, _) = run_in_chunks(&body, 5, SessionLimits::default())
            .await
            .unwrap();
        assert!(report.randomize_name);

        let body = multipart_body(BOUNDARY, b"abc", &[("randomizeName", "")]);
        let (report, _) = run_in_chunks(&body, 5, SessionLimits::default())
            .await
            .unwrap();
        assert!(!report.randomize_name);

        let body = multipart_body(BOUNDARY, b"abc", &[("randomizeName", "yes")]);
        let (report, _) = run_in_chunks(&body, 5, SessionLimits::default())
            .await
            .unwrap();
        assert!(report.randomize_name);
    }

    #[tokio::test]
    async fn test_field_before_file_part() {
        let mut body = Vec::new();
        body.extend_from_slice(b"--XYZ\r\nContent-Disposition: form-data; name=\"randomizeName\"\r\n\r\n");
        body.extend_from_slice(b"\r\n--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"x.bin\"\r\n\r\n");
        body.extend_from_slice(b"payload");
        body.extend_from_slice(b"\r\n--XYZ--\r\n");

        let (report, stored) = run_in_chunks(&body, 4, SessionLimits::default())
            .await
            .unwrap();
        assert_eq!(stored, b"payload");
        assert!(!report.randomize_name);
    }

    #[tokio::test]
    async fn test_second_file_part_is_ignored() {
        let mut body = multipart_body(BOUNDARY, b"first", &[]);
        body.truncate(body.len() - b"--\r\n".len());
        body.extend_from_slice(b"\r\nContent-Disposition: form-data; name=\"file\"; filename=\"b\"\r\n\r\nsecond\r\n--XYZ--\r\n");

        let (report, stored) = run_in_chunks(&body, 9, SessionLimits::default())
            .await
            .unwrap();
        assert_eq!(stored, b"first");
        assert_eq!(report.bytes_written, 5);
    }

    #[tokio::test]
    async fn test_stream_without_closing_boundary_flushes_tail() {
        let mut body = multipart_body(BOUNDARY, b"no closing delimiter", &[]);
        body.truncate(body.len() - b"\r\n--XYZ--\r\n".len());

        let (report, stored) = run_in_chunks(&body, 8, SessionLimits::default())
            .await
            .unwrap();
        assert_eq!(stored, b"no closing delimiter");
        assert_eq!(report.bytes_written, 20);
    }

    #[tokio::test]
    async fn test_body_without_file_part() {
        let err = run_in_chunks(b"just some bytes", 4, SessionLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MalformedRequest(_)));
    }

    #[tokio::test]
    async fn test_header_block_too_large() {
        let limits = SessionLimits {
            max_header_bytes: 64,
            ..SessionLimits::default()
        };
        let body = vec![b'a'; 1024];
        let err = run_in_chunks(&body, 16, limits).await.unwrap_err();
        assert!(matches!(err, UploadError::MalformedRequest(_)));
    }

    #[tokio::test]
    async fn test_header_lines_count_toward_limit() {
        let limits = SessionLimits {
            max_header_bytes: 256,
            ..SessionLimits::default()
        };
        let mut body = b"--XYZ\r\n".to_vec();
        for i in 0..64 {
            body.extend_from_slice(format!("X-Filler-{i}: padding\r\n").as_bytes());
        }
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"; filename=\"a\"\r\n");
        body.extend_from_slice(b"\r\nabc\r\n--XYZ--\r\n");

        for chunk_size in [1, 7, 64] {
            let err = run_in_chunks(&body, chunk_size, limits).await.unwrap_err();
            assert!(matches!(err, UploadError::MalformedRequest(_)), "chunk size {}", chunk_size);
        }
    }

    async fn run_bytewise(
        body: &[u8],
        boundary: &str,
        limits: SessionLimits,
    ) -> Result<(IngestReport, Vec<u8>), UploadError> {
        let chunks: Vec<Result<Vec<u8>, io::Error>> =
            body.iter().map(|b| Ok(vec![*b])).collect();
        let session = UploadSession::new(ChunkWriter::new(Vec::new()), boundary, &limits);
        let (report, writer) = session.run(stream::iter(chunks)).await?;
        Ok((report, writer.into_inner()))
    }

    #[tokio::test]
    async fn test_header_read_byte_by_byte_stays_within_margin() {
        let boundary = "----StashBoundary7MA4YWxkTrZu0gW";
        let body = multipart_body(boundary, b"tiny", &[("password", "hunter2")]);

        let (report, stored) = run_bytewise(&body, boundary, SessionLimits::default())
            .await
            .unwrap();

        assert_eq!(stored, b"tiny");
        assert_eq!(report.password.as_deref(), Some("hunter2"));
        assert_eq!(report.largest_read, 1);
        assert!(report.header_carry <= report.safety_margin);
        assert!(report.peak_buffer <= report.largest_read + report.safety_margin);
    }

    #[tokio::test]
    async fn test_long_header_line_is_carried_whole() {
        let boundary = "----StashBoundary7MA4YWxkTrZu0gW";
        let filename = "n".repeat(300);
        let mut body = format!("--{boundary}\r\n").into_bytes();
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: text/plain\r\n\r\nbody");
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let (report, stored) = run_bytewise(&body, boundary, SessionLimits::default())
            .await
            .unwrap();

        assert_eq!(stored, b"body");
        // Only the unfinished line is kept, never the whole header block
        assert!(report.header_carry > report.safety_margin);
        assert!(report.header_carry < 400);
        assert!(report.peak_buffer <= report.retention_bound());
    }

    #[tokio::test]
    async fn test_unverified_upload_is_capped() {
        let limits = SessionLimits {
            max_unverified_bytes: Some(10),
            ..SessionLimits::default()
        };

        let body = multipart_body(BOUNDARY, b"0123456789", &[]);
        let (report, stored) = run_in_chunks(&body, 3, limits).await.unwrap();
        assert_eq!(report.bytes_written, 10);
        assert_eq!(stored, b"0123456789");

        let body = multipart_body(BOUNDARY, &vec![b'x'; 4096], &[("password", "hunter2")]);
        for chunk_size in [1, 5, body.len()] {
            let err = run_in_chunks(&body, chunk_size, limits).await.unwrap_err();
            assert!(matches!(err, UploadError::Unauthorized), "chunk size {}", chunk_size);
        }
    }

    #[tokio::test]
    async fn test_stream_error_aborts() {
        let body = multipart_body(BOUNDARY, &vec![7u8; 8192], &[]);
        let chunks: Vec<Result<Vec<u8>, io::Error>> = vec![
            Ok(body[..4096].to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            Ok(body[4096..].to_vec()),
        ];
        let session = UploadSession::new(
            ChunkWriter::new(Vec::new()),
            BOUNDARY,
            &SessionLimits::default(),
        );
        let err = session.run(stream::iter(chunks)).await.unwrap_err();
        assert!(matches!(err, UploadError::Stream(_)));
    }

    #[derive(Debug)]
    struct FailingWriter;

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk full")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_write_error_aborts() {
        let body = multipart_body(BOUNDARY, &vec![1u8; 4096], &[]);
        let session = UploadSession::new(
            ChunkWriter::new(FailingWriter),
            BOUNDARY,
            &SessionLimits::default(),
        );
        let chunks = vec![Ok::<_, io::Error>(body)];
        let err = session.run(stream::iter(chunks)).await.unwrap_err();
        assert!(matches!(err, UploadError::Write(_)));
    }

    #[tokio::test]
    async fn test_retained_buffer_is_bounded() {
        let mut content = vec![0u8; 5 * 1024 * 1024];
        StdRng::seed_from_u64(7).fill_bytes(&mut content);
        let boundary = "----StashBoundary7MA4YWxkTrZu0gW";
        let body = multipart_body(boundary, &content, &[]);

        let chunk_size = 64 * 1024;
        let chunks: Vec<Result<Vec<u8>, io::Error>> =
            body.chunks(chunk_size).map(|c| Ok(c.to_vec())).collect();
        let session = UploadSession::new(
            ChunkWriter::new(Vec::new()),
            boundary,
            &SessionLimits::default(),
        );
        let (report, writer) = session.run(stream::iter(chunks)).await.unwrap();

        assert_eq!(report.bytes_written, content.len() as u64);
        assert!(writer.into_inner() == content);
        assert_eq!(report.largest_read, chunk_size);
        assert!(report.peak_buffer <= report.largest_read + report.safety_margin);
    }

    #[tokio::test]
    async fn test_ingest_to_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let body = multipart_body(BOUNDARY, b"stored on disk", &[]);
        let chunks = vec![Ok::<_, io::Error>(body)];

        let ingested = ingest(
            temp_dir.path(),
            "a.txt",
            BOUNDARY,
            &SessionLimits::default(),
            stream::iter(chunks),
        )
        .await
        .unwrap();

        let path = ingested.temp.path().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(TEMP_FILE_PREFIX));
        assert!(name.ends_with("_a.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"stored on disk");
        assert_eq!(ingested.report.bytes_written, 14);

        drop(ingested);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_ingest_failure_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let body = multipart_body(BOUNDARY, &vec![9u8; 16 * 1024], &[]);
        let chunks: Vec<Result<Vec<u8>, io::Error>> = vec![
            Ok(body[..4096].to_vec()),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "client went away")),
        ];

        let err = ingest(
            temp_dir.path(),
            "b.bin",
            BOUNDARY,
            &SessionLimits::default(),
            stream::iter(chunks),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, UploadError::Stream(_)));
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_randomize_flag() {
        assert!(randomize_flag("true"));
        assert!(randomize_flag("false"));
        assert!(randomize_flag("0"));
        assert!(randomize_flag(" "));
        assert!(!randomize_flag(""));
    }
}
