//! Chunk Writer
//!
//! Appends resolved byte ranges to the session's temp file and owns the
//! temp file's lifetime on disk.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};

// ============================================================================
// Chunk Writer
// ============================================================================

/// Appends bytes, in order, to an open handle
#[derive(Debug)]
pub struct ChunkWriter<W = File> {
    inner: W,
    bytes_written: u64,
}

impl ChunkWriter<File> {
    /// Create a fresh temp file; fails if the path already exists
    pub async fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        Ok(Self::new(file))
    }
}

impl<W: AsyncWrite + Unpin> ChunkWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Append `bytes` verbatim, returning how many were appended
    pub async fn append(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }
        self.inner.write_all(bytes).await?;
        self.bytes_written += bytes.len() as u64;
        Ok(bytes.len())
    }

    /// Total bytes appended through this writer
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and close the handle, returning the total written
    pub async fn finish(mut self) -> io::Result<u64> {
        self.inner.flush().await?;
        self.inner.shutdown().await?;
        Ok(self.bytes_written)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

// ============================================================================
// Temp File Guard
// ============================================================================

/// Path of an in-flight upload, removed when dropped.
///
/// Every exit path of a session drops its guard, so an aborted upload never
/// leaves a temp file behind unless removal itself fails; those are left to
/// the periodic sweep.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed temp upload");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove temp upload, leaving it for the sweep"
                );
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
