//! Finalizer
//!
//! Moves a fully received temp file to its permanent name and records it
//! in the metadata store.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sqlx::SqlitePool;

use super::session::IngestedUpload;
use super::types::{UploadError, UploadResult};
use super::writer::TempUpload;
use crate::db::{FileRecord, FileRepository};
use crate::error::AppError;
use crate::storage::{deletion_token, NameGenerator};

/// A file moved to its permanent location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedFile {
    pub final_name: String,
    pub path: PathBuf,
}

/// Commits uploads into `root_dir`
pub struct Finalizer<'a> {
    root_dir: &'a Path,
    names: NameGenerator,
}

impl<'a> Finalizer<'a> {
    pub fn new(root_dir: &'a Path, names: NameGenerator) -> Self {
        Self { root_dir, names }
    }

    /// Move `temp` to its permanent path.
    ///
    /// With `randomize` the name is a fresh random stem plus the original
    /// extension, reserved on disk first. Without it the original name is
    /// used and an existing file of that name is replaced.
    pub async fn commit(
        &self,
        temp: TempUpload,
        original_name: &str,
        randomize: bool,
    ) -> Result<CommittedFile, UploadError> {
        tokio::fs::create_dir_all(self.root_dir)
            .await
            .map_err(UploadError::Rename)?;

        let (final_name, path) = if randomize {
            self.names
                .reserve_file_name(self.root_dir, original_name)
                .await
                .map_err(UploadError::Rename)?
        } else {
            (original_name.to_string(), self.root_dir.join(original_name))
        };

        if let Err(e) = move_file(temp.path(), &path).await {
            if randomize {
                remove_quietly(&path).await;
            }
            return Err(UploadError::Rename(e));
        }

        // The temp path no longer exists; dropping the guard is a no-op
        drop(temp);

        tracing::debug!(name = %final_name, "Upload committed");
        Ok(CommittedFile { final_name, path })
    }

    /// Commit an ingested upload and record its metadata row.
    ///
    /// A randomized upload is moved first and removed again if the row
    /// cannot be written. An upload keeping its original name is recorded
    /// first, so a failed write leaves any older file of that name in place;
    /// if the move then fails the previous row is put back.
    pub async fn finalize(
        &self,
        pool: &SqlitePool,
        base_url: &str,
        upload: IngestedUpload,
        original_name: &str,
    ) -> Result<UploadResult, UploadError> {
        let IngestedUpload { temp, report } = upload;

        let token = deletion_token();
        let date = Utc::now().timestamp_millis();
        let size = report.bytes_written as i64;
        let repo = FileRepository::new(pool);

        let committed = if report.randomize_name {
            let committed = self.commit(temp, original_name, true).await?;
            let recorded = match repo.insert_file(&committed.final_name, &token, size, date).await {
                // The name was reserved on disk by this session, so an existing
                // row can only be one the indexer added for the placeholder
                Err(AppError::UniqueConstraint(_)) => {
                    repo.replace_file(&committed.final_name, &token, size, date).await
                }
                other => other,
            };
            if let Err(e) = recorded {
                remove_quietly(&committed.path).await;
                return Err(UploadError::Metadata(e));
            }
            committed
        } else {
            let previous = repo
                .find_by_name(original_name)
                .await
                .map_err(UploadError::Metadata)?;
            repo.replace_file(original_name, &token, size, date)
                .await
                .map_err(UploadError::Metadata)?;

            match self.commit(temp, original_name, false).await {
                Ok(committed) => committed,
                Err(e) => {
                    restore_row(&repo, original_name, previous).await;
                    return Err(e);
                }
            }
        };

        Ok(UploadResult {
            public_url: format!(
                "{}/{}",
                base_url,
                urlencoding::encode(&committed.final_name)
            ),
            deletion_url: format!("{}/api/delete-file/{}", base_url, token),
            final_name: committed.final_name,
            timestamp_millis: date,
            byte_size: report.bytes_written,
        })
    }
}

/// Undo `replace_file` after the file itself could not be replaced
async fn restore_row(repo: &FileRepository<'_>, name: &str, previous: Option<FileRecord>) {
    let restored = match previous {
        Some(record) => repo.restore(&record).await,
        None => repo.delete_by_name(name).await.map(|_| ()),
    };
    if let Err(e) = restored {
        tracing::error!(
            name = %name,
            error = %e,
            "Failed to restore file metadata after a failed overwrite"
        );
    }
}

/// Rename, falling back to copy + remove across filesystems
async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(error = %e, "Rename failed, copying instead");
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }
}
