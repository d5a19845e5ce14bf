//! Reconcile the upload directory with the files table

use std::collections::HashSet;
use std::path::Path;
use std::time::UNIX_EPOCH;

use sqlx::SqlitePool;

use crate::db::FileRepository;
use crate::error::Result;

/// Changes made by one indexing pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub added: usize,
    pub removed: usize,
}

/// Add rows for stored files the table does not know and drop rows whose file is gone.
///
/// Dotfiles and directories (including the temp directory) are skipped.
pub async fn index_uploads(pool: &SqlitePool, root_dir: &Path) -> Result<IndexReport> {
    tokio::fs::create_dir_all(root_dir).await?;

    let repo = FileRepository::new(pool);
    let known: HashSet<String> = repo.names().await?.into_iter().collect();
    let mut on_disk = HashSet::new();
    let mut report = IndexReport::default();

    let mut entries = tokio::fs::read_dir(root_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        if !known.contains(&name) {
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or_default();
            if repo
                .insert_indexed(&name, metadata.len() as i64, modified)
                .await?
            {
                report.added += 1;
            }
        }
        on_disk.insert(name);
    }

    for name in known.difference(&on_disk) {
        if repo.delete_by_name(name).await? {
            report.removed += 1;
        }
    }

    if report.added > 0 || report.removed > 0 {
        tracing::info!(
            added = report.added,
            removed = report.removed,
            "Upload index updated"
        );
    }

    Ok(report)
}
