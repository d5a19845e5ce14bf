//! Periodic maintenance: orphaned temp files and the upload index

use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use super::types::TEMP_FILE_PREFIX;
use crate::state::AppState;
use crate::storage::index_uploads;

/// Delete temp files in `temp_dir` last modified more than `max_age` ago
pub async fn sweep_temp_files(temp_dir: &Path, max_age: Duration) -> io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(temp_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        if !entry
            .file_name()
            .to_string_lossy()
            .starts_with(TEMP_FILE_PREFIX)
        {
            continue;
        }

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age <= max_age {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(
                    path = %entry.path().display(),
                    error = %e,
                    "Failed to sweep temp file"
                );
            }
        }
    }

    if removed > 0 {
        tracing::info!(removed, "Swept orphaned temp files");
    }

    Ok(removed)
}

/// One maintenance pass: reindex stored files, then sweep temp files
pub async fn run_maintenance(state: &AppState) {
    let config = state.config();

    if let Err(e) = index_uploads(state.db(), &config.storage.root_dir).await {
        tracing::error!("Indexing uploads failed: {}", e);
    }

    let max_age = config.maintenance.sweep_max_age();
    if let Err(e) = sweep_temp_files(&config.storage.temp_dir, max_age).await {
        tracing::error!("Sweeping temp files failed: {}", e);
    }
}

/// Start background maintenance task; the first pass runs immediately
pub fn start_maintenance_task(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.config().maintenance.interval());

        loop {
            interval.tick().await;
            run_maintenance(&state).await;
        }
    })
}
