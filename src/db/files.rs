//! Stored file metadata

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::Result;

/// File record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FileRecord {
    pub name: String,
    pub deletion_token: Option<String>,
    pub views: i64,
    pub size: i64,
    pub date: i64,
}

/// File repository
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a newly stored file.
    ///
    /// Fails with [`AppError::UniqueConstraint`](crate::error::AppError::UniqueConstraint)
    /// when the name is already taken.
    pub async fn insert_file(
        &self,
        name: &str,
        deletion_token: &str,
        size: i64,
        date: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (name, deletion_token, views, size, date)
            VALUES (?, ?, 0, ?, ?)
            "#,
        )
        .bind(name)
        .bind(deletion_token)
        .bind(size)
        .bind(date)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Record a file stored under its original name, replacing any older row
    pub async fn replace_file(
        &self,
        name: &str,
        deletion_token: &str,
        size: i64,
        date: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (name, deletion_token, views, size, date)
            VALUES (?, ?, 0, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                deletion_token = excluded.deletion_token,
                views = 0,
                size = excluded.size,
                date = excluded.date
            "#,
        )
        .bind(name)
        .bind(deletion_token)
        .bind(size)
        .bind(date)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Put back a row exactly as it was read
    pub async fn restore(&self, record: &FileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (name, deletion_token, views, size, date)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                deletion_token = excluded.deletion_token,
                views = excluded.views,
                size = excluded.size,
                date = excluded.date
            "#,
        )
        .bind(&record.name)
        .bind(&record.deletion_token)
        .bind(record.views)
        .bind(record.size)
        .bind(record.date)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Record a file found on disk by the indexer (no deletion token)
    pub async fn insert_indexed(&self, name: &str, size: i64, date: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO files (name, deletion_token, views, size, date)
            VALUES (?, NULL, 0, ?, ?)
            "#,
        )
        .bind(name)
        .bind(size)
        .bind(date)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List all files, newest first
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT name, deletion_token, views, size, date
            FROM files
            ORDER BY date DESC, name ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Names of every recorded file
    pub async fn names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM files")
            .fetch_all(self.pool)
            .await?;

        Ok(names)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT name, deletion_token, views, size, date
            FROM files
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    pub async fn find_by_deletion_token(&self, token: &str) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT name, deletion_token, views, size, date
            FROM files
            WHERE deletion_token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    pub async fn delete_by_deletion_token(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE deletion_token = ?")
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_name(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE name = ?")
            .bind(name)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count one full download of `name`
    pub async fn increment_views(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE files SET views = views + 1 WHERE name = ?")
            .bind(name)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
