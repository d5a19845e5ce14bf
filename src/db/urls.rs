//! Shortened URL records

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::Result;

/// Short URL record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ShortUrl {
    pub short: String,
    pub deletion_token: Option<String>,
    pub url: String,
    pub views: i64,
    pub date: i64,
}

/// Short URL repository
pub struct UrlRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UrlRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new short URL; a taken short code is a unique violation
    pub async fn insert(
        &self,
        short: &str,
        deletion_token: &str,
        url: &str,
        date: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO urls (short, deletion_token, url, views, date)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(short)
        .bind(deletion_token)
        .bind(url)
        .bind(date)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_short(&self, short: &str) -> Result<Option<ShortUrl>> {
        let url = sqlx::query_as::<_, ShortUrl>(
            r#"
            SELECT short, deletion_token, url, views, date
            FROM urls
            WHERE short = ?
            "#,
        )
        .bind(short)
        .fetch_optional(self.pool)
        .await?;

        Ok(url)
    }

    pub async fn find_by_deletion_token(&self, token: &str) -> Result<Option<ShortUrl>> {
        let url = sqlx::query_as::<_, ShortUrl>(
            r#"
            SELECT short, deletion_token, url, views, date
            FROM urls
            WHERE deletion_token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(url)
    }

    pub async fn increment_views(&self, short: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE urls SET views = views + 1 WHERE short = ?")
            .bind(short)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_deletion_token(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM urls WHERE deletion_token = ?")
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
