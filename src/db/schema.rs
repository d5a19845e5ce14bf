//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Stored files; rows without a deletion token were picked up by the indexer
CREATE TABLE IF NOT EXISTS files (
    name TEXT NOT NULL PRIMARY KEY,
    deletion_token TEXT UNIQUE,
    views INTEGER NOT NULL DEFAULT 0,
    size INTEGER NOT NULL,
    date INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_files_date ON files(date);

-- Shortened URLs
CREATE TABLE IF NOT EXISTS urls (
    short TEXT NOT NULL PRIMARY KEY,
    deletion_token TEXT UNIQUE,
    url TEXT NOT NULL,
    views INTEGER NOT NULL DEFAULT 0,
    date INTEGER NOT NULL
);
"#;
