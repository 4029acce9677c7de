//! SQLite store of processed tweets.
//!
//! One row per tweet whose media were saved, keyed by tweet id. Rows are only
//! ever added.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to create database directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedTweet {
    pub id: i64,
    pub url: String,
}

#[async_trait]
pub trait ProcessedStore: Send + Sync {
    /// Every recorded tweet id
    async fn select_all(&self) -> Result<Vec<i64>, PersistenceError>;

    /// Record all `rows` in one transaction. Ids already present are ignored.
    async fn insert_batch(&self, rows: &[ProcessedTweet]) -> Result<(), PersistenceError>;
}

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (or create) the database at `path`, creating parent directories
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PersistenceError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        tracing::debug!("opened database {}", path.display());

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tweets (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProcessedStore for Database {
    async fn select_all(&self) -> Result<Vec<i64>, PersistenceError> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM tweets")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn insert_batch(&self, rows: &[ProcessedTweet]) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query("INSERT OR IGNORE INTO tweets (id, url) VALUES (?, ?)")
                .bind(row.id)
                .bind(&row.url)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!("recorded {} tweets", rows.len());
        Ok(())
    }
}

/// In-memory database for tests
#[cfg(test)]
pub(crate) async fn open_memory() -> Database {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let db = Database { pool };
    db.migrate().await.unwrap();
    db
}
