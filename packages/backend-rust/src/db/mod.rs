pub mod operations;
pub mod sqlite_primary;
pub mod sqlite_schema;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::sqlite_primary::{init_sqlite_pool, SqliteInitError};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    pub async fn connect(path: &Path) -> Result<Self, DbInitError> {
        let pool = init_sqlite_pool(path).await?;
        tracing::info!(path = %path.display(), "sqlite database ready");
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("column {column} holds invalid JSON: {source}")]
    Json {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes a JSON text column, treating NULL as the type's default
pub(crate) fn decode_json<T>(column: &'static str, raw: Option<String>) -> Result<T, DbError>
where
    T: DeserializeOwned + Default,
{
    match raw {
        Some(text) if !text.trim().is_empty() => {
            serde_json::from_str(&text).map_err(|source| DbError::Json { column, source })
        }
        _ => Ok(T::default()),
    }
}

pub(crate) fn encode_json<T: Serialize>(column: &'static str, value: &T) -> Result<String, DbError> {
    serde_json::to_string(value).map_err(|source| DbError::Json { column, source })
}

pub(crate) fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
