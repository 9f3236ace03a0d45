pub mod adventure;
pub mod analytics;
pub mod content;
pub mod exercise;
pub mod games;
pub mod gamification;
pub mod llm_provider;
pub mod profiles;
pub mod tts;

use thiserror::Error;

use crate::db::DbError;

/// Failure of a request-level service operation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(DbError::Sqlx(err))
    }
}
