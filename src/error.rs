use crate::config::ConfigError;
use crate::orchestration::IndexError;
use thiserror::Error;

/// Top-level error for the indexer binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Index(#[from] IndexError),
}
