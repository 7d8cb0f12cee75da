use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] muse_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Creation ID cannot be empty")]
    EmptyCreationId,
    #[error("Invalid creation ID: {0}")]
    InvalidCreationId(String),
    #[error("Like was not applied")]
    LikeNotApplied,
    #[error("Configuration error: {0}")]
    Config(String),
}
