use std::path::PathBuf;

use opinion_common::generate::GenerateError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unknown persona: {0}")]
    UnknownPersona(String),
}
