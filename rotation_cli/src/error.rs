//! CLI error types

use rotation_core::{ConfigError, EngineError, ReplayFailure};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Replay(#[from] ReplayFailure),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Job file defines no job")]
    NoJob,
}
