//! Centralised error type for the line loader.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Error walking source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Chunk encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Corrupt chunk {chunk} at line {line}: {source}")]
    Decode {
        chunk: u64,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A staging area is left over from an earlier run; resume instead of rescanning.
    #[error("Staging area {0} already exists")]
    StagingExists(PathBuf),

    #[error("Staging area {0} still holds {1} chunk(s)")]
    StagingNotEmpty(PathBuf, usize),

    #[error("Malformed data path {0}: {1}")]
    MalformedPath(PathBuf, String),

    #[error("Parse error in {file} line {line}: {reason}")]
    Parse {
        file: PathBuf,
        line: usize,
        reason: String,
    },
}
