//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while ingesting a trace file
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read trace file: {0}")]
    FileUnreadable(#[from] std::io::Error),

    #[error("no communications found in trace file")]
    NoCommunications,
}

/// Errors that can occur while writing or reading a catalog file
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
