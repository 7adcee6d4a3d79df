use std::io;

use thiserror::Error;

/// Errors surfaced by the window mining pipeline.
#[derive(Error, Debug)]
pub enum IdealError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("window size {window} exceeds sequence length {length}")]
    WindowTooLarge { window: usize, length: usize },

    #[error("malformed record at line {line}: {source}")]
    Record {
        line: usize,
        source: serde_json::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, IdealError>;
