use thiserror::Error;

use common::error::Error as ArbLoopError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load config: {0}")]
    ConfigLoadError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid snapshot record on line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    #[error("Source asset {0} is not part of the snapshot")]
    UnknownSource(String),

    #[error("Graph processing error: {0}")]
    GraphError(#[from] ArbLoopError),
}
