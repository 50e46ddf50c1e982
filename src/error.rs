use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("input is not decodable as text: {0}")]
    Decode(String),

    #[error("invalid header depth {0}: must be at least 1")]
    InvalidHeaderDepth(usize),

    #[error("unknown value policy '{0}', expected first_nonempty, last_nonempty or concat")]
    UnknownValuePolicy(String),

    #[error("unknown key style '{0}', expected full-path or leaf")]
    UnknownKeyStyle(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}
