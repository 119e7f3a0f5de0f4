//! Error types for mathpage operations.

use thiserror::Error;

/// Errors that can abort a conversion.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("Invalid image payload #{ordinal}: {source}")]
    ImageDecode {
        ordinal: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Typesetter failed: {0}")]
    OracleFailed(String),

    #[error("Typesetter did not respond within {0:?}")]
    OracleTimeout(std::time::Duration),

    #[error("Typesetter went away without a result")]
    OracleDisconnected,
}

pub type Result<T> = std::result::Result<T, Error>;
