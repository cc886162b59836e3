//! Error types for visum.

use thiserror::Error;

/// Result type alias using visum's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for visum operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Document store operation failed (wraps mongodb::error::Error)
    #[error("Store error: {0}")]
    Store(#[from] mongodb::error::Error),

    /// Broker operation failed (wraps lapin::Error)
    #[error("Transport error: {0}")]
    Transport(#[from] lapin::Error),

    /// Image decoding or encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text recognition backend failed
    #[error("Recognition error: {0}")]
    Recognition(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
