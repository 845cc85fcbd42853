//! Error types for asset decoding

use thiserror::Error;

/// Main error type for asset readers.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unrecognized asset format: {0}")]
    UnrecognizedFormat(String),
    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("corrupt asset: {0}")]
    Corrupt(String),
    #[error("image decode failed: {0}")]
    DecodeFailure(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
