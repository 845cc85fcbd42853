//! Error types for encrypted containers

use gge_secure::CryptoError;
use thiserror::Error;

/// Main error type for container operations.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("operation out of order: {0}")]
    Unconfigured(&'static str),
    #[error("unrecognized container format")]
    UnrecognizedFormat,
    #[error("corrupt container: {0}")]
    Corrupt(String),
    #[error("the base handle is already driving an open container")]
    AlreadyInUse,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cryptographic operation failed: {0}")]
    Crypto(#[from] CryptoError),
}
