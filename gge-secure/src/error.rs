//! Error types for cryptographic operations

use thiserror::Error;

/// Errors surfaced by the primitive wrappers.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("KDF iteration count must be at least 1")]
    InvalidIterationCount,
    #[error("requested derived key length is too long for the KDF")]
    OutputTooLong,
    #[error("the random number generator is unavailable")]
    RngUnavailable,
}
