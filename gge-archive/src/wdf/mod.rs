//! WDF archive structures and reader.

pub mod reader;
pub mod structs;

use gge_assets::AssetError;
use thiserror::Error;

/// Main error type for archive operations.
#[derive(Debug, Error)]
pub enum WdfError {
    #[error("invalid WDF magic (expected 0x50464457)")]
    UnrecognizedFormat,
    #[error("entry index {0} out of range")]
    EntryIndex(usize),
    #[error("corrupt archive: {0}")]
    Corrupt(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("asset decode failed: {0}")]
    Asset(#[from] AssetError),
}

#[cfg(test)]
mod tests;
