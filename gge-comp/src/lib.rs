//! Decompression for legacy map assets.
//!
//! The only compressed payloads in these formats are the per-tile alpha
//! masks, encoded with an LZO1X-style dictionary coder. Decompression is the
//! whole job; the legacy tooling never re-compresses.

pub mod lzo;

pub use lzo::decompress;
