//! Cryptographic primitives shared by the gge toolkit.
//!
//! This crate wraps the RustCrypto implementations behind the small, fixed
//! set of operations the pack and asset crates need: MD5 and HMAC-SHA256
//! one-shots, PBKDF2/HKDF key derivation, AES-256 in 128-bit CFB mode, a
//! process-wide CSPRNG with deterministic teardown, and the legacy archive
//! path hash.
//!
//! Nothing here keeps hidden state apart from the lazily-initialised CSPRNG
//! in [`rng`].

pub mod cipher;
pub mod digest;
pub mod error;
pub mod hash;
pub mod kdf;
pub mod rng;

pub use error::CryptoError;
pub use hash::{wdf_hash, WdfHash};

#[cfg(test)]
mod tests;
