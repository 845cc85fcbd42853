//! Enhanced encrypted pack containers.
//!
//! Each file inside a package archive is wrapped in its own container whose
//! AES-256 key is derived from a single user master key through three
//! layers: PBKDF2 stretches the user key against brute force, HKDF binds the
//! result to the file's identity inside the archive, and an HMAC
//! finalization binds it to the actual plaintext bytes so ciphertext cannot
//! be swapped between files. The IV is derived from the final key, making
//! encryption reproducible across writer runs for identical inputs.
//!
//! On-disk layout (all integers little-endian):
//!
//! ```text
//! [optional u32 magic 0x43454748 'CEGH']
//! [48-byte SecurityParameters]
//! [16-byte MD5 of the plaintext]
//! [u64 plaintext length L]
//! [ceil(L/16)*16 bytes AES-256-CFB ciphertext]
//! ```

pub mod error;
pub mod file;
pub mod keys;
pub mod params;

pub use error::PackError;
pub use file::{EncryptedFile, DEFAULT_KDF_ITERATIONS, ENCRYPTED_MAGIC};
pub use keys::{hex_string_to_key, password_to_key, KeyLadder, PACK_FORMAT_VERSION};
pub use params::SecurityParameters;
