//! Key derivation functions: PBKDF2-HMAC-SHA256 and HKDF-SHA256.

use hkdf::Hkdf;
use hmac::Hmac;
use sha2::Sha256;

use crate::error::CryptoError;

/// Derive `out.len()` bytes from `password` with PBKDF2-HMAC-SHA256.
///
/// # Errors
///
/// Fails when `iterations` is zero or the requested output length exceeds
/// what the KDF can produce.
pub fn pbkdf2_hmac_sha256(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    out: &mut [u8],
) -> Result<(), CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::InvalidIterationCount);
    }
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, iterations, out)
        .map_err(|_| CryptoError::OutputTooLong)
}

/// Derive `out.len()` bytes from `ikm` with HKDF-SHA256.
///
/// An empty `salt` selects the RFC 5869 default (a block of zeros).
///
/// # Errors
///
/// Fails when the requested output length exceeds 255 hash blocks.
pub fn hkdf_sha256(
    salt: &[u8],
    ikm: &[u8],
    info: &[u8],
    out: &mut [u8],
) -> Result<(), CryptoError> {
    let salt = if salt.is_empty() { None } else { Some(salt) };
    Hkdf::<Sha256>::new(salt, ikm)
        .expand(info, out)
        .map_err(|_| CryptoError::OutputTooLong)
}
