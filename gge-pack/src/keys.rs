//! Multi-layer key derivation.
//!
//! Layer 1 (PBKDF2) stretches the user key with the stored salt. Layer 2
//! (HKDF, empty salt) binds the master key to the file's identity inside the
//! archive. Layer 3 (HMAC over length, MD5, file key, and version) binds the
//! final key to the actual plaintext bytes. The IV is the truncated HMAC of
//! a fixed path-derived string under the final key.

use zeroize::{Zeroize, ZeroizeOnDrop};

use gge_secure::{digest, kdf};

use crate::error::PackError;
use crate::params::SecurityParameters;

/// Pack format version baked into every derivation context.
pub const PACK_FORMAT_VERSION: u32 = 3;

/// Derivation state for one container.
///
/// Each layer requires the previous one; calling out of order fails with
/// [`PackError::Unconfigured`]. All key buffers are zeroed on [`clear`] and
/// on drop.
///
/// [`clear`]: KeyLadder::clear
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyLadder {
    user_key: [u8; 32],
    master_key: Option<[u8; 32]>,
    file_key: Option<[u8; 32]>,
    final_key: Option<[u8; 32]>,
    file_path: String,
    #[zeroize(skip)]
    params: SecurityParameters,
    #[zeroize(skip)]
    pack_version: u32,
}

impl KeyLadder {
    /// Create a ladder over a validated parameter set.
    ///
    /// # Errors
    ///
    /// Fails when `params` does not validate.
    pub fn new(
        user_key: [u8; 32],
        params: SecurityParameters,
        file_path: impl Into<String>,
        pack_version: u32,
    ) -> Result<Self, PackError> {
        params.validate()?;
        Ok(Self {
            user_key,
            master_key: None,
            file_key: None,
            final_key: None,
            file_path: file_path.into(),
            params,
            pack_version,
        })
    }

    /// Layer 1: PBKDF2-HMAC-SHA256 over the user key and stored salt.
    pub fn derive_master(&mut self) -> Result<(), PackError> {
        let mut master = [0u8; 32];
        kdf::pbkdf2_hmac_sha256(
            &self.user_key,
            &self.params.master_salt,
            self.params.kdf_iterations,
            &mut master,
        )?;
        self.master_key = Some(master);
        Ok(())
    }

    /// Layer 2: HKDF-SHA256 with an empty salt and a path-bound info string.
    ///
    /// The info is the UTF-8 byte sequence
    /// `"{file_path}|{pack_version}|{context_tag}|{security_version}"`.
    pub fn derive_file(&mut self, context_tag: &str) -> Result<(), PackError> {
        let master = self
            .master_key
            .as_ref()
            .ok_or(PackError::Unconfigured("derive_file before derive_master"))?;
        let info = format!(
            "{}|{}|{}|{}",
            self.file_path, self.pack_version, context_tag, self.params.security_version
        );
        let mut file_key = [0u8; 32];
        kdf::hkdf_sha256(&[], master, info.as_bytes(), &mut file_key)?;
        self.file_key = Some(file_key);
        Ok(())
    }

    /// Layer 3: HMAC the 57-byte sequence
    /// `u64 BE plaintext_len ‖ md5 ‖ file_key ‖ security_version` under the
    /// file key.
    pub fn finalize(&mut self, plaintext_len: u64, plaintext_md5: &[u8; 16]) -> Result<(), PackError> {
        let file_key = self
            .file_key
            .ok_or(PackError::Unconfigured("finalize before derive_file"))?;
        let mut input = [0u8; 57];
        input[..8].copy_from_slice(&plaintext_len.to_be_bytes());
        input[8..24].copy_from_slice(plaintext_md5);
        input[24..56].copy_from_slice(&file_key);
        input[56] = self.params.security_version;
        self.final_key = Some(digest::hmac_sha256(&file_key, &input));
        input.zeroize();
        Ok(())
    }

    /// First 16 bytes of
    /// `HMAC(final_key, "{file_path}|IV_GENERATION|{security_version}")`.
    pub fn derive_iv(&self) -> Result<[u8; 16], PackError> {
        let final_key = self
            .final_key
            .as_ref()
            .ok_or(PackError::Unconfigured("derive_iv before finalize"))?;
        if self.file_path.is_empty() {
            return Err(PackError::InvalidParameter(
                "file path required for IV derivation".to_string(),
            ));
        }
        let input = format!(
            "{}|IV_GENERATION|{}",
            self.file_path, self.params.security_version
        );
        let full = digest::hmac_sha256(final_key, input.as_bytes());
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&full[..16]);
        Ok(iv)
    }

    /// The finalized AES-256 key.
    pub fn final_key(&self) -> Result<&[u8; 32], PackError> {
        self.final_key
            .as_ref()
            .ok_or(PackError::Unconfigured("final key not derived"))
    }

    /// The parameter set this ladder was built over.
    pub const fn security_parameters(&self) -> &SecurityParameters {
        &self.params
    }

    /// Overwrite every key buffer with zeros and reset the ladder.
    pub fn clear(&mut self) {
        self.user_key.zeroize();
        if let Some(k) = self.master_key.as_mut() {
            k.zeroize();
        }
        self.master_key = None;
        if let Some(k) = self.file_key.as_mut() {
            k.zeroize();
        }
        self.file_key = None;
        if let Some(k) = self.final_key.as_mut() {
            k.zeroize();
        }
        self.final_key = None;
        self.file_path.clear();
    }
}

/// Convert a 64-character hex string into a 32-byte key.
///
/// Case-insensitive; anything else is rejected.
///
/// # Errors
///
/// Returns [`PackError::InvalidParameter`] for wrong lengths or non-hex
/// characters.
pub fn hex_string_to_key(hex_str: &str) -> Result<[u8; 32], PackError> {
    if hex_str.len() != 64 {
        return Err(PackError::InvalidParameter(format!(
            "encryption key must be 64 hex characters, got {}",
            hex_str.len()
        )));
    }
    let bytes = hex::decode(hex_str).map_err(|_| {
        PackError::InvalidParameter("encryption key contains non-hex characters".to_string())
    })?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Legacy password mode: the 32 lowercase hex characters of the password's
/// MD5 digest become the key bytes verbatim.
#[must_use]
pub fn password_to_key(password: &str) -> [u8; 32] {
    let digest = digest::md5(password.as_bytes());
    let hex_str = hex::encode(digest);
    let mut key = [0u8; 32];
    key.copy_from_slice(hex_str.as_bytes());
    key
}
