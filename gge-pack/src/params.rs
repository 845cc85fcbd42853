//! On-wire security parameters.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::PackError;

/// Lower bound accepted by [`SecurityParameters::validate`].
pub const MIN_KDF_ITERATIONS: u32 = 10_000;
/// Upper bound accepted by [`SecurityParameters::validate`].
pub const MAX_KDF_ITERATIONS: u32 = 1_000_000;

/// Parameters embedded in every encrypted container, 48 bytes on the wire.
///
/// ```text
/// 0x00  u32      kdf_iterations   (little-endian)
/// 0x04  [u8;32]  master_salt      (must not be all zero)
/// 0x24  u8       security_version (1..=255)
/// 0x25  [u8;15]  reserved         (zero on write, ignored on read)
/// ```
///
/// The record is serialised field by field in exactly this order; a reader
/// that mutates any field must re-derive everything from the master key
/// down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityParameters {
    pub kdf_iterations: u32,
    pub master_salt: [u8; 32],
    pub security_version: u8,
}

impl SecurityParameters {
    /// Size of the record in bytes.
    pub const SIZE: usize = 48;

    /// Generate fresh parameters with a random salt and security version 1.
    ///
    /// # Errors
    ///
    /// Fails when `iterations` is outside the accepted range or the CSPRNG
    /// is unavailable.
    pub fn generate(iterations: u32) -> Result<Self, PackError> {
        let mut master_salt = [0u8; 32];
        gge_secure::rng::fill_random(&mut master_salt)?;
        let params = Self {
            kdf_iterations: iterations,
            master_salt,
            security_version: 1,
        };
        params.validate()?;
        Ok(params)
    }

    /// Validate the iteration range, version, and salt.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::InvalidParameter`] describing the first failing
    /// field.
    pub fn validate(&self) -> Result<(), PackError> {
        if !(MIN_KDF_ITERATIONS..=MAX_KDF_ITERATIONS).contains(&self.kdf_iterations) {
            return Err(PackError::InvalidParameter(format!(
                "KDF iteration count {} outside [{MIN_KDF_ITERATIONS}, {MAX_KDF_ITERATIONS}]",
                self.kdf_iterations
            )));
        }
        if self.security_version == 0 {
            return Err(PackError::InvalidParameter(
                "security version must be non-zero".to_string(),
            ));
        }
        if self.master_salt.iter().all(|&b| b == 0) {
            return Err(PackError::InvalidParameter(
                "master salt is all zero (uninitialised parameters)".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a 48-byte record.
    ///
    /// # Errors
    ///
    /// Fails when the reader runs short.
    pub fn parse<R: Read>(mut r: R) -> Result<Self, PackError> {
        let kdf_iterations = r.read_u32::<LittleEndian>()?;
        let mut master_salt = [0u8; 32];
        r.read_exact(&mut master_salt)?;
        let security_version = r.read_u8()?;
        let mut reserved = [0u8; 15];
        r.read_exact(&mut reserved)?;
        Ok(Self {
            kdf_iterations,
            master_salt,
            security_version,
        })
    }

    /// Serialise the 48-byte record.
    ///
    /// # Errors
    ///
    /// Fails when the writer does.
    pub fn serialize<W: Write>(&self, mut w: W) -> Result<(), PackError> {
        w.write_u32::<LittleEndian>(self.kdf_iterations)?;
        w.write_all(&self.master_salt)?;
        w.write_u8(self.security_version)?;
        w.write_all(&[0u8; 15])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_yields_valid_parameters() {
        let params = SecurityParameters::generate(50_000).unwrap();
        assert_eq!(params.kdf_iterations, 50_000);
        assert_eq!(params.security_version, 1);
        assert_ne!(params.master_salt, [0u8; 32]);
        params.validate().unwrap();
    }

    #[test]
    fn generate_rejects_out_of_range_iterations() {
        assert!(SecurityParameters::generate(0).is_err());
        assert!(SecurityParameters::generate(9_999).is_err());
        assert!(SecurityParameters::generate(1_000_001).is_err());
    }

    #[test]
    fn validate_rejects_zero_salt_and_version() {
        let mut params = SecurityParameters::generate(10_000).unwrap();
        params.master_salt = [0u8; 32];
        assert!(params.validate().is_err());

        let mut params = SecurityParameters::generate(10_000).unwrap();
        params.security_version = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn wire_roundtrip_is_48_bytes() {
        let params = SecurityParameters {
            kdf_iterations: 123_456,
            master_salt: [0xA5; 32],
            security_version: 7,
        };
        let mut buf = Vec::new();
        params.serialize(&mut buf).unwrap();
        assert_eq!(buf.len(), SecurityParameters::SIZE);

        let parsed = SecurityParameters::parse(&buf[..]).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn parse_ignores_reserved_bytes() {
        let params = SecurityParameters {
            kdf_iterations: 10_000,
            master_salt: [1; 32],
            security_version: 1,
        };
        let mut buf = Vec::new();
        params.serialize(&mut buf).unwrap();
        for b in &mut buf[37..] {
            *b = 0xEE;
        }
        let parsed = SecurityParameters::parse(&buf[..]).unwrap();
        assert_eq!(parsed, params);
    }
}
