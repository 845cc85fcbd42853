//! Encrypted container state machine.
//!
//! An [`EncryptedFile`] drives one base handle through
//! `Closed → Writing → Closed` or `Closed → Reading → Closed`. Writing
//! accumulates plaintext in memory and emits the whole container on
//! [`close`]; reading decrypts and verifies the whole container up front and
//! then serves buffered reads with clamp-on-seek and EOF semantics.
//!
//! [`close`]: EncryptedFile::close

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use zeroize::Zeroize;

use gge_secure::{cipher, digest};

use crate::error::PackError;
use crate::keys::{password_to_key, KeyLadder, PACK_FORMAT_VERSION};
use crate::params::SecurityParameters;

/// Container magic 'CEGH', stored little-endian when enabled.
pub const ENCRYPTED_MAGIC: u32 = 0x4345_4748;

/// Iteration count used when the writer generates fresh parameters.
pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Closed,
    Reading,
    Writing,
}

/// One encrypted container over a seekable base handle.
pub struct EncryptedFile<F> {
    inner: Option<F>,
    mode: Mode,
    ladder: Option<KeyLadder>,
    use_magic: bool,
    data: Vec<u8>,
    pos: u64,
    eofed: bool,
}

impl<F> EncryptedFile<F> {
    /// A closed container; attach a handle with
    /// [`open_read`](Self::open_read) or [`open_write`](Self::open_write).
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: None,
            mode: Mode::Closed,
            ladder: None,
            use_magic: true,
            data: Vec::new(),
            pos: 0,
            eofed: false,
        }
    }

    /// Whether a base handle is attached.
    pub const fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Plaintext length of the open container.
    pub fn length(&self) -> u64 {
        self.data.len() as u64
    }

    /// Current position in the plaintext buffer.
    pub const fn position(&self) -> u64 {
        self.pos
    }

    /// Whether a read ran past the end of the plaintext.
    pub const fn eof_reached(&self) -> bool {
        self.eofed
    }

    /// Seek within the plaintext; clamps to `[0, length]` and clears EOF.
    pub fn seek(&mut self, pos: u64) {
        self.pos = pos.min(self.length());
        self.eofed = false;
    }

    /// Seek relative to the end of the plaintext.
    pub fn seek_end(&mut self, offset: i64) {
        self.seek(self.length().saturating_add_signed(offset));
    }

    /// Append plaintext at the current position (write mode only).
    ///
    /// Data stays in memory until [`close`](Self::close); nothing is flushed
    /// early.
    ///
    /// # Errors
    ///
    /// [`PackError::Unconfigured`] outside write mode.
    pub fn store_buffer(&mut self, src: &[u8]) -> Result<(), PackError> {
        if self.mode != Mode::Writing {
            return Err(PackError::Unconfigured("store_buffer requires write mode"));
        }
        if src.is_empty() {
            return Ok(());
        }
        let pos = self.pos as usize;
        let end = pos + src.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[pos..end].copy_from_slice(src);
        self.pos = end as u64;
        Ok(())
    }

    /// Copy decrypted plaintext into `dst` (read mode only).
    ///
    /// Returns the number of bytes copied; a short count sets the EOF flag.
    ///
    /// # Errors
    ///
    /// [`PackError::Unconfigured`] outside read mode.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize, PackError> {
        if self.mode != Mode::Reading {
            return Err(PackError::Unconfigured("read requires read mode"));
        }
        let pos = self.pos as usize;
        let available = self.data.len().saturating_sub(pos);
        let to_copy = dst.len().min(available);
        dst[..to_copy].copy_from_slice(&self.data[pos..pos + to_copy]);
        self.pos += to_copy as u64;
        if to_copy < dst.len() {
            self.eofed = true;
        }
        Ok(to_copy)
    }

    /// The whole decrypted plaintext (read mode only).
    ///
    /// # Errors
    ///
    /// [`PackError::Unconfigured`] outside read mode.
    pub fn get_buffer(&self) -> Result<&[u8], PackError> {
        if self.mode != Mode::Reading {
            return Err(PackError::Unconfigured("get_buffer requires read mode"));
        }
        Ok(&self.data)
    }
}

impl<F> Default for EncryptedFile<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> Drop for EncryptedFile<F> {
    fn drop(&mut self) {
        // Buffered plaintext of an unclosed writer is discarded, never
        // flushed; key material is zeroed by the ladder's own drop.
        self.data.zeroize();
    }
}

impl<F: Read + Write + Seek> EncryptedFile<F> {
    /// Open `base` for writing.
    ///
    /// When `params` is omitted, fresh parameters are generated with
    /// [`DEFAULT_KDF_ITERATIONS`] and a CSPRNG salt; a supplied set is used
    /// as-is, which keeps writer runs reproducible.
    ///
    /// # Errors
    ///
    /// [`PackError::AlreadyInUse`] when a handle is attached,
    /// [`PackError::InvalidParameter`] when `params` does not validate.
    pub fn open_write(
        &mut self,
        base: F,
        user_key: [u8; 32],
        file_path: &str,
        use_magic: bool,
        params: Option<SecurityParameters>,
    ) -> Result<(), PackError> {
        if self.inner.is_some() {
            return Err(PackError::AlreadyInUse);
        }
        let params = match params {
            Some(p) => p,
            None => SecurityParameters::generate(DEFAULT_KDF_ITERATIONS)?,
        };
        let mut ladder = KeyLadder::new(user_key, params, file_path, PACK_FORMAT_VERSION)?;
        ladder.derive_master()?;
        ladder.derive_file("WRITE")?;

        self.inner = Some(base);
        self.mode = Mode::Writing;
        self.ladder = Some(ladder);
        self.use_magic = use_magic;
        self.data.clear();
        self.pos = 0;
        self.eofed = false;
        Ok(())
    }

    /// Open `base` for reading: parse the header, derive the key ladder,
    /// decrypt, and verify the plaintext MD5.
    ///
    /// # Errors
    ///
    /// [`PackError::UnrecognizedFormat`] on a magic mismatch,
    /// [`PackError::Corrupt`] on short ciphertext, invalid stored
    /// parameters, or an MD5 mismatch.
    pub fn open_read(
        &mut self,
        mut base: F,
        user_key: [u8; 32],
        file_path: &str,
        use_magic: bool,
    ) -> Result<(), PackError> {
        if self.inner.is_some() {
            return Err(PackError::AlreadyInUse);
        }

        if use_magic {
            let magic = base.read_u32::<LittleEndian>()?;
            if magic != ENCRYPTED_MAGIC {
                return Err(PackError::UnrecognizedFormat);
            }
        }

        let params = SecurityParameters::parse(&mut base)?;
        params
            .validate()
            .map_err(|e| PackError::Corrupt(format!("stored security parameters: {e}")))?;

        let mut stored_md5 = [0u8; 16];
        base.read_exact(&mut stored_md5)?;
        let length = base.read_u64::<LittleEndian>()?;

        let mut ladder = KeyLadder::new(user_key, params, file_path, PACK_FORMAT_VERSION)?;
        ladder.derive_master()?;
        ladder.derive_file("READ")?;
        ladder.finalize(length, &stored_md5)?;
        let iv = ladder.derive_iv()?;

        let padded = length
            .checked_add(15)
            .map(|l| l & !15)
            .ok_or_else(|| PackError::Corrupt("plaintext length overflows".to_string()))?;

        let start = base.stream_position()?;
        let total = base.seek(SeekFrom::End(0))?;
        base.seek(SeekFrom::Start(start))?;
        if total.saturating_sub(start) < padded {
            return Err(PackError::Corrupt(
                "ciphertext shorter than the declared length".to_string(),
            ));
        }

        let mut data = vec![0u8; padded as usize];
        base.read_exact(&mut data)
            .map_err(|_| PackError::Corrupt("short read of ciphertext".to_string()))?;
        cipher::aes256_cfb_decrypt(ladder.final_key()?, &iv, &mut data);
        data.truncate(length as usize);

        let actual_md5 = digest::md5(&data);
        if !constant_time_eq(&actual_md5, &stored_md5) {
            data.zeroize();
            return Err(PackError::Corrupt(
                "MD5 of the decrypted contents does not match; integrity check failed"
                    .to_string(),
            ));
        }

        self.inner = Some(base);
        self.mode = Mode::Reading;
        self.ladder = Some(ladder);
        self.use_magic = use_magic;
        self.data = data;
        self.pos = 0;
        self.eofed = false;
        Ok(())
    }

    /// Password convenience over [`open_read`](Self::open_read) using the
    /// legacy MD5-hex key mapping.
    pub fn open_read_password(
        &mut self,
        base: F,
        password: &str,
        file_path: &str,
        use_magic: bool,
    ) -> Result<(), PackError> {
        self.open_read(base, password_to_key(password), file_path, use_magic)
    }

    /// Password convenience over [`open_write`](Self::open_write).
    pub fn open_write_password(
        &mut self,
        base: F,
        password: &str,
        file_path: &str,
        use_magic: bool,
    ) -> Result<(), PackError> {
        self.open_write(base, password_to_key(password), file_path, use_magic, None)
    }

    /// Close the container.
    ///
    /// In write mode this finalizes the key ladder against the buffered
    /// plaintext and emits the whole container as one sequence; on any
    /// failure the buffered data is discarded rather than partially kept.
    /// Key material is zeroed in every case. Closing a closed container is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Propagates derivation and I/O failures from the write path.
    pub fn close(&mut self) -> Result<(), PackError> {
        let Some(mut base) = self.inner.take() else {
            return Ok(());
        };
        let result = if self.mode == Mode::Writing {
            self.emit_container(&mut base)
        } else {
            Ok(())
        };
        self.mode = Mode::Closed;
        self.data.zeroize();
        self.data = Vec::new();
        self.pos = 0;
        self.eofed = false;
        if let Some(ladder) = self.ladder.as_mut() {
            ladder.clear();
        }
        self.ladder = None;
        result
    }

    fn emit_container(&mut self, base: &mut F) -> Result<(), PackError> {
        let ladder = self
            .ladder
            .as_mut()
            .ok_or(PackError::Unconfigured("writer has no key ladder"))?;

        let length = self.data.len() as u64;
        let hash = digest::md5(&self.data);

        ladder.finalize(length, &hash)?;
        let iv = ladder.derive_iv()?;

        let padded = (self.data.len() + 15) & !15;
        self.data.resize(padded, 0);
        cipher::aes256_cfb_encrypt(ladder.final_key()?, &iv, &mut self.data);

        if self.use_magic {
            base.write_u32::<LittleEndian>(ENCRYPTED_MAGIC)?;
        }
        ladder.security_parameters().serialize(&mut *base)?;
        base.write_all(&hash)?;
        base.write_u64::<LittleEndian>(length)?;
        base.write_all(&self.data)?;
        Ok(())
    }
}

fn constant_time_eq(a: &[u8; 16], b: &[u8; 16]) -> bool {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
