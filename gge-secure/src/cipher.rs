//! AES-256 in 128-bit cipher feedback mode.
//!
//! The container format pads plaintext to a 16-byte multiple before
//! encryption, so these one-shot helpers only ever see full buffers; CFB
//! itself has no alignment requirement.

use aes::Aes256;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use cfb_mode::{Decryptor, Encryptor};

type Aes256CfbEnc = Encryptor<Aes256>;
type Aes256CfbDec = Decryptor<Aes256>;

/// Encrypt `data` in place with AES-256-CFB128.
pub fn aes256_cfb_encrypt(key: &[u8; 32], iv: &[u8; 16], data: &mut [u8]) {
    Aes256CfbEnc::new(key.into(), iv.into()).encrypt(data);
}

/// Decrypt `data` in place with AES-256-CFB128.
pub fn aes256_cfb_decrypt(key: &[u8; 32], iv: &[u8; 16], data: &mut [u8]) {
    Aes256CfbDec::new(key.into(), iv.into()).decrypt(data);
}
