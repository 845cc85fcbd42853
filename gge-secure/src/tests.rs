use crate::{cipher, digest, kdf, rng};

fn unhex(s: &str) -> Vec<u8> {
    assert!(s.len() % 2 == 0);
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

#[test]
fn md5_known_vectors() {
    assert_eq!(
        digest::md5(b"").to_vec(),
        unhex("d41d8cd98f00b204e9800998ecf8427e")
    );
    assert_eq!(
        digest::md5(b"abc").to_vec(),
        unhex("900150983cd24fb0d6963f7d28e17f72")
    );
}

#[test]
fn hmac_sha256_rfc4231_case_2() {
    let mac = digest::hmac_sha256(b"Jefe", b"what do ya want for nothing?");
    assert_eq!(
        mac.to_vec(),
        unhex("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
    );
}

#[test]
fn pbkdf2_sha256_known_vectors() {
    let mut out = [0u8; 32];
    kdf::pbkdf2_hmac_sha256(b"password", b"salt", 1, &mut out).unwrap();
    assert_eq!(
        out.to_vec(),
        unhex("120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b")
    );

    kdf::pbkdf2_hmac_sha256(b"password", b"salt", 2, &mut out).unwrap();
    assert_eq!(
        out.to_vec(),
        unhex("ae4d0c95af6b46d32d0adff928f06dd02a303f8ef3c251dfd6e2d85a95474c43")
    );
}

#[test]
fn pbkdf2_rejects_zero_iterations() {
    let mut out = [0u8; 32];
    assert!(kdf::pbkdf2_hmac_sha256(b"password", b"salt", 0, &mut out).is_err());
}

#[test]
fn hkdf_sha256_rfc5869_case_1() {
    let ikm = unhex("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b");
    let salt = unhex("000102030405060708090a0b0c");
    let info = unhex("f0f1f2f3f4f5f6f7f8f9");
    let mut okm = [0u8; 42];
    kdf::hkdf_sha256(&salt, &ikm, &info, &mut okm).unwrap();
    assert_eq!(
        okm.to_vec(),
        unhex(
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf\
             34007208d5b887185865"
        )
    );
}

#[test]
fn hkdf_empty_salt_matches_none() {
    // An empty salt must select the RFC 5869 default of HashLen zero bytes.
    let ikm = [0x0bu8; 22];
    let mut a = [0u8; 32];
    let mut b = [0u8; 32];
    kdf::hkdf_sha256(&[], &ikm, b"ctx", &mut a).unwrap();
    kdf::hkdf_sha256(&[0u8; 32], &ikm, b"ctx", &mut b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn aes256_cfb_nist_f_3_17() {
    // NIST SP 800-38A, CFB128-AES256.Encrypt, first block.
    let key: [u8; 32] =
        unhex("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
            .try_into()
            .unwrap();
    let iv: [u8; 16] = unhex("000102030405060708090a0b0c0d0e0f")
        .try_into()
        .unwrap();
    let mut block = unhex("6bc1bee22e409f96e93d7e117393172a");

    cipher::aes256_cfb_encrypt(&key, &iv, &mut block);
    assert_eq!(block, unhex("dc7e84bfda79164b7ecd8486985d3860"));

    cipher::aes256_cfb_decrypt(&key, &iv, &mut block);
    assert_eq!(block, unhex("6bc1bee22e409f96e93d7e117393172a"));
}

#[test]
fn aes256_cfb_multi_block_roundtrip() {
    let key = [0x42u8; 32];
    let iv = [0x24u8; 16];
    let original: Vec<u8> = (0..64u8).collect();

    let mut data = original.clone();
    cipher::aes256_cfb_encrypt(&key, &iv, &mut data);
    assert_ne!(data, original);
    cipher::aes256_cfb_decrypt(&key, &iv, &mut data);
    assert_eq!(data, original);
}

#[test]
fn rng_fills_and_survives_deinitialize() {
    let mut a = [0u8; 32];
    let mut b = [0u8; 32];
    rng::fill_random(&mut a).unwrap();
    rng::fill_random(&mut b).unwrap();
    assert_ne!(a, b);
    assert_ne!(a, [0u8; 32]);

    // Teardown must be safe to call and the next fill re-initialises.
    rng::deinitialize();
    rng::fill_random(&mut a).unwrap();
    assert_ne!(a, [0u8; 32]);
}
