//! Authenticated envelope encryption using ChaCha20-Poly1305 + BLAKE2b
//!
//! Every envelope carries a BLAKE2b-512 digest of the plaintext. The digest
//! is bound to the ciphertext as associated data, and is checked a second
//! time against the decrypted plaintext before anything is returned.
//!
//! The binary format is:
//! - nonce: 12 bytes
//! - digest: 64 bytes (BLAKE2b-512 of the plaintext)
//! - sealed box: variable length (includes 16-byte Poly1305 tag)

use crate::error::{BeltError, ErrorCategory, ErrorKind, Result};
use crate::keycodec;
use blake2::{Blake2b512, Digest};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use zeroize::Zeroize;

/// Length of a key in bytes
pub const KEY_LEN: usize = 32;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the plaintext digest in bytes
pub const DIGEST_LEN: usize = 64;

/// Length of the Poly1305 tag appended by the cipher
pub const TAG_LEN: usize = 16;

/// Offset at which the sealed box starts
pub const HEADER_LEN: usize = NONCE_LEN + DIGEST_LEN;

/// A 256-bit symmetric key. Zeroized on drop.
#[derive(Clone)]
pub struct Key {
    bytes: [u8; KEY_LEN],
}

impl Key {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Copy key material out of a slice, which must be exactly 32 bytes.
    pub fn from_slice(material: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = material.try_into().map_err(|_| {
            BeltError::user(
                ErrorKind::InvalidKeyLength,
                format!(
                    "invalid key length: expected {} bytes, got {}",
                    KEY_LEN,
                    material.len()
                ),
            )
        })?;
        Ok(Self { bytes })
    }

    /// Decode a key from its base58-check text form.
    pub fn decode(encoded: &str) -> Result<Self> {
        let mut material = keycodec::unwrap(encoded.trim())
            .map_err(|e| e.with_context("failed to decode encryption key"))?;
        let key = Self::from_slice(&material);
        material.zeroize();
        key
    }

    /// Render the key in its base58-check text form.
    pub fn encode(&self) -> String {
        keycodec::wrap(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("bytes", &"[REDACTED]").finish()
    }
}

/// BLAKE2b-512 digest of `data`
pub fn integrity_digest(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&Blake2b512::digest(data));
    out
}

/// Encrypt plaintext under `key` using a random nonce
///
/// Returns the binary format: nonce(12) + digest(64) + sealedbox(variable)
pub fn encrypt(key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    encrypt_deterministic(key, plaintext, &nonce)
}

/// Encrypt plaintext and return the envelope in its checksummed text form
pub fn encrypt_wrapped(key: &Key, plaintext: &[u8]) -> Result<String> {
    Ok(keycodec::wrap(&encrypt(key, plaintext)?))
}

/// Encrypt plaintext under `key` using the provided nonce
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates a random nonce.
pub fn encrypt_deterministic(
    key: &Key,
    plaintext: &[u8],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let digest = integrity_digest(plaintext);
    seal(key, nonce, plaintext, &digest)
}

fn seal(
    key: &Key,
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    digest: &[u8; DIGEST_LEN],
) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    let sealed_box = cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad: digest,
            },
        )
        .map_err(|e| {
            BeltError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                format!("encryption failed: {}", e),
            )
        })?;

    let mut output = Vec::with_capacity(HEADER_LEN + sealed_box.len());
    output.extend_from_slice(nonce);
    output.extend_from_slice(digest);
    output.extend_from_slice(&sealed_box);

    tracing::debug!(
        plaintext_len = plaintext.len(),
        envelope_len = output.len(),
        "sealed envelope"
    );
    Ok(output)
}

/// Decrypt a raw envelope
pub fn decrypt(key: &Key, envelope: &[u8]) -> Result<Vec<u8>> {
    if envelope.len() < HEADER_LEN + TAG_LEN {
        return Err(BeltError::user(
            ErrorKind::Encoding,
            format!(
                "envelope is {} bytes, shorter than the {} byte minimum; likely truncated",
                envelope.len(),
                HEADER_LEN + TAG_LEN
            ),
        ));
    }

    let (nonce, rest) = envelope.split_at(NONCE_LEN);
    let (digest, sealed_box) = rest.split_at(DIGEST_LEN);

    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    let mut plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: sealed_box,
                aad: digest,
            },
        )
        .map_err(|_| {
            BeltError::user(
                ErrorKind::Authentication,
                "corrupt input, tampered-with data, or wrong key",
            )
        })?;

    // The digest is already authenticated as associated data; this is the
    // second, independent gate over the recovered plaintext.
    if integrity_digest(&plaintext)[..] != *digest {
        plaintext.zeroize();
        return Err(BeltError::user(
            ErrorKind::IntegrityMismatch,
            "decrypted data does not match its recorded digest",
        ));
    }

    tracing::debug!(
        envelope_len = envelope.len(),
        plaintext_len = plaintext.len(),
        "opened envelope"
    );
    Ok(plaintext)
}

/// Decrypt an envelope given in its checksummed text form
pub fn decrypt_wrapped(key: &Key, wrapped: &str) -> Result<Vec<u8>> {
    let envelope = keycodec::unwrap(wrapped).map_err(|e| e.with_context("failed to unwrap"))?;
    decrypt(key, &envelope)
}

/// Decrypt an envelope given in text form and interpret the plaintext as UTF-8
pub fn decrypt_to_string(key: &Key, wrapped: &str) -> Result<String> {
    let plaintext = decrypt_wrapped(key, wrapped)?;
    String::from_utf8(plaintext).map_err(|e| {
        let utf8_error = e.utf8_error();
        e.into_bytes().zeroize();
        BeltError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidUtf8,
            "decrypted data is not valid UTF-8",
            utf8_error,
        )
    })
}

/// Encryption engine bound to a single key
#[derive(Debug, Clone)]
pub struct Cryptor {
    key: Key,
}

impl Cryptor {
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    /// Build a cryptor from a base58-check encoded key.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        Ok(Self::new(Key::decode(encoded)?))
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        encrypt(&self.key, plaintext)
    }

    pub fn encrypt_wrapped(&self, plaintext: &[u8]) -> Result<String> {
        encrypt_wrapped(&self.key, plaintext)
    }

    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        decrypt(&self.key, envelope)
    }

    pub fn decrypt_wrapped(&self, wrapped: &str) -> Result<Vec<u8>> {
        decrypt_wrapped(&self.key, wrapped)
    }

    pub fn decrypt_to_string(&self, wrapped: &str) -> Result<String> {
        decrypt_to_string(&self.key, wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_key(fill: u8) -> Key {
        Key::from_bytes([fill; KEY_LEN])
    }

    #[test]
    fn test_empty_plaintext() {
        let key = test_key(7);
        let envelope = encrypt(&key, b"").unwrap();
        assert_eq!(envelope.len(), HEADER_LEN + TAG_LEN);
        assert_eq!(decrypt(&key, &envelope).unwrap(), b"");
    }

    #[test]
    fn test_hello_world_scenario() {
        let encoded = crate::random::generate_encoded_key();
        let cryptor = Cryptor::from_encoded(&encoded).unwrap();

        let wrapped = cryptor.encrypt_wrapped(b"hello world").unwrap();
        let raw = keycodec::unwrap(&wrapped).unwrap();
        assert_eq!(raw.len(), NONCE_LEN + DIGEST_LEN + 11 + TAG_LEN);
        assert!(wrapped.chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(cryptor.decrypt_wrapped(&wrapped).unwrap(), b"hello world");
        assert_eq!(cryptor.decrypt_to_string(&wrapped).unwrap(), "hello world");
    }

    #[test]
    fn test_envelope_layout() {
        let key = test_key(1);
        let nonce = [0x24u8; NONCE_LEN];
        let plaintext = b"test payload";

        let envelope = encrypt_deterministic(&key, plaintext, &nonce).unwrap();

        assert_eq!(&envelope[..NONCE_LEN], &nonce);
        assert_eq!(&envelope[NONCE_LEN..HEADER_LEN], &integrity_digest(plaintext));
        assert_eq!(envelope.len(), HEADER_LEN + plaintext.len() + TAG_LEN);
    }

    #[test]
    fn test_deterministic_encryption() {
        let key = test_key(1);
        let nonce = [2u8; NONCE_LEN];

        let ct1 = encrypt_deterministic(&key, b"hello world", &nonce).unwrap();
        let ct2 = encrypt_deterministic(&key, b"hello world", &nonce).unwrap();
        assert_eq!(ct1, ct2);

        let ct3 = encrypt_deterministic(&key, b"hello world", &[3u8; NONCE_LEN]).unwrap();
        assert_ne!(ct1, ct3);
        assert_eq!(decrypt(&key, &ct3).unwrap(), b"hello world");
    }

    #[test]
    fn test_random_nonce_per_call() {
        let key = test_key(1);
        let ct1 = encrypt(&key, b"same").unwrap();
        let ct2 = encrypt(&key, b"same").unwrap();
        assert_ne!(ct1[..NONCE_LEN], ct2[..NONCE_LEN]);
    }

    #[test]
    fn test_wrong_key() {
        let envelope = encrypt(&crate::random::generate_key(), b"secret data").unwrap();
        let err = decrypt(&crate::random::generate_key(), &envelope)
            .expect_err("expected authentication failure");
        assert_eq!(err.kind, Some(ErrorKind::Authentication));
    }

    #[test]
    fn test_every_bit_flip_is_detected() {
        let key = test_key(9);
        let envelope = encrypt(&key, b"tamper me").unwrap();

        for byte in 0..envelope.len() {
            for bit in 0..8 {
                let mut tampered = envelope.clone();
                tampered[byte] ^= 1 << bit;
                let err = decrypt(&key, &tampered).expect_err("expected tamper detection");
                assert_eq!(
                    err.kind,
                    Some(ErrorKind::Authentication),
                    "byte {} bit {}",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_digest_mismatch_behind_valid_tag() {
        // An envelope whose tag covers a digest that does not belong to the
        // plaintext. The cipher accepts it, the digest check must not.
        let key = test_key(4);
        let nonce = [5u8; NONCE_LEN];
        let forged = integrity_digest(b"something else");
        let envelope = seal(&key, &nonce, b"actual plaintext", &forged).unwrap();

        let err = decrypt(&key, &envelope).expect_err("expected integrity mismatch");
        assert_eq!(err.kind, Some(ErrorKind::IntegrityMismatch));
    }

    #[test]
    fn test_truncated_envelope() {
        let key = test_key(1);
        for len in [0, NONCE_LEN, HEADER_LEN, HEADER_LEN + TAG_LEN - 1] {
            let err = decrypt(&key, &vec![0u8; len]).expect_err("expected encoding error");
            assert_eq!(err.kind, Some(ErrorKind::Encoding), "length {}", len);
        }

        let envelope = encrypt(&key, b"hello").unwrap();
        let err = decrypt(&key, &envelope[..envelope.len() - 1])
            .expect_err("expected authentication failure");
        assert_eq!(err.kind, Some(ErrorKind::Authentication));
    }

    #[test]
    fn test_wrapped_checksum_errors_propagate() {
        let key = test_key(1);
        let wrapped = encrypt_wrapped(&key, b"hello").unwrap();
        let mut raw = bs58::decode(&wrapped).into_vec().unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;

        let err = decrypt_wrapped(&key, &bs58::encode(&raw).into_string())
            .expect_err("expected checksum error");
        assert_eq!(err.kind, Some(ErrorKind::Checksum));

        let err = decrypt_wrapped(&key, "not*base58").expect_err("expected encoding error");
        assert_eq!(err.kind, Some(ErrorKind::Encoding));
    }

    #[test]
    fn test_stringify_rejects_invalid_utf8() {
        let key = test_key(1);
        let wrapped = encrypt_wrapped(&key, &[0xff, 0xfe, 0x00]).unwrap();

        assert_eq!(decrypt_wrapped(&key, &wrapped).unwrap(), [0xff, 0xfe, 0x00]);
        let err = decrypt_to_string(&key, &wrapped).expect_err("expected utf-8 error");
        assert_eq!(err.kind, Some(ErrorKind::InvalidUtf8));
    }

    #[test]
    fn test_key_length_contract() {
        for len in [0, 16, 31, 33, 64] {
            let err = Key::from_slice(&vec![0u8; len]).expect_err("expected length error");
            assert_eq!(err.kind, Some(ErrorKind::InvalidKeyLength));
        }

        let short = keycodec::wrap(&[1u8; 16]);
        let err = Cryptor::from_encoded(&short).expect_err("expected length error");
        assert_eq!(err.kind, Some(ErrorKind::InvalidKeyLength));
    }

    #[test]
    fn test_key_encode_decode() {
        let key = test_key(0xAB);
        let decoded = Key::decode(&format!("{}\n", key.encode())).unwrap();
        assert_eq!(decoded.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let rendered = format!("{:?}", test_key(0x41));
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("65"));
    }

    #[test]
    fn test_large_plaintext() {
        let key = test_key(1);
        let plaintext = vec![0x42u8; 128 * 1024];
        let envelope = encrypt(&key, &plaintext).unwrap();
        assert_eq!(decrypt(&key, &envelope).unwrap(), plaintext);
    }

    proptest! {
        #[test]
        fn wrapped_roundtrip(
            key_bytes in any::<[u8; KEY_LEN]>(),
            plaintext in proptest::collection::vec(any::<u8>(), 0..=1024),
        ) {
            let key = Key::from_bytes(key_bytes);
            let wrapped = encrypt_wrapped(&key, &plaintext).unwrap();
            prop_assert_eq!(decrypt_wrapped(&key, &wrapped).unwrap(), plaintext);
        }
    }
}
