//! Checksummed text encoding for binary material
//!
//! Keys and ciphertext envelopes travel as base58-check strings: the base58
//! (Bitcoin alphabet) rendering of `payload || checksum`, where the checksum
//! is the first four bytes of `SHA256(SHA256(payload))`.
//!
//! The encoded form is:
//! - Free of whitespace (including newlines)
//! - Free of visually ambiguous characters (`0`, `O`, `I`, `l`)
//! - Safe to pass unescaped in a POSIX shell

use crate::error::{BeltError, ErrorCategory, ErrorKind, Result};
use sha2::{Digest, Sha256};

/// Length of the trailing checksum in bytes
pub const CHECKSUM_LEN: usize = 4;

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(Sha256::digest(payload));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Encode bytes, returning the checksummed base58 string
pub fn wrap(payload: &[u8]) -> String {
    let mut body = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    body.extend_from_slice(payload);
    body.extend_from_slice(&checksum(payload));
    bs58::encode(body).into_string()
}

/// Decode a checksummed base58 string, returning the original bytes
pub fn unwrap(encoded: &str) -> Result<Vec<u8>> {
    let mut body = bs58::decode(encoded).into_vec().map_err(|e| {
        BeltError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Encoding,
            format!("base58 decoding failed: {}", e),
            e,
        )
    })?;

    if body.len() < CHECKSUM_LEN {
        return Err(BeltError::user(
            ErrorKind::Encoding,
            "decoded payload smaller than checksum; likely truncated",
        ));
    }

    let payload_len = body.len() - CHECKSUM_LEN;
    if body[payload_len..] != checksum(&body[..payload_len]) {
        return Err(BeltError::user(
            ErrorKind::Checksum,
            "checksum mismatch; input is corrupt or mistyped",
        ));
    }

    body.truncate(payload_len);
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_bytes() {
        let armored = wrap(b"");
        assert_eq!(armored, "3QJmnh");
        assert_eq!(unwrap(&armored).unwrap(), b"");
    }

    #[test]
    fn test_simple_string() {
        let armored = wrap(b"hello world");
        assert_eq!(armored, "3vQB7B6MrGQZaxCuFg4oh");
        assert_eq!(unwrap(&armored).unwrap(), b"hello world");
    }

    #[test]
    fn test_bitcoin_address_vector() {
        // Version byte 0x00 followed by a RIPEMD-160 hash, the classic
        // worked example for version 1 Bitcoin addresses.
        let payload = hex::decode("00010966776006953d5567439e5e39f86a0d273bee").unwrap();
        let armored = wrap(&payload);
        assert_eq!(armored, "16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM");
        assert_eq!(unwrap(&armored).unwrap(), payload);
    }

    #[test]
    fn test_leading_zeros_preserved() {
        let payload = [0u8; 32];
        let armored = wrap(&payload);
        assert_eq!(armored, "11111111111111111111111111111111273Yts");
        assert_eq!(unwrap(&armored).unwrap(), payload);
    }

    #[test]
    fn test_large_data() {
        let bytes = vec![0x42u8; 4096];
        let armored = wrap(&bytes);
        assert_eq!(unwrap(&armored).unwrap(), bytes);
    }

    #[test]
    fn test_truncated_input() {
        let err = unwrap("").expect_err("expected truncated input error");
        assert_eq!(err.kind, Some(ErrorKind::Encoding));

        // Three bytes of payload cannot hold a four byte checksum.
        let short = bs58::encode([1u8, 2, 3]).into_string();
        let err = unwrap(&short).expect_err("expected truncated input error");
        assert_eq!(err.kind, Some(ErrorKind::Encoding));
    }

    #[test]
    fn test_bad_alphabet() {
        for bad in ["0abc", "OOPS", "Il1", "has space", "bad$$"] {
            let err = unwrap(bad).expect_err("expected base58 decode error");
            assert_eq!(err.kind, Some(ErrorKind::Encoding), "input {:?}", bad);
        }
    }

    #[test]
    fn test_corrupted_checksum() {
        let mut raw = bs58::decode(wrap(b"some key material")).into_vec().unwrap();
        let last = raw.len() - 1;
        for i in last + 1 - CHECKSUM_LEN..=last {
            raw[i] ^= 0x01;
            let err = unwrap(&bs58::encode(&raw).into_string())
                .expect_err("expected checksum error");
            assert_eq!(err.kind, Some(ErrorKind::Checksum));
            raw[i] ^= 0x01;
        }
    }

    #[test]
    fn test_mistyped_character() {
        let armored = wrap(b"another key");
        let mut chars: Vec<char> = armored.chars().collect();
        chars[3] = if chars[3] == 'z' { 'y' } else { 'z' };
        let mistyped: String = chars.into_iter().collect();

        let err = unwrap(&mistyped).expect_err("expected checksum error");
        assert_eq!(err.kind, Some(ErrorKind::Checksum));
    }

    #[test]
    fn test_no_whitespace() {
        let armored = wrap(b"test data with spaces\n\t");
        assert!(!armored.contains(' '));
        assert!(!armored.contains('\n'));
        assert!(!armored.contains('\t'));
    }

    proptest! {
        #[test]
        fn unwrap_inverts_wrap(data in proptest::collection::vec(any::<u8>(), 0..=512)) {
            prop_assert_eq!(unwrap(&wrap(&data)).unwrap(), data);
        }

        #[test]
        fn wrap_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..=256)) {
            prop_assert_eq!(wrap(&data), wrap(&data));
        }
    }
}
