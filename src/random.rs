//! Secure random material: raw bytes, hex strings, passwords and keys
//!
//! Everything here draws from the operating system RNG.

use crate::cryptor::{KEY_LEN, Key};
use crate::error::{BeltError, ErrorKind, Result};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

pub const DIGITS: &[u8] = b"0123456789";
pub const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const PUNCTUATION: &[u8] = b"-_.@#$%&*+=:";

/// Shortest password `random_password` will produce
pub const MIN_PASSWORD_LEN: usize = 2;

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// `len` random bytes as lowercase hex (`2 * len` characters)
pub fn random_hex(len: usize) -> String {
    hex::encode(random_bytes(len))
}

fn pick(rng: &mut impl Rng, set: &[u8]) -> char {
    set[rng.gen_range(0..set.len())] as char
}

/// Generate a password of exactly `length` characters
///
/// The first character is a digit, the last is punctuation, and everything
/// in between is drawn from letters, digits and punctuation together.
pub fn random_password(length: usize) -> Result<String> {
    if length < MIN_PASSWORD_LEN {
        return Err(BeltError::user(
            ErrorKind::Precondition,
            format!(
                "password length must be at least {}, got {}",
                MIN_PASSWORD_LEN, length
            ),
        ));
    }

    let alphabet: Vec<u8> = [LETTERS, DIGITS, PUNCTUATION].concat();
    let mut rng = OsRng;

    let mut password = String::with_capacity(length);
    password.push(pick(&mut rng, DIGITS));
    for _ in 0..length - 2 {
        password.push(pick(&mut rng, &alphabet));
    }
    password.push(pick(&mut rng, PUNCTUATION));

    Ok(password)
}

/// Generate a fresh random key
pub fn generate_key() -> Key {
    let mut bytes = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut bytes);
    Key::from_bytes(bytes)
}

/// Generate a fresh random key in its base58-check text form
pub fn generate_encoded_key() -> String {
    generate_key().encode()
}
