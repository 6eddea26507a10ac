//! WireGuard keypair generation
//!
//! Produces an X25519 private/public pair rendered the way `wg genkey` and
//! `wg pubkey` print them: standard padded base64, no checksum. No key
//! agreement is ever computed here.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Length of an X25519 scalar or point in bytes
pub const X25519_KEY_LEN: usize = 32;

pub struct WireguardKeypair {
    private: Zeroizing<String>,
    public: String,
}

impl WireguardKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; X25519_KEY_LEN]);
        OsRng.fill_bytes(&mut *bytes);
        Self::from_private_bytes(*bytes)
    }

    /// Build the keypair for an existing private scalar.
    ///
    /// The scalar is clamped before it is rendered, so the private half always
    /// matches what WireGuard itself would store.
    pub fn from_private_bytes(bytes: [u8; X25519_KEY_LEN]) -> Self {
        let mut clamped = Zeroizing::new(bytes);
        clamped[0] &= 248;
        clamped[31] &= 127;
        clamped[31] |= 64;

        let secret = StaticSecret::from(*clamped);
        let public = PublicKey::from(&secret);
        tracing::debug!("generated x25519 keypair");

        Self {
            private: Zeroizing::new(STANDARD.encode(secret.as_bytes())),
            public: STANDARD.encode(public.as_bytes()),
        }
    }

    pub fn private_key(&self) -> &str {
        &self.private
    }

    pub fn public_key(&self) -> &str {
        &self.public
    }

    /// Two labeled lines, for humans.
    pub fn labeled(&self) -> String {
        format!(
            "Private key: {}\nPublic key: {}",
            self.private_key(),
            self.public_key()
        )
    }

    /// `PRIVATE PUBLIC` on a single line, for scripts.
    pub fn script_line(&self) -> String {
        format!("{} {}", self.private_key(), self.public_key())
    }
}

impl fmt::Debug for WireguardKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireguardKeypair")
            .field("private", &"[REDACTED]")
            .field("public", &self.public)
            .finish()
    }
}
