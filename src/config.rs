//! User configuration
//!
//! Stored as TOML at `<config dir>/belt/config.toml`:
//!
//! ```toml
//! [crypt]
//! env = "BELT_CRYPT_KEY"   # environment variable that supersedes `key`
//! key = "..."              # base58-check encoded 32 byte key
//! warned = false           # set to true once the key is backed up
//! ```
//!
//! The loaded value is handed to callers explicitly; nothing here is global.

use crate::error::{BeltError, ErrorCategory, ErrorKind, Result};
use crate::file_ops;
use crate::random;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable consulted for the key unless configured otherwise
pub const DEFAULT_KEY_ENV: &str = "BELT_CRYPT_KEY";

const CONFIG_HEADER: &str = "\
# Configuration file for belt
#
# [crypt]
# env    - environment variable containing the encryption key;
#          supersedes the 'key' field when set
# key    - key used for encryption and decryption
# warned - whether you have been warned about losing the key
";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crypt: CryptConfig,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptConfig {
    pub env: Option<String>,
    pub key: Option<String>,
    pub warned: bool,
}

impl Default for CryptConfig {
    fn default() -> Self {
        Self {
            env: Some(DEFAULT_KEY_ENV.to_string()),
            key: None,
            warned: false,
        }
    }
}

impl fmt::Debug for CryptConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptConfig")
            .field("env", &self.env)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("warned", &self.warned)
            .finish()
    }
}

impl CryptConfig {
    /// Resolve the encoded key: explicit override, then the configured
    /// environment variable, then the `key` field.
    pub fn resolve_key(&self, key_override: Option<&str>) -> Result<String> {
        self.resolve_key_with(key_override, |name| std::env::var(name).ok())
    }

    pub fn resolve_key_with(
        &self,
        key_override: Option<&str>,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> Result<String> {
        if let Some(key) = key_override {
            tracing::debug!("using key from command line");
            return Ok(key.to_string());
        }

        if let Some(name) = self.env.as_deref().filter(|name| !name.is_empty()) {
            if let Some(key) = lookup_env(name).filter(|key| !key.trim().is_empty()) {
                tracing::debug!(env = name, "using key from environment");
                return Ok(key);
            }
        }

        if let Some(key) = self.key.as_deref().filter(|key| !key.trim().is_empty()) {
            tracing::debug!("using key from configuration file");
            return Ok(key.to_string());
        }

        let env_hint = self.env.as_deref().unwrap_or(DEFAULT_KEY_ENV);
        Err(BeltError::user(
            ErrorKind::KeyUnavailable,
            format!(
                "no encryption key found; run 'belt init', set {}, or pass --key",
                env_hint
            ),
        ))
    }
}

impl Config {
    /// The per-user configuration path.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            BeltError::user(
                ErrorKind::Config,
                "could not determine the configuration directory",
            )
        })?;
        Ok(dir.join("belt").join("config.toml"))
    }

    /// Load configuration from `path`. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            let msg = if e.kind() == io::ErrorKind::NotFound {
                format!(
                    "no config file found at {}; run 'belt init' to create one",
                    path.display()
                )
            } else {
                format!("failed to read config file {}", path.display())
            };
            let category = if e.kind() == io::ErrorKind::NotFound {
                ErrorCategory::User
            } else {
                ErrorCategory::Internal
            };
            BeltError::with_kind_and_source(category, ErrorKind::Config, msg, e)
        })?;

        let config = toml::from_str(&content).map_err(|e| {
            BeltError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Config,
                format!("invalid TOML in {}", path.display()),
                e,
            )
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// A fresh configuration holding a newly generated key.
    pub fn generate_default() -> Self {
        Self {
            crypt: CryptConfig {
                key: Some(random::generate_encoded_key()),
                ..CryptConfig::default()
            },
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        let body = toml::to_string_pretty(self).map_err(|e| {
            BeltError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Config,
                "failed to serialize configuration",
                e,
            )
        })?;
        Ok(format!("{}\n{}", CONFIG_HEADER, body))
    }

    /// Write the configuration to `path`, refusing to replace an existing
    /// file unless `overwrite` is set.
    pub fn write(&self, path: &Path, overwrite: bool) -> Result<()> {
        if path.exists() && !overwrite {
            return Err(BeltError::user(
                ErrorKind::Precondition,
                format!(
                    "config file already exists at {}; pass --overwrite to replace it",
                    path.display()
                ),
            ));
        }

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                BeltError::io(format!("failed to create directory {}", dir.display()), e)
            })?;
        }

        file_ops::write_file_atomic(path, self.to_toml()?.as_bytes())?;
        tracing::debug!(path = %path.display(), "wrote configuration");
        Ok(())
    }
}
