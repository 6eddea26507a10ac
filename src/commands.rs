//! Command-level operations behind the `belt` binary
//!
//! Each operation reads from and writes to caller-provided streams so that
//! nothing is written anywhere until the whole operation has succeeded.

use crate::config::Config;
use crate::cryptor::Cryptor;
use crate::error::{BeltError, ErrorCategory, ErrorKind, Result};
use crate::keypair::WireguardKeypair;
use crate::random;
use std::io::{Read, Write};
use std::path::Path;

pub const BACKUP_WARNING: &str = "\
WARNING: Make sure to back up your encryption key!
If you lose it, you will be unable to decrypt your data.

To silence this warning, set the 'crypt.warned' field
in your configuration file to 'true'.
";

fn write_error(e: std::io::Error) -> BeltError {
    BeltError::io("failed to write output", e)
}

/// Print the key backup warning unless the user has acknowledged it.
pub fn backup_warning(warned: bool, out: &mut dyn Write) -> Result<()> {
    if warned {
        return Ok(());
    }
    writeln!(out, "\n{}", BACKUP_WARNING).map_err(write_error)
}

/// Read plaintext bytes and write the wrapped envelope followed by a newline.
pub fn encrypt(cryptor: &Cryptor, input: &mut dyn Read, output: &mut dyn Write) -> Result<()> {
    let mut plaintext = Vec::new();
    input
        .read_to_end(&mut plaintext)
        .map_err(|e| BeltError::io("failed to read plaintext", e))?;

    let wrapped = cryptor
        .encrypt_wrapped(&plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    writeln!(output, "{}", wrapped).map_err(write_error)
}

/// Read a wrapped envelope and write the raw plaintext.
pub fn decrypt(cryptor: &Cryptor, input: &mut dyn Read, output: &mut dyn Write) -> Result<()> {
    let mut armored_bytes = Vec::new();
    input
        .read_to_end(&mut armored_bytes)
        .map_err(|e| BeltError::io("failed to read ciphertext", e))?;
    let armored = String::from_utf8(armored_bytes).map_err(|e| {
        BeltError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Encoding,
            "ciphertext is not valid UTF-8",
            e,
        )
    })?;

    let plaintext = cryptor
        .decrypt_wrapped(armored.trim())
        .map_err(|e| e.with_context("failed to decrypt"))?;
    output.write_all(&plaintext).map_err(write_error)
}

/// Write a freshly generated, encoded key.
pub fn keygen(output: &mut dyn Write) -> Result<()> {
    writeln!(output, "{}", random::generate_encoded_key()).map_err(write_error)
}

/// Write a WireGuard keypair as labeled lines, or as `PRIVATE PUBLIC`.
pub fn keypair(script: bool, output: &mut dyn Write) -> Result<()> {
    let pair = WireguardKeypair::generate();
    let rendered = if script {
        pair.script_line()
    } else {
        pair.labeled()
    };
    writeln!(output, "{}", rendered).map_err(write_error)
}

pub fn random_hex(length: usize, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "{}", random::random_hex(length)).map_err(write_error)
}

pub fn random_password(length: usize, output: &mut dyn Write) -> Result<()> {
    let password = random::random_password(length)?;
    writeln!(output, "{}", password).map_err(write_error)
}

/// Write a default configuration with a fresh key to `path`.
pub fn init(path: &Path, overwrite: bool, output: &mut dyn Write) -> Result<()> {
    Config::generate_default().write(path, overwrite)?;
    writeln!(output, "Wrote new configuration to {}", path.display()).map_err(write_error)?;
    backup_warning(false, output)
}
