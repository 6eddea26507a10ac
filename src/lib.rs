//! belt - symmetric envelope encryption, checksummed key encoding and
//! random secret generation

#![forbid(unsafe_code)]

pub mod commands;
pub mod config;
pub mod cryptor;
pub mod error;
pub mod file_ops;
pub mod keycodec;
pub mod keypair;
pub mod random;

pub use config::Config;
pub use cryptor::{Cryptor, Key};
pub use error::{BeltError, ErrorCategory, ErrorKind, Result};
pub use keypair::WireguardKeypair;
