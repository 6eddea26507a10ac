//! belt CLI - symmetric encryption and secret generation
//!
//! Command-line interface for encrypting and decrypting data with a
//! base58-check encoded ChaCha20-Poly1305 key, and for generating random
//! keys, hex strings, passwords and WireGuard keypairs.

use clap::{ArgAction, Parser, Subcommand};
use std::error::Error as StdError;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use belt::commands;
use belt::config::Config;
use belt::cryptor::Cryptor;
use belt::error::{BeltError, Result};
use belt::file_ops;

#[derive(Parser)]
#[command(name = "belt")]
#[command(version)]
#[command(about = "Encryption and secret generation toolbelt.", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "BELT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file containing a freshly generated key
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        overwrite: bool,
    },

    /// Encryption, key and random secret commands
    #[command(subcommand)]
    Crypt(CryptCommand),
}

#[derive(Subcommand)]
enum CryptCommand {
    /// Symmetric encryption with the configured key
    #[command(subcommand)]
    Simple(SimpleCommand),

    /// Random secrets
    #[command(subcommand)]
    Random(RandomCommand),

    /// Generate a WireGuard keypair
    Wireguard {
        /// Print keys for a script, as PRIVATEKEY PUBLICKEY
        #[arg(short, long)]
        script: bool,
    },
}

#[derive(Subcommand)]
enum SimpleCommand {
    /// Encrypt data
    #[command(alias = "e")]
    Encrypt(StreamArgs),

    /// Decrypt data
    #[command(alias = "d")]
    Decrypt(StreamArgs),

    /// Generate a new encoded key
    Key,
}

#[derive(clap::Args)]
struct StreamArgs {
    /// File to read from; stdin when omitted
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// File to write to; stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Override the key from configuration or environment
    #[arg(short, long)]
    key: Option<String>,
}

#[derive(Subcommand)]
enum RandomCommand {
    /// Random bytes as lowercase hex
    Hex {
        /// Number of random bytes
        #[arg(default_value_t = 16)]
        length: usize,
    },

    /// Random password
    Pw {
        /// Password length
        #[arg(default_value_t = 16)]
        length: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", report(&e));
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut stdout = io::stdout();

    match cli.command {
        Commands::Init { overwrite } => {
            let path = match cli.config {
                Some(path) => path,
                None => Config::default_path()?,
            };
            commands::init(&path, overwrite, &mut stdout)
        }
        Commands::Crypt(CryptCommand::Simple(command)) => {
            let config = load_config(cli.config.as_deref())?;
            commands::backup_warning(config.crypt.warned, &mut io::stderr())?;

            match command {
                SimpleCommand::Encrypt(args) => run_stream(&config, args, commands::encrypt),
                SimpleCommand::Decrypt(args) => run_stream(&config, args, commands::decrypt),
                SimpleCommand::Key => commands::keygen(&mut stdout),
            }
        }
        Commands::Crypt(CryptCommand::Random(RandomCommand::Hex { length })) => {
            commands::random_hex(length, &mut stdout)
        }
        Commands::Crypt(CryptCommand::Random(RandomCommand::Pw { length })) => {
            commands::random_password(length, &mut stdout)
        }
        Commands::Crypt(CryptCommand::Wireguard { script }) => {
            commands::keypair(script, &mut stdout)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_or_default(path),
        None => match Config::default_path() {
            Ok(path) => Config::load_or_default(&path),
            Err(e) => {
                tracing::debug!(error = %e, "no configuration directory, using defaults");
                Ok(Config::default())
            }
        },
    }
}

/// Resolve the key, run `op` over the whole input, and only then write the
/// result, so a failed operation never leaves partial output behind.
fn run_stream(
    config: &Config,
    args: StreamArgs,
    op: impl FnOnce(&Cryptor, &mut dyn io::Read, &mut dyn io::Write) -> Result<()>,
) -> Result<()> {
    let encoded = config.crypt.resolve_key(args.key.as_deref())?;
    let cryptor =
        Cryptor::from_encoded(&encoded).map_err(|e| e.with_context("invalid encryption key"))?;

    let input = file_ops::read_input(args.input.as_deref())?;
    let mut output = Vec::new();
    op(&cryptor, &mut input.as_slice(), &mut output)?;
    file_ops::write_output(args.output.as_deref(), &output)
}

fn report(err: &BeltError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
