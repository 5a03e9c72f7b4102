//! nota-keygen: Command-line tool for the note encryption key.
//!
//! Generates keys for `NOTA_ENCRYPTION_KEY`, validates a configured key and
//! seals or opens single envelopes for operational debugging.

use clap::{Parser, Subcommand};
use nota_crypto::{EncryptionKey, EnvelopeCipher, ENCRYPTION_KEY_ENV};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nota-keygen")]
#[command(author, version, about = "Key management for nota note encryption")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new random 256-bit key (base64)
    Generate {
        /// Write the key to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configured key and round-trip a probe value
    Check {
        /// Path to a keyfile (raw 32 bytes or base64); defaults to NOTA_ENCRYPTION_KEY
        #[arg(short, long)]
        key_file: Option<PathBuf>,
    },

    /// Encrypt a string into an envelope
    Seal {
        /// Plaintext to encrypt
        plaintext: String,

        #[arg(short, long)]
        key_file: Option<PathBuf>,
    },

    /// Decrypt an envelope
    Open {
        /// Base64 envelope
        envelope: String,

        #[arg(short, long)]
        key_file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Diagnostics go to stderr so stdout stays machine-readable.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nota_crypto=warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Generate { output } => cmd_generate(output.as_deref())?,
        Commands::Check { key_file } => cmd_check(key_file.as_deref())?,
        Commands::Seal {
            plaintext,
            key_file,
        } => {
            let cipher = load_cipher(key_file.as_deref())?;
            println!("{}", cipher.encrypt(&plaintext)?.as_str());
        }
        Commands::Open { envelope, key_file } => {
            let cipher = load_cipher(key_file.as_deref())?;
            println!("{}", cipher.decrypt(&envelope)?);
        }
    }

    Ok(())
}

fn load_cipher(key_file: Option<&Path>) -> Result<EnvelopeCipher, Box<dyn std::error::Error>> {
    let key = match key_file {
        Some(path) => EncryptionKey::from_keyfile(path)?,
        None => EncryptionKey::from_env()?,
    };
    Ok(EnvelopeCipher::new(key))
}

fn cmd_generate(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let key = EncryptionKey::generate();

    match output {
        Some(path) => {
            std::fs::write(path, key.to_base64())?;
            let output = serde_json::json!({
                "key_file": path.to_string_lossy(),
                "env": ENCRYPTION_KEY_ENV,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        None => println!("{}", key.to_base64()),
    }

    Ok(())
}

fn cmd_check(key_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let source = match key_file {
        Some(path) => path.to_string_lossy().to_string(),
        None => ENCRYPTION_KEY_ENV.to_string(),
    };
    let cipher = load_cipher(key_file)?;

    let probe = "nota key check";
    let envelope = cipher.encrypt(probe)?;
    let roundtrip = cipher.decrypt(envelope.as_str())? == probe;

    let output = serde_json::json!({
        "source": source,
        "valid": roundtrip,
        "envelope_len": envelope.len(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !roundtrip {
        return Err("probe did not round-trip".into());
    }
    Ok(())
}
