use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use shared::error::SharedError;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

mod application;
mod commands;
mod constants;
mod transport;

use constants::{DEFAULT_DEVICE_ID, DEFAULT_KEY_FILE, DEFAULT_TIMEOUT_MS, SERIAL_BAUD_RATE};

#[derive(Parser, Debug)]
#[command(author, version, about = "Siggy signer host command line interface")]
pub struct Cli {
    /// Optional path to the serial device. Falls back to auto-detection when omitted.
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Skip USB bridge filtering and accept the first USB serial device.
    #[arg(long, global = true)]
    pub any_port: bool,

    /// Serial line speed.
    #[arg(long, default_value_t = SERIAL_BAUD_RATE, global = true)]
    pub baud: u32,

    /// Per-read timeout in milliseconds. `wait-ready` keeps waiting across timeouts.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, global = true)]
    pub timeout_ms: u64,

    /// Increase log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait for the ready announcement sent after reset.
    WaitReady,
    /// Ask the device for its static public key.
    PublicKey,
    /// Send an identity challenge and verify the signed response.
    Challenge(ChallengeArgs),
    /// Generate a new random HMAC root key file for eFuse provisioning.
    Keygen(KeygenArgs),
    /// Derive the Ed25519 identity that a root key produces on the device.
    Derive(DeriveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ChallengeArgs {
    /// 32-byte nonce as hex. A random nonce is used when omitted.
    #[arg(long, value_name = "HEX")]
    pub nonce: Option<String>,
    /// Expected public key as hex. Requested from the device when omitted.
    #[arg(long, value_name = "HEX")]
    pub public_key: Option<String>,
    /// Expected 5-byte device identity as hex.
    #[arg(long, value_name = "HEX", default_value = DEFAULT_DEVICE_ID)]
    pub device_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct KeygenArgs {
    /// Destination of the raw 32-byte key. Existing files are never overwritten.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_KEY_FILE)]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct DeriveArgs {
    /// Raw 32-byte key file, or a file holding 64 hex characters.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_KEY_FILE)]
    pub key: PathBuf,
    /// Seed label used verbatim. Defaults to the firmware label including its trailing NUL.
    #[arg(long, value_name = "TEXT")]
    pub label: Option<String>,
    /// Also print the 64-byte seed and public key pair.
    #[arg(long)]
    pub reveal_secret: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = application::execute(cli, &application::SerialTransportProvider) {
        match &err {
            SharedError::Transport(_) | SharedError::Timeout(_) => {
                eprintln!("Transport failure: {err}")
            }
            SharedError::Codec(_) | SharedError::Envelope(_) => {
                eprintln!("Malformed device frame: {err}")
            }
            SharedError::Verification(_) => eprintln!("Device authentication FAILED: {err}"),
            SharedError::Key(_) | SharedError::Io(_) => eprintln!("Key handling error: {err}"),
        }
        return Err(anyhow::Error::from(err));
    }

    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    // Only fails when a logger is already installed.
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_challenge_with_global_flags() {
        let cli = Cli::try_parse_from([
            "siggy",
            "challenge",
            "--nonce",
            "00",
            "--port",
            "/dev/ttyUSB0",
            "-vv",
        ])
        .expect("parse");
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.baud, SERIAL_BAUD_RATE);
        match cli.command {
            Command::Challenge(args) => {
                assert_eq!(args.nonce.as_deref(), Some("00"));
                assert_eq!(args.device_id, DEFAULT_DEVICE_ID);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn derive_defaults_to_firmware_label() {
        let cli = Cli::try_parse_from(["siggy", "derive"]).expect("parse");
        match cli.command {
            Command::Derive(args) => {
                assert!(args.label.is_none());
                assert!(!args.reveal_secret);
                assert_eq!(args.key, PathBuf::from(DEFAULT_KEY_FILE));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
