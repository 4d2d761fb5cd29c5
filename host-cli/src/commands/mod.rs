use shared::error::SharedError;

use crate::{ChallengeArgs, Cli};

pub use crate::transport::DeviceTransport;

pub trait TransportProvider {
    type Transport: DeviceTransport + ?Sized;

    fn connect(&self, cli: &Cli, port_path: &str) -> Result<Box<Self::Transport>, SharedError>;
}

pub mod challenge;
pub mod derive;
pub mod keygen;
pub mod public_key;
pub mod wait_ready;

/// Subcommands that need an open link to the signer.
#[derive(Debug, Clone, Copy)]
pub enum DeviceCommand<'a> {
    WaitReady,
    PublicKey,
    Challenge(&'a ChallengeArgs),
}

pub fn run<T>(command: DeviceCommand<'_>, transport: &mut T) -> Result<(), SharedError>
where
    T: DeviceTransport + ?Sized,
{
    match command {
        DeviceCommand::WaitReady => wait_ready::run(transport),
        DeviceCommand::PublicKey => public_key::run(transport),
        DeviceCommand::Challenge(args) => challenge::run(transport, args),
    }
}

/// Decode exactly `N` bytes of hex, ignoring surrounding whitespace and an optional `0x`.
pub(crate) fn decode_hex_array<const N: usize>(
    input: &str,
    what: &str,
) -> Result<[u8; N], SharedError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits)
        .map_err(|err| SharedError::Key(format!("invalid {what} hex: {err}")))?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| {
        SharedError::Key(format!("{what} must be {N} bytes, got {actual}"))
    })
}

pub(crate) fn hex_upper(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}
