//! Command routing for frames accepted by the codec.
use heapless::Vec;
use log::{debug, info};
use shared::frame::{Command, Frame, MAX_FRAME_LEN, encode};
use shared::message::{NONCE_LEN, Nonce};

use crate::config::DeviceConfig;
use crate::keys::{
    ChallengeOutcome, DerivationError, SecretProvider, SignError, SignatureEngine,
    answer_challenge,
};
use crate::lockdown::FaultState;

/// Handler selected for a command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    PublicKey,
    IdentityChallenge,
    Unknown(u8),
}

/// Pure mapping from the command byte to its handler.
pub const fn route(command: u8) -> Route {
    match Command::from_wire(command) {
        Some(Command::PublicKeyRequest) => Route::PublicKey,
        Some(Command::IdentityChallenge) => Route::IdentityChallenge,
        _ => Route::Unknown(command),
    }
}

/// Encoded frame ready for the transport.
pub type ResponseFrame = Vec<u8, MAX_FRAME_LEN>;

/// What the control loop has to do after a frame was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Transmit this frame.
    Reply {
        command: Command,
        frame: ResponseFrame,
    },
    /// Unrecognised command byte; nothing is transmitted.
    Unknown(u8),
    SignatureFailed(SignError),
    DerivationFailed {
        error: DerivationError,
        consecutive: u8,
    },
    /// The failure counter reached its threshold while handling this frame.
    Lockdown(DerivationError),
}

/// Run the handler for `frame`.
///
/// Only the identity challenge touches the secret provider or the fault state.
pub fn dispatch<P, E>(
    frame: &Frame<'_>,
    config: &DeviceConfig,
    secrets: &mut P,
    engine: &mut E,
    faults: &mut FaultState,
) -> Action
where
    P: SecretProvider + ?Sized,
    E: SignatureEngine + ?Sized,
{
    match route(frame.command) {
        Route::PublicKey => {
            debug!("public key requested");
            reply(Command::PublicKeyResponse, &config.public_key)
        }
        Route::IdentityChallenge => match frame.payload.first_chunk::<NONCE_LEN>() {
            Some(nonce) => challenge(nonce, config, secrets, engine, faults),
            // The codec enforces the nonce length; a short payload here is treated as unknown.
            None => Action::Unknown(frame.command),
        },
        Route::Unknown(command) => {
            info!("unknown command 0x{command:02X}");
            Action::Unknown(command)
        }
    }
}

fn challenge<P, E>(
    nonce: &Nonce,
    config: &DeviceConfig,
    secrets: &mut P,
    engine: &mut E,
    faults: &mut FaultState,
) -> Action
where
    P: SecretProvider + ?Sized,
    E: SignatureEngine + ?Sized,
{
    match answer_challenge(nonce, config, secrets, engine, faults) {
        ChallengeOutcome::Signed(envelope) => reply(Command::IdentityResponse, envelope.as_bytes()),
        ChallengeOutcome::SignatureFailed(error) => Action::SignatureFailed(error),
        ChallengeOutcome::DerivationFailed { error, consecutive } => {
            Action::DerivationFailed { error, consecutive }
        }
        ChallengeOutcome::Lockdown(error) => Action::Lockdown(error),
    }
}

fn reply(command: Command, payload: &[u8]) -> Action {
    match encode(command, payload) {
        Ok(frame) => Action::Reply { command, frame },
        // Payload sizes are fixed by the callers.
        Err(_) => Action::Unknown(command.to_wire()),
    }
}
