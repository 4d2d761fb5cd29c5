//! Layout of the identity challenge message and the signed envelope returned for it.
use core::fmt;

use crate::frame::Command;

pub const NONCE_LEN: usize = 32;
pub const DEVICE_ID_LEN: usize = 5;
pub const PUBLIC_KEY_LEN: usize = 32;
pub const SEED_LEN: usize = 32;
pub const KEY_PAIR_LEN: usize = SEED_LEN + PUBLIC_KEY_LEN;
pub const SIGNATURE_LEN: usize = 64;

/// Response tag ‖ nonce ‖ device identity.
pub const CHALLENGE_MESSAGE_LEN: usize = 1 + NONCE_LEN + DEVICE_ID_LEN;

/// Signature ‖ signed message.
pub const ENVELOPE_LEN: usize = SIGNATURE_LEN + CHALLENGE_MESSAGE_LEN;

pub type Nonce = [u8; NONCE_LEN];
pub type DeviceId = [u8; DEVICE_ID_LEN];
pub type PublicKeyBytes = [u8; PUBLIC_KEY_LEN];

/// Build the message the device signs for a challenge.
///
/// Binding the response tag, the peer nonce and the device identity together keeps a signature
/// from being replayed for another challenge or attributed to another device.
pub fn challenge_message(nonce: &Nonce, device_id: &DeviceId) -> [u8; CHALLENGE_MESSAGE_LEN] {
    let mut message = [0u8; CHALLENGE_MESSAGE_LEN];
    message[0] = Command::IdentityResponse.to_wire();
    message[1..1 + NONCE_LEN].copy_from_slice(nonce);
    message[1 + NONCE_LEN..].copy_from_slice(device_id);
    message
}

/// Problems found while reading an envelope received from a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeError {
    Length { expected: usize, actual: usize },
    Tag(u8),
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeError::Length { expected, actual } => {
                write!(f, "envelope must be {expected} bytes, got {actual}")
            }
            EnvelopeError::Tag(tag) => write!(f, "unexpected message tag 0x{tag:02X}"),
        }
    }
}

impl core::error::Error for EnvelopeError {}

/// Signature followed by the 38-byte message it covers.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityEnvelope([u8; ENVELOPE_LEN]);

impl IdentityEnvelope {
    pub fn new(signature: &[u8; SIGNATURE_LEN], message: &[u8; CHALLENGE_MESSAGE_LEN]) -> Self {
        let mut bytes = [0u8; ENVELOPE_LEN];
        bytes[..SIGNATURE_LEN].copy_from_slice(signature);
        bytes[SIGNATURE_LEN..].copy_from_slice(message);
        Self(bytes)
    }

    /// Parse an envelope taken off the wire, checking its length and message tag.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let array: [u8; ENVELOPE_LEN] =
            bytes.try_into().map_err(|_| EnvelopeError::Length {
                expected: ENVELOPE_LEN,
                actual: bytes.len(),
            })?;
        let tag = array[SIGNATURE_LEN];
        if tag != Command::IdentityResponse.to_wire() {
            return Err(EnvelopeError::Tag(tag));
        }
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; ENVELOPE_LEN] {
        &self.0
    }

    pub fn signature(&self) -> [u8; SIGNATURE_LEN] {
        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&self.0[..SIGNATURE_LEN]);
        signature
    }

    pub fn message(&self) -> &[u8] {
        &self.0[SIGNATURE_LEN..]
    }

    pub fn nonce(&self) -> Nonce {
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&self.0[SIGNATURE_LEN + 1..SIGNATURE_LEN + 1 + NONCE_LEN]);
        nonce
    }

    pub fn device_id(&self) -> DeviceId {
        let mut id = [0u8; DEVICE_ID_LEN];
        id.copy_from_slice(&self.0[SIGNATURE_LEN + 1 + NONCE_LEN..]);
        id
    }
}

impl fmt::Debug for IdentityEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityEnvelope")
            .field("nonce", &self.nonce())
            .field("device_id", &self.device_id())
            .finish_non_exhaustive()
    }
}
