//! Fixed-length frame codec for the signer serial link.
//!
//! Every frame starts with the two byte [`FRAME_HEADER`], followed by a single command byte and a
//! payload whose length is implied by the command. There is no length prefix and no checksum: the
//! link is a reliable point-to-point UART and a single read is treated as a single frame attempt.
use core::fmt;

use heapless::Vec;

use crate::message::{ENVELOPE_LEN, NONCE_LEN, PUBLIC_KEY_LEN};

/// Header carried by every frame in both directions.
pub const FRAME_HEADER: [u8; 2] = [0xA5, 0x5A];

/// Number of header bytes preceding the command byte.
pub const HEADER_LEN: usize = FRAME_HEADER.len();

/// Header plus command byte.
pub const PREAMBLE_LEN: usize = HEADER_LEN + 1;

/// Size of the device receive buffer; one read never yields more than this.
pub const RX_FRAME_LEN: usize = PREAMBLE_LEN + NONCE_LEN;

/// Largest frame the device ever emits (the identity response).
pub const MAX_FRAME_LEN: usize = PREAMBLE_LEN + ENVELOPE_LEN;

/// Ready announcement sent once at startup.
pub const READY_FRAME: [u8; PREAMBLE_LEN] = [FRAME_HEADER[0], FRAME_HEADER[1], 0x00];

/// Command identifiers understood on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Device is booted and listening.
    Ready = 0x00,
    /// Peer asks the device to sign its nonce together with the device identity.
    IdentityChallenge = 0x01,
    /// Peer asks for the static public key.
    PublicKeyRequest = 0x02,
    /// Device answers a challenge with `signature ‖ message`.
    IdentityResponse = 0x10,
    /// Device answers with its static public key.
    PublicKeyResponse = 0x11,
}

impl Command {
    /// Resolve a raw command byte.
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Command::Ready),
            0x01 => Some(Command::IdentityChallenge),
            0x02 => Some(Command::PublicKeyRequest),
            0x10 => Some(Command::IdentityResponse),
            0x11 => Some(Command::PublicKeyResponse),
            _ => None,
        }
    }

    pub const fn to_wire(self) -> u8 {
        self as u8
    }

    /// Number of payload bytes that must follow the command byte.
    pub const fn payload_len(self) -> usize {
        match self {
            Command::Ready | Command::PublicKeyRequest => 0,
            Command::IdentityChallenge => NONCE_LEN,
            Command::IdentityResponse => ENVELOPE_LEN,
            Command::PublicKeyResponse => PUBLIC_KEY_LEN,
        }
    }

    /// Commands the peer sends to the device.
    pub const fn is_request(self) -> bool {
        matches!(self, Command::IdentityChallenge | Command::PublicKeyRequest)
    }

    /// Total on-wire length of a frame carrying this command.
    pub const fn frame_len(self) -> usize {
        PREAMBLE_LEN + self.payload_len()
    }
}

impl From<Command> for u8 {
    fn from(value: Command) -> Self {
        value.to_wire()
    }
}

/// Reasons a buffer is not accepted as a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than a header and a command byte.
    TooShort { len: usize },
    /// The first two bytes are not [`FRAME_HEADER`].
    BadHeader([u8; 2]),
    /// A known command arrived with fewer payload bytes than it requires.
    Truncated {
        command: Command,
        expected: usize,
        actual: usize,
    },
    /// Payload length passed to [`encode`] does not match the command.
    PayloadLength {
        command: Command,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooShort { len } => write!(f, "frame of {len} bytes is too short"),
            FrameError::BadHeader(header) => {
                write!(f, "invalid frame header 0x{:02X}{:02X}", header[0], header[1])
            }
            FrameError::Truncated {
                command,
                expected,
                actual,
            } => write!(
                f,
                "{command:?} frame carries {actual} payload bytes, expected {expected}"
            ),
            FrameError::PayloadLength {
                command,
                expected,
                actual,
            } => write!(
                f,
                "{command:?} payload must be {expected} bytes, got {actual}"
            ),
        }
    }
}

impl core::error::Error for FrameError {}

/// A frame accepted by [`decode`], borrowing from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Raw command byte; unknown values are kept so the dispatcher can reject them.
    pub command: u8,
    /// Payload region. For known commands it is exactly `payload_len()` bytes long.
    pub payload: &'a [u8],
}

impl Frame<'_> {
    pub fn known_command(&self) -> Option<Command> {
        Command::from_wire(self.command)
    }
}

/// Validate the header and slice a received buffer into command and payload.
///
/// Known commands must carry at least their fixed payload; trailing bytes beyond it are ignored.
/// Unknown commands are passed through with whatever bytes followed them.
pub fn decode(bytes: &[u8]) -> Result<Frame<'_>, FrameError> {
    decode_where(bytes, |_| true)
}

/// Device-side [`decode`]: only request commands get their length enforced.
///
/// Response and ready bytes arriving at the device are routed like any other unknown command.
pub fn decode_request(bytes: &[u8]) -> Result<Frame<'_>, FrameError> {
    decode_where(bytes, Command::is_request)
}

fn decode_where(bytes: &[u8], sized: fn(Command) -> bool) -> Result<Frame<'_>, FrameError> {
    if bytes.len() >= HEADER_LEN && bytes[..HEADER_LEN] != FRAME_HEADER {
        return Err(FrameError::BadHeader([bytes[0], bytes[1]]));
    }
    if bytes.len() < PREAMBLE_LEN {
        return Err(FrameError::TooShort { len: bytes.len() });
    }

    let command = bytes[HEADER_LEN];
    let body = &bytes[PREAMBLE_LEN..];
    let payload = match Command::from_wire(command).filter(|known| sized(*known)) {
        Some(known) => {
            let expected = known.payload_len();
            if body.len() < expected {
                return Err(FrameError::Truncated {
                    command: known,
                    expected,
                    actual: body.len(),
                });
            }
            &body[..expected]
        }
        None => body,
    };

    Ok(Frame { command, payload })
}

/// Concatenate header, command and payload.
pub fn encode(command: Command, payload: &[u8]) -> Result<Vec<u8, MAX_FRAME_LEN>, FrameError> {
    let expected = command.payload_len();
    if payload.len() != expected {
        return Err(FrameError::PayloadLength {
            command,
            expected,
            actual: payload.len(),
        });
    }

    let mut frame = Vec::new();
    // Capacity covers the largest command, so these pushes cannot overflow.
    let _ = frame.extend_from_slice(&FRAME_HEADER);
    let _ = frame.push(command.to_wire());
    let _ = frame.extend_from_slice(payload);
    Ok(frame)
}
