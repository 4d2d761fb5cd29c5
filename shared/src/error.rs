use std::io;

use thiserror::Error;

use crate::derive::InvalidRootKey;
use crate::frame::FrameError;
use crate::message::EnvelopeError;

#[derive(Debug, Error)]
pub enum SharedError {
    #[error("codec error: {0}")]
    Codec(#[from] FrameError),
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("key error: {0}")]
    Key(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for SharedError {
    fn from(value: io::Error) -> Self {
        SharedError::Transport(value.to_string())
    }
}

impl From<InvalidRootKey> for SharedError {
    fn from(value: InvalidRootKey) -> Self {
        SharedError::Key(value.to_string())
    }
}
