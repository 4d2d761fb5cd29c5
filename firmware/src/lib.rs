#![cfg_attr(not(test), no_std)]

//! Hardware-independent core of the Siggy signer.
//!
//! The board crate supplies a [`transport::SerialLink`], a [`keys::SecretProvider`] and a
//! [`status::StatusSink`]; everything else (framing, routing, key handling and the lockdown
//! state machine) lives here and runs unchanged under the host test harness.

#[cfg(test)]
extern crate alloc;

pub mod config;
pub mod device;
pub mod dispatch;
pub mod keys;
pub mod lockdown;
pub mod oled;
pub mod status;
pub mod transport;

pub use config::DeviceConfig;
pub use device::{Device, Fault, PollOutcome};
pub use keys::{Ed25519Engine, SecretProvider, SignatureEngine, SoftwareSecretProvider};
pub use lockdown::FaultState;
pub use oled::Ssd1306;
pub use status::{Feedback, FeedbackTiming, Indicator, StatusSink};
pub use transport::{LinkError, SerialLink};
