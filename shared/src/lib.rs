//! Wire format and key derivation shared between the signer firmware and the host tooling.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod derive;
#[cfg(feature = "std")]
pub mod error;
pub mod frame;
pub mod message;
