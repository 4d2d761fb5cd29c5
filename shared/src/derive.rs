//! Seed derivation shared by the device secret provider and the host provisioning tool.
//!
//! The device never stores its Ed25519 seed. It asks a keyed-hash engine holding a root key to MAC a
//! fixed label, and the 32-byte tag becomes the seed. Provisioning runs the same computation on the
//! host to learn the public key that is compiled into the firmware.
use core::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::message::SEED_LEN;

/// Label MACed by the root key. The firmware has always fed the trailing NUL into the MAC, so it is
/// part of the label.
pub const SEED_LABEL: &[u8] = b"Siggy-1-SEED-NebulaFluff\0";

/// Length of the root key held by the keyed-hash engine.
pub const ROOT_KEY_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRootKey {
    pub len: usize,
}

impl fmt::Display for InvalidRootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root key must be {ROOT_KEY_LEN} bytes, got {}", self.len)
    }
}

impl core::error::Error for InvalidRootKey {}

/// HMAC-SHA256(root_key, label) written straight into `out`.
pub fn derive_seed_into(
    root_key: &[u8],
    label: &[u8],
    out: &mut [u8; SEED_LEN],
) -> Result<(), InvalidRootKey> {
    if root_key.len() != ROOT_KEY_LEN {
        return Err(InvalidRootKey {
            len: root_key.len(),
        });
    }
    let mut mac = HmacSha256::new_from_slice(root_key).map_err(|_| InvalidRootKey {
        len: root_key.len(),
    })?;
    mac.update(label);
    let mut tag = mac.finalize().into_bytes();
    move_secret(&mut tag, out);
    Ok(())
}

/// Copy `source` into `out` and wipe `source`.
fn move_secret(source: &mut [u8], out: &mut [u8]) {
    out.copy_from_slice(source);
    source.zeroize();
}

/// Convenience wrapper returning the seed in a buffer that wipes itself on drop.
pub fn derive_seed(
    root_key: &[u8],
    label: &[u8],
) -> Result<Zeroizing<[u8; SEED_LEN]>, InvalidRootKey> {
    let mut seed = Zeroizing::new([0u8; SEED_LEN]);
    derive_seed_into(root_key, label, &mut seed)?;
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_includes_trailing_nul() {
        assert_eq!(SEED_LABEL.len(), 25);
        assert_eq!(SEED_LABEL.last(), Some(&0));
    }

    #[test]
    fn derivation_is_deterministic_per_label() {
        let key = [0x11u8; ROOT_KEY_LEN];
        let first = derive_seed(&key, SEED_LABEL).expect("derive");
        let second = derive_seed(&key, SEED_LABEL).expect("derive");
        let other = derive_seed(&key, b"another label").expect("derive");
        assert_eq!(*first, *second);
        assert_ne!(*first, *other);
    }

    #[test]
    fn known_answer_for_test_root_key() {
        let seed = derive_seed(&[0x11u8; ROOT_KEY_LEN], SEED_LABEL).expect("derive");
        assert_eq!(
            hex::encode(*seed),
            "6824255cb203dddff0da39383abcb926e045df62f9284093201c9bab477a0872"
        );
    }

    #[test]
    fn derivation_is_plain_hmac_sha256() {
        let mut key = [0u8; ROOT_KEY_LEN];
        key[..4].copy_from_slice(b"Jefe");
        let seed = derive_seed(&key, b"what do ya want for nothing?").expect("derive");

        let mut mac = HmacSha256::new_from_slice(&key).expect("key");
        mac.update(b"what do ya want for nothing?");
        assert_eq!(&seed[..], &mac.finalize().into_bytes()[..]);
    }

    #[test]
    fn mac_output_is_wiped_after_copy() {
        let mut tag = [0x5Au8; SEED_LEN];
        let mut seed = [0u8; SEED_LEN];
        move_secret(&mut tag, &mut seed);
        assert_eq!(seed, [0x5A; SEED_LEN]);
        assert_eq!(tag, [0u8; SEED_LEN]);
    }

    #[test]
    fn rejects_short_root_key() {
        let err = derive_seed(&[0u8; 16], SEED_LABEL).expect_err("short key");
        assert_eq!(err, InvalidRootKey { len: 16 });
    }
}
