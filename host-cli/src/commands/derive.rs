use std::fs;
use std::path::Path;

use ed25519_dalek::{Signer, SigningKey, Verifier};
use log::info;
use shared::derive::{ROOT_KEY_LEN, SEED_LABEL, derive_seed};
use shared::error::SharedError;
use shared::message::{KEY_PAIR_LEN, PublicKeyBytes, SEED_LEN};
use zeroize::Zeroizing;

use crate::DeriveArgs;
use crate::commands::keygen::io_error;
use crate::commands::{decode_hex_array, hex_upper};

const SELF_TEST_MESSAGE: &[u8] = b"Siggy derive self-test";

/// Ed25519 identity the device reconstructs from a root key.
pub struct DerivedIdentity {
    pub public_key: PublicKeyBytes,
    key_pair: Zeroizing<[u8; KEY_PAIR_LEN]>,
}

impl DerivedIdentity {
    /// `seed ‖ public key`, the layout the firmware hands to its signature engine.
    pub fn key_pair(&self) -> &[u8; KEY_PAIR_LEN] {
        &self.key_pair
    }
}

pub fn run(args: &DeriveArgs) -> Result<(), SharedError> {
    let root_key = load_root_key(&args.key)?;
    let label = match &args.label {
        Some(text) => text.as_bytes().to_vec(),
        None => SEED_LABEL.to_vec(),
    };
    info!("deriving with a {}-byte label", label.len());

    let identity = derive_identity(&root_key, &label)?;
    print_identity(&identity, args.reveal_secret);
    Ok(())
}

/// Read a raw 32-byte key, or a text file holding it as hex.
pub fn load_root_key(path: &Path) -> Result<Zeroizing<[u8; ROOT_KEY_LEN]>, SharedError> {
    let raw = Zeroizing::new(fs::read(path).map_err(|err| io_error("read key file", path, err))?);
    if raw.len() == ROOT_KEY_LEN {
        let mut key = Zeroizing::new([0u8; ROOT_KEY_LEN]);
        key.copy_from_slice(&raw);
        return Ok(key);
    }

    let text = std::str::from_utf8(&raw).map_err(|_| {
        SharedError::Key(format!(
            "key file '{}' must hold {ROOT_KEY_LEN} raw bytes, got {}",
            path.display(),
            raw.len()
        ))
    })?;
    decode_hex_array::<ROOT_KEY_LEN>(text, "root key").map(Zeroizing::new)
}

/// HMAC-SHA256 the label under the root key, expand the seed and run a sign/verify self-test.
pub fn derive_identity(
    root_key: &[u8; ROOT_KEY_LEN],
    label: &[u8],
) -> Result<DerivedIdentity, SharedError> {
    let seed = derive_seed(root_key, label)?;
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();

    let signature = signing_key.sign(SELF_TEST_MESSAGE);
    verifying_key
        .verify(SELF_TEST_MESSAGE, &signature)
        .map_err(|err| SharedError::Verification(format!("derived key failed self-test: {err}")))?;

    let public_key = verifying_key.to_bytes();
    let mut key_pair = Zeroizing::new([0u8; KEY_PAIR_LEN]);
    key_pair[..SEED_LEN].copy_from_slice(seed.as_slice());
    key_pair[SEED_LEN..].copy_from_slice(&public_key);

    Ok(DerivedIdentity {
        public_key,
        key_pair,
    })
}

/// Public key as the array literal the firmware configuration expects.
pub fn public_key_literal(public_key: &PublicKeyBytes) -> String {
    let rows: Vec<String> = public_key
        .chunks(16)
        .map(|row| {
            let bytes: Vec<String> = row.iter().map(|byte| format!("0x{byte:02X}")).collect();
            format!("    {},", bytes.join(", "))
        })
        .collect();
    format!("[\n{}\n]", rows.join("\n"))
}

fn print_identity(identity: &DerivedIdentity, reveal_secret: bool) {
    println!("Self-test passed.");
    println!("Public key: {}", hex_upper(&identity.public_key));
    println!("PUBLIC_KEY = {};", public_key_literal(&identity.public_key));
    if reveal_secret {
        println!("Key pair (seed ‖ public key): {}", hex::encode(identity.key_pair()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TEST_ROOT_KEY: [u8; ROOT_KEY_LEN] = [0x11; ROOT_KEY_LEN];

    #[test]
    fn firmware_label_gives_known_public_key() {
        let identity = derive_identity(&TEST_ROOT_KEY, SEED_LABEL).expect("derive");
        assert_eq!(
            hex::encode(identity.public_key),
            "bee75d75ded4bcb33b727c2d3919663f4a66b650327e7b13ff51cbcff0669c00"
        );
        assert_eq!(
            hex::encode(&identity.key_pair()[..SEED_LEN]),
            "6824255cb203dddff0da39383abcb926e045df62f9284093201c9bab477a0872"
        );
        assert_eq!(&identity.key_pair()[SEED_LEN..], &identity.public_key);
    }

    #[test]
    fn trailing_nul_changes_the_identity() {
        let with_nul = derive_identity(&TEST_ROOT_KEY, SEED_LABEL).expect("derive");
        let without = derive_identity(&TEST_ROOT_KEY, &SEED_LABEL[..SEED_LABEL.len() - 1])
            .expect("derive");
        assert_ne!(with_nul.public_key, without.public_key);
    }

    #[test]
    fn loads_raw_and_hex_key_files() {
        let dir = tempdir().expect("tempdir");
        let raw = dir.path().join("raw.bin");
        let text = dir.path().join("key.hex");
        fs::write(&raw, TEST_ROOT_KEY).expect("write raw");
        fs::write(&text, format!("{}\n", hex::encode(TEST_ROOT_KEY))).expect("write hex");

        assert_eq!(*load_root_key(&raw).expect("raw key"), TEST_ROOT_KEY);
        assert_eq!(*load_root_key(&text).expect("hex key"), TEST_ROOT_KEY);
    }

    #[test]
    fn rejects_short_key_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("short.bin");
        fs::write(&path, [0xFFu8; 7]).expect("write");
        assert!(matches!(load_root_key(&path), Err(SharedError::Key(_))));
    }

    #[test]
    fn missing_key_file_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let err = load_root_key(&dir.path().join("absent.bin")).expect_err("missing");
        assert!(matches!(err, SharedError::Io(_)));
    }

    #[test]
    fn literal_matches_firmware_layout() {
        let literal = public_key_literal(&[0xAB; 32]);
        assert_eq!(literal.lines().count(), 4);
        assert!(literal.starts_with("[\n    0xAB, 0xAB,"));
    }
}
