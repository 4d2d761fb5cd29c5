//! Ephemeral signing key lifecycle.
//!
//! The private seed is never stored. For each identity challenge the seed is recomputed by the
//! [`SecretProvider`], placed next to the static public key in an [`EphemeralKeyPair`], used for a
//! single signature and wiped before control returns to the loop, whatever the outcome.
use ed25519_dalek::{Signer, SigningKey};
use log::{debug, warn};
use shared::derive::{InvalidRootKey, ROOT_KEY_LEN, derive_seed_into};
use shared::message::{
    CHALLENGE_MESSAGE_LEN, IdentityEnvelope, KEY_PAIR_LEN, Nonce, PUBLIC_KEY_LEN, SEED_LEN,
    challenge_message,
};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::config::DeviceConfig;
use crate::lockdown::{FaultState, FaultTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationError {
    /// The keyed-hash engine reported a failure (missing or unreadable key slot).
    Engine,
    /// The output buffer handed to the provider is not a seed-sized slot.
    OutputLength { expected: usize, actual: usize },
    /// The provider's root key is malformed.
    RootKey,
}

impl core::fmt::Display for DerivationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DerivationError::Engine => write!(f, "keyed-hash engine failure"),
            DerivationError::OutputLength { expected, actual } => {
                write!(f, "seed buffer must be {expected} bytes, got {actual}")
            }
            DerivationError::RootKey => write!(f, "root key unavailable"),
        }
    }
}

impl core::error::Error for DerivationError {}

impl From<InvalidRootKey> for DerivationError {
    fn from(_: InvalidRootKey) -> Self {
        DerivationError::RootKey
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignError {
    /// The reconstructed seed does not belong to the compiled-in public key.
    KeyMismatch,
    /// The signing primitive itself reported an error.
    Engine,
}

impl core::fmt::Display for SignError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SignError::KeyMismatch => write!(f, "derived seed does not match the public key"),
            SignError::Engine => write!(f, "signature engine failure"),
        }
    }
}

impl core::error::Error for SignError {}

/// Deterministic derivation of the signing seed from a secret the caller cannot read.
pub trait SecretProvider {
    /// Fill `out` (exactly [`SEED_LEN`] bytes) with the value derived for `label`.
    fn derive(&mut self, label: &[u8], out: &mut [u8]) -> Result<(), DerivationError>;
}

/// Deterministic signing primitive over a 64-byte `seed ‖ public key` pair.
pub trait SignatureEngine {
    fn sign(
        &mut self,
        message: &[u8; CHALLENGE_MESSAGE_LEN],
        key_pair: &[u8; KEY_PAIR_LEN],
    ) -> Result<IdentityEnvelope, SignError>;
}

impl<T> SecretProvider for &mut T
where
    T: SecretProvider + ?Sized,
{
    fn derive(&mut self, label: &[u8], out: &mut [u8]) -> Result<(), DerivationError> {
        (**self).derive(label, out)
    }
}

impl<T> SignatureEngine for &mut T
where
    T: SignatureEngine + ?Sized,
{
    fn sign(
        &mut self,
        message: &[u8; CHALLENGE_MESSAGE_LEN],
        key_pair: &[u8; KEY_PAIR_LEN],
    ) -> Result<IdentityEnvelope, SignError> {
        (**self).sign(message, key_pair)
    }
}

/// Secret provider computing HMAC-SHA256 in software over a root key held in RAM.
///
/// Boards with a keyed-hash peripheral use that instead; this one backs host simulation and tests.
pub struct SoftwareSecretProvider {
    root_key: Zeroizing<[u8; ROOT_KEY_LEN]>,
}

impl SoftwareSecretProvider {
    pub fn new(root_key: [u8; ROOT_KEY_LEN]) -> Self {
        Self {
            root_key: Zeroizing::new(root_key),
        }
    }
}

impl SecretProvider for SoftwareSecretProvider {
    fn derive(&mut self, label: &[u8], out: &mut [u8]) -> Result<(), DerivationError> {
        let actual = out.len();
        let seed: &mut [u8; SEED_LEN] = out
            .try_into()
            .map_err(|_| DerivationError::OutputLength {
                expected: SEED_LEN,
                actual,
            })?;
        derive_seed_into(self.root_key.as_slice(), label, seed)?;
        Ok(())
    }
}

/// Ed25519 via `ed25519-dalek`; the expanded key it builds internally is zeroized on drop.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Engine;

impl SignatureEngine for Ed25519Engine {
    fn sign(
        &mut self,
        message: &[u8; CHALLENGE_MESSAGE_LEN],
        key_pair: &[u8; KEY_PAIR_LEN],
    ) -> Result<IdentityEnvelope, SignError> {
        let signing_key =
            SigningKey::from_keypair_bytes(key_pair).map_err(|_| SignError::KeyMismatch)?;
        let signature = signing_key.sign(message);
        Ok(IdentityEnvelope::new(&signature.to_bytes(), message))
    }
}

/// `derived seed ‖ static public key`, alive for one signature only.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EphemeralKeyPair {
    bytes: [u8; KEY_PAIR_LEN],
}

impl Default for EphemeralKeyPair {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralKeyPair {
    pub const fn new() -> Self {
        Self {
            bytes: [0u8; KEY_PAIR_LEN],
        }
    }

    fn fill<P>(
        &mut self,
        secrets: &mut P,
        label: &[u8],
        public_key: &[u8; PUBLIC_KEY_LEN],
    ) -> Result<(), DerivationError>
    where
        P: SecretProvider + ?Sized,
    {
        let (seed, public) = self.bytes.split_at_mut(SEED_LEN);
        secrets.derive(label, seed)?;
        public.copy_from_slice(public_key);
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_PAIR_LEN] {
        &self.bytes
    }

    /// Overwrite all 64 bytes with zeros.
    pub fn wipe(&mut self) {
        self.bytes.zeroize();
    }

    pub fn is_wiped(&self) -> bool {
        self.bytes.iter().all(|byte| *byte == 0)
    }
}

/// What became of one identity challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Signed(IdentityEnvelope),
    SignatureFailed(SignError),
    DerivationFailed {
        error: DerivationError,
        consecutive: u8,
    },
    /// The failure that pushed the counter to the threshold.
    Lockdown(DerivationError),
}

/// Answer a challenge with a key pair scoped to this call.
pub fn answer_challenge<P, E>(
    nonce: &Nonce,
    config: &DeviceConfig,
    secrets: &mut P,
    engine: &mut E,
    faults: &mut FaultState,
) -> ChallengeOutcome
where
    P: SecretProvider + ?Sized,
    E: SignatureEngine + ?Sized,
{
    let mut key_pair = EphemeralKeyPair::new();
    answer_challenge_with(&mut key_pair, nonce, config, secrets, engine, faults)
}

/// Same as [`answer_challenge`] with a caller-provided scratch key pair, which is all zeros again
/// when this returns.
pub fn answer_challenge_with<P, E>(
    key_pair: &mut EphemeralKeyPair,
    nonce: &Nonce,
    config: &DeviceConfig,
    secrets: &mut P,
    engine: &mut E,
    faults: &mut FaultState,
) -> ChallengeOutcome
where
    P: SecretProvider + ?Sized,
    E: SignatureEngine + ?Sized,
{
    let message = challenge_message(nonce, &config.device_id);

    if let Err(error) = key_pair.fill(secrets, config.seed_label, &config.public_key) {
        key_pair.wipe();
        return match faults.record_derivation_failure() {
            FaultTransition::Transient { consecutive } => {
                warn!("seed derivation failed ({error}), {consecutive} in a row");
                ChallengeOutcome::DerivationFailed { error, consecutive }
            }
            FaultTransition::Lockdown => ChallengeOutcome::Lockdown(error),
        };
    }

    let signed = engine.sign(&message, key_pair.as_bytes());
    key_pair.wipe();

    match signed {
        Ok(envelope) => {
            faults.record_success();
            debug!("challenge signed");
            ChallengeOutcome::Signed(envelope)
        }
        Err(error) => {
            warn!("signing failed: {error}");
            ChallengeOutcome::SignatureFailed(error)
        }
    }
}
