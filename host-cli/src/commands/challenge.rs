use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use log::{debug, info};
use rand_core::{OsRng, RngCore};
use shared::error::SharedError;
use shared::frame::Command;
use shared::message::{DeviceId, IdentityEnvelope, Nonce, PublicKeyBytes};

use crate::ChallengeArgs;
use crate::commands::public_key::request_public_key;
use crate::commands::{DeviceTransport, decode_hex_array, hex_upper};

pub fn run<T>(transport: &mut T, args: &ChallengeArgs) -> Result<(), SharedError>
where
    T: DeviceTransport + ?Sized,
{
    let nonce = match &args.nonce {
        Some(value) => decode_hex_array::<32>(value, "nonce")?,
        None => random_nonce(),
    };
    let device_id = decode_hex_array::<5>(&args.device_id, "device id")?;
    let public_key = match &args.public_key {
        Some(value) => decode_hex_array::<32>(value, "public key")?,
        None => {
            info!("no public key given, asking the device");
            request_public_key(transport)?
        }
    };

    let envelope = send_challenge(transport, &nonce)?;
    verify_envelope(&envelope, &nonce, &device_id, &public_key)?;
    print_verified(&envelope, &public_key);
    Ok(())
}

pub fn random_nonce() -> Nonce {
    let mut nonce = [0u8; 32];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

pub fn send_challenge<T>(transport: &mut T, nonce: &Nonce) -> Result<IdentityEnvelope, SharedError>
where
    T: DeviceTransport + ?Sized,
{
    debug!("challenging with nonce {}", hex::encode(nonce));
    transport.send_request(Command::IdentityChallenge, nonce)?;
    let payload = transport.expect_frame(Command::IdentityResponse)?;
    Ok(IdentityEnvelope::from_slice(&payload)?)
}

/// Check that the envelope answers this challenge from this device under `public_key`.
pub fn verify_envelope(
    envelope: &IdentityEnvelope,
    nonce: &Nonce,
    device_id: &DeviceId,
    public_key: &PublicKeyBytes,
) -> Result<(), SharedError> {
    if envelope.nonce() != *nonce {
        return Err(SharedError::Verification(format!(
            "device echoed nonce {} instead of {}",
            hex::encode(envelope.nonce()),
            hex::encode(nonce)
        )));
    }
    if envelope.device_id() != *device_id {
        return Err(SharedError::Verification(format!(
            "response is bound to device {} (expected {})",
            hex_upper(&envelope.device_id()),
            hex_upper(device_id)
        )));
    }

    let key = VerifyingKey::from_bytes(public_key)
        .map_err(|err| SharedError::Key(format!("invalid public key: {err}")))?;
    let signature = Signature::from_bytes(&envelope.signature());
    key.verify(envelope.message(), &signature)
        .map_err(|err| SharedError::Verification(format!("signature rejected: {err}")))
}

fn print_verified(envelope: &IdentityEnvelope, public_key: &PublicKeyBytes) {
    println!("Device {} authenticated.", hex_upper(&envelope.device_id()));
    println!("  Nonce:      {}", hex::encode(envelope.nonce()));
    println!("  Signature:  {}", hex::encode(envelope.signature()));
    println!("  Public key: {}", hex_upper(public_key));
}
