use log::debug;
use shared::error::SharedError;
use shared::frame::Command;
use shared::message::PublicKeyBytes;

use crate::commands::{DeviceTransport, hex_upper};

pub fn run<T>(transport: &mut T) -> Result<(), SharedError>
where
    T: DeviceTransport + ?Sized,
{
    let public_key = request_public_key(transport)?;
    print_public_key(&public_key);
    Ok(())
}

pub fn request_public_key<T>(transport: &mut T) -> Result<PublicKeyBytes, SharedError>
where
    T: DeviceTransport + ?Sized,
{
    transport.send_request(Command::PublicKeyRequest, &[])?;
    let payload = transport.expect_frame(Command::PublicKeyResponse)?;
    let public_key: PublicKeyBytes = payload.as_slice().try_into().map_err(|_| {
        SharedError::Transport(format!("public key frame carried {} bytes", payload.len()))
    })?;
    debug!("device public key {}", hex::encode(public_key));
    Ok(public_key)
}

fn print_public_key(public_key: &PublicKeyBytes) {
    println!("Public key: {}", hex_upper(public_key));
}
