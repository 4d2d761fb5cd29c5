use log::{debug, info};
use shared::error::SharedError;
use shared::frame::Command;

use crate::commands::DeviceTransport;

pub fn run<T>(transport: &mut T) -> Result<(), SharedError>
where
    T: DeviceTransport + ?Sized,
{
    wait_for_ready(transport)?;
    println!("Signer is ready.");
    Ok(())
}

/// Block until the ready announcement arrives.
///
/// Read timeouts only mean the signer has not been reset yet, so they are waited out. Bootloader
/// output before the frame is skipped.
pub fn wait_for_ready<T>(transport: &mut T) -> Result<(), SharedError>
where
    T: DeviceTransport + ?Sized,
{
    let mut idle_reads = 0u32;
    loop {
        match transport.expect_frame(Command::Ready) {
            Ok(_) => {
                info!("ready frame received");
                return Ok(());
            }
            Err(SharedError::Timeout(_)) => {
                if idle_reads == 0 {
                    info!("waiting for the signer to reset");
                }
                idle_reads = idle_reads.saturating_add(1);
                debug!("no ready frame after {idle_reads} reads");
            }
            Err(err) => return Err(err),
        }
    }
}
