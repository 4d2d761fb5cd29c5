use std::io::{self, Read, Write};
use std::time::Duration;

use log::{debug, trace};
use serialport::{SerialPort, SerialPortType, UsbPortInfo};
use shared::error::SharedError;
use shared::frame::{self, Command, FRAME_HEADER, PREAMBLE_LEN, RX_FRAME_LEN};

use crate::constants::{MAX_RESYNC_BYTES, SIGNER_IDENTITY_KEYWORDS, SIGNER_USB_IDS};

#[cfg(test)]
pub mod memory;

/// Byte pipe to the signer with frame-level helpers layered on top.
pub trait DeviceTransport {
    /// Write every byte of `bytes` and flush.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SharedError>;

    /// Fill `buffer` completely or fail.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<(), SharedError>;

    /// Send a request frame padded to the device receive buffer size.
    fn send_request(&mut self, command: Command, payload: &[u8]) -> Result<(), SharedError> {
        let bytes = request_bytes(command, payload)?;
        trace!("-> {}", hex::encode(&bytes));
        self.write_bytes(&bytes)
    }

    /// Read the next complete frame, skipping anything before its header.
    fn read_frame(&mut self) -> Result<(Command, Vec<u8>), SharedError> {
        let mut skipped = 0usize;
        let mut previous = None;
        loop {
            let mut byte = [0u8; 1];
            self.read_bytes(&mut byte)?;
            if previous == Some(FRAME_HEADER[0]) && byte[0] == FRAME_HEADER[1] {
                break;
            }
            previous = Some(byte[0]);
            skipped += 1;
            if skipped > MAX_RESYNC_BYTES {
                return Err(SharedError::Transport(format!(
                    "no frame header within {MAX_RESYNC_BYTES} bytes"
                )));
            }
        }
        if skipped > 1 {
            debug!("skipped {} bytes before frame header", skipped - 1);
        }

        let mut command_byte = [0u8; 1];
        self.read_bytes(&mut command_byte)?;
        let command = Command::from_wire(command_byte[0]).ok_or_else(|| {
            SharedError::Transport(format!("unknown command 0x{:02X}", command_byte[0]))
        })?;

        let mut bytes = vec![0u8; command.frame_len()];
        bytes[..FRAME_HEADER.len()].copy_from_slice(&FRAME_HEADER);
        bytes[FRAME_HEADER.len()] = command_byte[0];
        self.read_bytes(&mut bytes[PREAMBLE_LEN..])?;
        trace!("<- {}", hex::encode(&bytes));

        let decoded = frame::decode(&bytes)?;
        Ok((command, decoded.payload.to_vec()))
    }

    /// Read the next frame and require it to carry `expected`.
    fn expect_frame(&mut self, expected: Command) -> Result<Vec<u8>, SharedError> {
        let (command, payload) = self.read_frame()?;
        if command != expected {
            return Err(SharedError::Transport(format!(
                "unexpected {command:?} frame (expected {expected:?})"
            )));
        }
        Ok(payload)
    }
}

impl<T> DeviceTransport for T
where
    T: Read + Write + ?Sized,
{
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SharedError> {
        self.write_all(bytes).map_err(map_io_error("write frame"))?;
        self.flush().map_err(map_io_error("flush frame"))
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<(), SharedError> {
        self.read_exact(buffer).map_err(map_io_error("read frame"))
    }
}

/// Encoded request zero-padded to [`RX_FRAME_LEN`], so the device read completes without
/// waiting for its timeout.
pub fn request_bytes(command: Command, payload: &[u8]) -> Result<Vec<u8>, SharedError> {
    let encoded = frame::encode(command, payload)?;
    let mut bytes = encoded.to_vec();
    if bytes.len() < RX_FRAME_LEN {
        bytes.resize(RX_FRAME_LEN, 0);
    }
    Ok(bytes)
}

pub fn open_serial_port(
    path: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, SharedError> {
    let mut port = serialport::new(path, baud_rate)
        .timeout(timeout)
        .open()
        .map_err(|err| {
            SharedError::Transport(format!("failed to open serial port {path}: {err}"))
        })?;

    port.set_timeout(timeout).map_err(|err| {
        SharedError::Transport(format!("failed to configure timeout on {path}: {err}"))
    })?;

    Ok(port)
}

pub fn detect_first_serial_port(allow_any_port: bool) -> Result<String, SharedError> {
    let ports = serialport::available_ports().map_err(|err| {
        SharedError::Transport(format!("failed to enumerate serial ports: {err}"))
    })?;

    select_serial_port(&ports, allow_any_port)
        .map(|info| info.port_name.clone())
        .ok_or_else(|| missing_signer_error(allow_any_port))
}

/// Pick the signer among the attached ports.
///
/// Only known USB-UART bridges qualify unless `allow_any_port` is set; a bridge whose descriptor
/// names the signer wins over the first one found.
pub fn select_serial_port(
    ports: &[serialport::SerialPortInfo],
    allow_any_port: bool,
) -> Option<&serialport::SerialPortInfo> {
    let mut candidates = ports.iter().filter_map(|info| match &info.port_type {
        SerialPortType::UsbPort(usb) if allow_any_port || is_signer_bridge(usb) => {
            Some((info, usb))
        }
        _ => None,
    });
    if allow_any_port {
        return candidates.next().map(|(info, _)| info);
    }

    let mut fallback = None;
    for (info, usb) in candidates {
        if describes_signer(usb) {
            return Some(info);
        }
        fallback.get_or_insert(info);
    }
    fallback
}

fn is_signer_bridge(usb: &UsbPortInfo) -> bool {
    SIGNER_USB_IDS.contains(&(usb.vid, usb.pid))
}

fn describes_signer(usb: &UsbPortInfo) -> bool {
    [&usb.product, &usb.manufacturer, &usb.serial_number]
        .into_iter()
        .flatten()
        .map(|text| text.to_ascii_lowercase())
        .any(|text| SIGNER_IDENTITY_KEYWORDS.iter().any(|keyword| text.contains(*keyword)))
}

pub fn missing_signer_error(allow_any_port: bool) -> SharedError {
    let mut message = String::from("no Siggy signer found on a known USB serial bridge.");
    if !allow_any_port {
        message.push_str(" Pass --any-port to connect to the first available USB serial device.");
    }
    SharedError::Transport(message)
}

pub fn map_io_error(context: &'static str) -> impl Fn(io::Error) -> SharedError {
    move |err| match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            SharedError::Timeout(format!("{context} got no data"))
        }
        _ => SharedError::Transport(format!("{context} failed: {err}")),
    }
}
