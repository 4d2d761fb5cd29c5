pub const SERIAL_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// USB-UART bridges wired to the signer's UART0: CP210x and CH34x.
///
/// The on-chip USB-Serial-JTAG (303A:1001) only carries the firmware log, never frames.
pub const SIGNER_USB_IDS: &[(u16, u16)] = &[
    (0x10C4, 0xEA60),
    (0x1A86, 0x7523),
    (0x1A86, 0x55D4),
];
/// Bridge descriptor text that marks a port as a signer when several bridges are attached.
pub const SIGNER_IDENTITY_KEYWORDS: &[&str] = &["siggy"];

/// Bytes skipped while hunting for a frame header before giving up.
pub const MAX_RESYNC_BYTES: usize = 4 * 1024;

pub const DEFAULT_KEY_FILE: &str = "hmac_key.bin";
pub const DEFAULT_DEVICE_ID: &str = "FF00000001";
