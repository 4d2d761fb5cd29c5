//! Compiled-in device constants.
use shared::derive::SEED_LABEL;
use shared::message::{DeviceId, PublicKeyBytes};

/// Identity bound into every signed challenge.
pub const DEVICE_ID: DeviceId = [0xFF, 0x00, 0x00, 0x00, 0x01];

/// Public half of the key pair derived from the eFuse HMAC key.
pub const PUBLIC_KEY: PublicKeyBytes = [
    0xF9, 0xBF, 0xC4, 0xFC, 0x54, 0x93, 0xC4, 0xE2, 0x59, 0xDB, 0xDF, 0xE6, 0x65, 0x79, 0x72, 0x00,
    0x80, 0x44, 0x1E, 0x04, 0x2E, 0xF0, 0x92, 0xEA, 0x53, 0xA6, 0x01, 0x4E, 0x78, 0xD2, 0xE2, 0xAA,
];

/// How long a single transport read waits before reporting "no event".
pub const READ_TIMEOUT_MS: u32 = 500;

/// Banner lines shown at boot; the key id line is rendered from the device identity.
pub const BANNER_TITLE: &str = "Admin key";
pub const BANNER_VERSION: &str = "Siggy-V1.0";
pub const BANNER_VENDOR: &str = "By NebulaFluff";

/// Everything the protocol handlers need to know about this particular device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub device_id: DeviceId,
    pub public_key: PublicKeyBytes,
    pub seed_label: &'static [u8],
    pub read_timeout_ms: u32,
}

impl DeviceConfig {
    /// Constants flashed into production units.
    pub const fn production() -> Self {
        Self {
            device_id: DEVICE_ID,
            public_key: PUBLIC_KEY,
            seed_label: SEED_LABEL,
            read_timeout_ms: READ_TIMEOUT_MS,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::production()
    }
}
