//! ESP32-C3 implementations of the signer collaborators.
use esp_hal::Blocking;
use esp_hal::gpio::Output;
use esp_hal::hmac::{Hmac, HmacPurpose, KeyId};
use esp_hal::i2c::master::I2c;
use esp_hal::time::{Duration, Instant};
use esp_hal::uart::Uart;
use firmware::keys::DerivationError;
use firmware::{Indicator, LinkError, SecretProvider, SerialLink, Ssd1306, StatusSink};
use log::{debug, warn};
use shared::message::SEED_LEN;

/// eFuse block holding the HMAC root key (purpose `HMAC_UP`).
pub const HMAC_KEY_SLOT: KeyId = KeyId::Key4;

/// UART0 polled until the buffer is full or the timeout elapses, like a blocking driver read.
pub struct UartLink<'d> {
    uart: Uart<'d, Blocking>,
}

impl<'d> UartLink<'d> {
    pub fn new(uart: Uart<'d, Blocking>) -> Self {
        Self { uart }
    }
}

impl SerialLink for UartLink<'_> {
    fn read(&mut self, buffer: &mut [u8], timeout_ms: u32) -> Result<usize, LinkError> {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        let mut filled = 0;
        while filled < buffer.len() && Instant::now() < deadline {
            if self.uart.read_ready() {
                filled += self
                    .uart
                    .read(&mut buffer[filled..])
                    .map_err(|_| LinkError::Read)?;
            }
        }
        Ok(filled)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let mut written = 0;
        while written < bytes.len() {
            written += self
                .uart
                .write(&bytes[written..])
                .map_err(|_| LinkError::Write)?;
        }
        self.uart.flush().map_err(|_| LinkError::Write)
    }
}

/// Keyed hash computed by the HMAC peripheral; the root key never leaves eFuse.
pub struct HmacSecretProvider<'d> {
    hmac: Hmac<'d>,
    key: KeyId,
}

impl<'d> HmacSecretProvider<'d> {
    pub fn new(hmac: Hmac<'d>, key: KeyId) -> Self {
        Self { hmac, key }
    }
}

impl SecretProvider for HmacSecretProvider<'_> {
    fn derive(&mut self, label: &[u8], out: &mut [u8]) -> Result<(), DerivationError> {
        if out.len() != SEED_LEN {
            return Err(DerivationError::OutputLength {
                expected: SEED_LEN,
                actual: out.len(),
            });
        }

        self.hmac.init();
        nb::block!(self.hmac.configure(HmacPurpose::ToUser, self.key))
            .map_err(|_| DerivationError::Engine)?;

        let mut remaining = label;
        while !remaining.is_empty() {
            remaining = match nb::block!(self.hmac.update(remaining)) {
                Ok(rest) => rest,
                Err(never) => match never {},
            };
        }
        nb::block!(self.hmac.finalize(out)).map_err(|never| match never {})
    }
}

/// SSD1306 panel on I2C0 plus the green and red LEDs, both wired active-low.
pub struct PanelStatus<'d> {
    panel: Ssd1306<I2c<'d, Blocking>>,
    success: Output<'d>,
    error: Output<'d>,
}

impl<'d> PanelStatus<'d> {
    /// A panel that fails to initialise is logged and left dark; the LEDs still work.
    pub fn new(i2c: I2c<'d, Blocking>, success: Output<'d>, error: Output<'d>) -> Self {
        let mut panel = Ssd1306::new(i2c);
        if let Err(err) = panel.init() {
            warn!("display init failed: {err:?}");
        }
        Self {
            panel,
            success,
            error,
        }
    }
}

impl StatusSink for PanelStatus<'_> {
    fn display(&mut self, line: u8, text: &str, inverted: bool) {
        if let Err(err) = self.panel.draw_text(line, text, inverted) {
            debug!("display line {line} not drawn: {err:?}");
        }
    }

    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        let pin = match indicator {
            Indicator::Success => &mut self.success,
            Indicator::Error => &mut self.error,
        };
        if on {
            pin.set_low();
        } else {
            pin.set_high();
        }
    }
}
