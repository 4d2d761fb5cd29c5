#![no_std]
#![no_main]

use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::hmac::Hmac;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::main;
use esp_hal::time::Rate;
use esp_hal::uart::{Config as UartConfig, Uart};
use firmware::{Device, DeviceConfig, Ed25519Engine, Feedback, FeedbackTiming};
use log::info;

mod board;

use board::{HMAC_KEY_SLOT, HmacSecretProvider, PanelStatus, UartLink};

const BAUD_RATE: u32 = 115_200;
const DISPLAY_I2C_KHZ: u32 = 400;

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

#[main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

    let uart = Uart::new(
        peripherals.UART0,
        UartConfig::default().with_baudrate(BAUD_RATE),
    )
    .expect("UART0 configuration")
    .with_tx(peripherals.GPIO21)
    .with_rx(peripherals.GPIO20);

    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(DISPLAY_I2C_KHZ)),
    )
    .expect("I2C0 configuration")
    .with_sda(peripherals.GPIO4)
    .with_scl(peripherals.GPIO5);

    let green = Output::new(peripherals.GPIO19, Level::High, OutputConfig::default());
    let red = Output::new(peripherals.GPIO18, Level::High, OutputConfig::default());

    let secrets = HmacSecretProvider::new(Hmac::new(peripherals.HMAC), HMAC_KEY_SLOT);
    let feedback = Feedback::new(
        PanelStatus::new(i2c, green, red),
        Delay::new(),
        FeedbackTiming::default(),
    );

    info!("siggy-esp32c3 {}", env!("CARGO_PKG_VERSION"));
    Device::new(
        UartLink::new(uart),
        secrets,
        Ed25519Engine,
        feedback,
        DeviceConfig::production(),
    )
    .run()
}
