#![allow(dead_code)]

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use firmware::keys::DerivationError;
use firmware::{
    Device, DeviceConfig, Ed25519Engine, Feedback, FeedbackTiming, Indicator, LinkError,
    SecretProvider, SerialLink, SoftwareSecretProvider, StatusSink,
};

pub const ROOT_KEY: [u8; 32] = [0x11; 32];
pub const TEST_PUBLIC_KEY_HEX: &str =
    "bee75d75ded4bcb33b727c2d3919663f4a66b650327e7b13ff51cbcff0669c00";
pub const TEST_NONCE: &[u8; 32] = b"qwertyuiopasdfghjklzxcvbnmqwerty";
pub const TEST_SIGNATURE_HEX: &str = "67f63f24da13abd672b36ebd02285b0b85e794c6412f458cbe342c60ac4eb9e4ae5f02cac69165c3dc740e12e97fba79a2c2320011bcf0d1e7dc1c5ed46af800";

pub fn test_public_key() -> [u8; 32] {
    hex::decode(TEST_PUBLIC_KEY_HEX)
        .expect("hex")
        .try_into()
        .expect("32 bytes")
}

pub fn test_config() -> DeviceConfig {
    DeviceConfig {
        public_key: test_public_key(),
        ..DeviceConfig::production()
    }
}

pub fn challenge_frame(nonce: &[u8; 32]) -> Vec<u8> {
    let mut frame = vec![0xA5, 0x5A, 0x01];
    frame.extend_from_slice(nonce);
    frame
}

/// Link that hands out one scripted chunk per read and records every write.
#[derive(Default)]
pub struct ScriptedLink {
    inbound: VecDeque<Result<Vec<u8>, LinkError>>,
    pub written: Vec<Vec<u8>>,
    pub reads: usize,
    pub fail_writes: bool,
}

impl ScriptedLink {
    /// Link whose every write is refused.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.inbound.push_back(Ok(bytes.to_vec()));
    }

    pub fn push_error(&mut self, error: LinkError) {
        self.inbound.push_back(Err(error));
    }
}

impl SerialLink for ScriptedLink {
    fn read(&mut self, buffer: &mut [u8], _timeout_ms: u32) -> Result<usize, LinkError> {
        self.reads += 1;
        match self.inbound.pop_front() {
            None => Ok(0),
            Some(Err(error)) => Err(error),
            Some(Ok(bytes)) => {
                let count = bytes.len().min(buffer.len());
                buffer[..count].copy_from_slice(&bytes[..count]);
                Ok(count)
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.fail_writes {
            return Err(LinkError::Write);
        }
        self.written.push(bytes.to_vec());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Line {
        line: u8,
        text: String,
        inverted: bool,
    },
    Indicator(Indicator, bool),
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<StatusEvent>,
}

impl RecordingSink {
    pub fn indicator_pulses(&self, indicator: Indicator) -> usize {
        self.events
            .iter()
            .filter(|event| **event == StatusEvent::Indicator(indicator, true))
            .count()
    }

    pub fn shows(&self, text: &str) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, StatusEvent::Line { text: shown, .. } if shown == text))
    }
}

impl StatusSink for RecordingSink {
    fn display(&mut self, line: u8, text: &str, inverted: bool) {
        self.events.push(StatusEvent::Line {
            line,
            text: text.to_string(),
            inverted,
        });
    }

    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        self.events.push(StatusEvent::Indicator(indicator, on));
    }
}

#[derive(Default)]
pub struct CountingDelay {
    pub total_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

/// Software provider whose next derivations can be scripted to fail.
pub struct ScriptedProvider {
    inner: SoftwareSecretProvider,
    failures: VecDeque<bool>,
    pub calls: usize,
}

impl ScriptedProvider {
    pub fn healthy() -> Self {
        Self::with_failures(&[])
    }

    pub fn with_failures(script: &[bool]) -> Self {
        Self {
            inner: SoftwareSecretProvider::new(ROOT_KEY),
            failures: script.iter().copied().collect(),
            calls: 0,
        }
    }

    pub fn fail_next(&mut self) {
        self.failures.push_back(true);
    }

    pub fn succeed_next(&mut self) {
        self.failures.push_back(false);
    }
}

impl SecretProvider for ScriptedProvider {
    fn derive(&mut self, label: &[u8], out: &mut [u8]) -> Result<(), DerivationError> {
        self.calls += 1;
        if self.failures.pop_front().unwrap_or(false) {
            return Err(DerivationError::Engine);
        }
        self.inner.derive(label, out)
    }
}

pub type TestDevice<'a> = Device<
    &'a mut ScriptedLink,
    &'a mut ScriptedProvider,
    Ed25519Engine,
    &'a mut RecordingSink,
    CountingDelay,
>;

pub fn device<'a>(
    link: &'a mut ScriptedLink,
    provider: &'a mut ScriptedProvider,
    sink: &'a mut RecordingSink,
) -> TestDevice<'a> {
    Device::new(
        link,
        provider,
        Ed25519Engine,
        Feedback::new(sink, CountingDelay::default(), FeedbackTiming::instant()),
        test_config(),
    )
}
