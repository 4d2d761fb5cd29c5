//! Human-visible feedback: display lines and the two indicator LEDs.
//!
//! The sink is fire-and-forget. Every blink goes through an injected [`DelayNs`] so the timing can
//! be shortened or removed entirely in tests with [`FeedbackTiming::instant`].
use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use heapless::String;
use shared::message::DeviceId;

use crate::config::{BANNER_TITLE, BANNER_VENDOR, BANNER_VERSION};

/// Display line used for transient status messages.
pub const STATUS_LINE: u8 = 5;

const BLANK: &str = "                ";
const LOCKDOWN_RULE: &str = "================";
const LOCKDOWN_TEXT: &str = "L O C K D O W N ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Green LED.
    Success,
    /// Red LED.
    Error,
}

/// Display and indicator outputs of the device.
pub trait StatusSink {
    fn display(&mut self, line: u8, text: &str, inverted: bool);
    fn set_indicator(&mut self, indicator: Indicator, on: bool);
}

impl<T> StatusSink for &mut T
where
    T: StatusSink + ?Sized,
{
    fn display(&mut self, line: u8, text: &str, inverted: bool) {
        (**self).display(line, text, inverted);
    }

    fn set_indicator(&mut self, indicator: Indicator, on: bool) {
        (**self).set_indicator(indicator, on);
    }
}

/// Durations (milliseconds) of every visible pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackTiming {
    pub boot_settle_ms: u32,
    pub unknown_pulse_ms: u32,
    pub unknown_gap_ms: u32,
    pub success_pulse_ms: u32,
    pub failure_pulse_ms: u32,
    pub lockdown_blink_ms: u32,
}

impl FeedbackTiming {
    /// No waiting at all.
    pub const fn instant() -> Self {
        Self {
            boot_settle_ms: 0,
            unknown_pulse_ms: 0,
            unknown_gap_ms: 0,
            success_pulse_ms: 0,
            failure_pulse_ms: 0,
            lockdown_blink_ms: 0,
        }
    }
}

impl Default for FeedbackTiming {
    fn default() -> Self {
        Self {
            boot_settle_ms: 500,
            unknown_pulse_ms: 500,
            unknown_gap_ms: 100,
            success_pulse_ms: 100,
            failure_pulse_ms: 1_000,
            lockdown_blink_ms: 1_000,
        }
    }
}

/// Renders protocol events onto a [`StatusSink`], blocking on `delay` while a pattern plays.
pub struct Feedback<S, D> {
    sink: S,
    delay: D,
    timing: FeedbackTiming,
}

impl<S, D> Feedback<S, D>
where
    S: StatusSink,
    D: DelayNs,
{
    pub fn new(sink: S, delay: D, timing: FeedbackTiming) -> Self {
        Self {
            sink,
            delay,
            timing,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    pub fn timing(&self) -> FeedbackTiming {
        self.timing
    }

    /// Both indicators off, banner and key id on lines 0–3.
    pub fn boot_banner(&mut self, device_id: &DeviceId) {
        self.sink.set_indicator(Indicator::Success, false);
        self.sink.set_indicator(Indicator::Error, false);
        self.sink.display(0, BANNER_TITLE, false);
        self.sink.display(1, BANNER_VERSION, false);
        self.sink.display(2, BANNER_VENDOR, false);
        self.sink.display(3, &key_id_line(device_id), false);
    }

    pub fn settle(&mut self) {
        self.wait(self.timing.boot_settle_ms);
    }

    /// Two red pulses.
    pub fn unknown_command(&mut self) {
        self.show_status("error");
        self.pulse(Indicator::Error, self.timing.unknown_pulse_ms);
        self.wait(self.timing.unknown_gap_ms);
        self.pulse(Indicator::Error, self.timing.unknown_pulse_ms);
        self.clear_status("error");
    }

    pub fn signature_ok(&mut self) {
        self.show_status("Sig OK!");
        self.pulse(Indicator::Success, self.timing.success_pulse_ms);
        self.clear_status("Sig OK!");
    }

    pub fn signature_failed(&mut self) {
        self.show_status("Sig FAIL!");
        self.pulse(Indicator::Error, self.timing.failure_pulse_ms);
        self.clear_status("Sig FAIL!");
    }

    pub fn derivation_error(&mut self) {
        self.show_status("HMAC ERROR");
        self.pulse(Indicator::Error, self.timing.failure_pulse_ms);
        self.clear_status("HMAC ERROR");
    }

    /// Draw the lockdown screen and latch the red indicator.
    pub fn enter_lockdown(&mut self) {
        self.sink.display(0, "Admin key-ERROR", true);
        self.draw_lockdown_banner();
        self.sink.set_indicator(Indicator::Error, true);
    }

    /// One period of the alternating lockdown alarm: hide the banner, then show it again.
    pub fn lockdown_cycle(&mut self) {
        self.wait(self.timing.lockdown_blink_ms);
        for line in 5..=7 {
            self.sink.display(line, BLANK, false);
        }
        self.wait(self.timing.lockdown_blink_ms);
        self.draw_lockdown_banner();
    }

    fn draw_lockdown_banner(&mut self) {
        self.sink.display(5, LOCKDOWN_RULE, true);
        self.sink.display(6, LOCKDOWN_TEXT, true);
        self.sink.display(7, LOCKDOWN_RULE, true);
    }

    fn show_status(&mut self, text: &str) {
        self.sink.display(STATUS_LINE, text, false);
    }

    fn clear_status(&mut self, previous: &str) {
        let width = previous.len().min(BLANK.len());
        self.sink.display(STATUS_LINE, &BLANK[..width], false);
    }

    fn pulse(&mut self, indicator: Indicator, duration_ms: u32) {
        self.sink.set_indicator(indicator, true);
        self.wait(duration_ms);
        self.sink.set_indicator(indicator, false);
    }

    fn wait(&mut self, duration_ms: u32) {
        if duration_ms > 0 {
            self.delay.delay_ms(duration_ms);
        }
    }
}

/// `KeyID:` followed by the device identity in upper-case hex.
pub fn key_id_line(device_id: &DeviceId) -> String<24> {
    let mut line = String::new();
    let _ = line.push_str("KeyID:");
    for byte in device_id {
        let _ = write!(line, "{byte:02X}");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::{String as StdString, ToString};
    use alloc::vec::Vec;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Line(u8, StdString, bool),
        Led(Indicator, bool),
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<Event>,
    }

    impl StatusSink for RecordingSink {
        fn display(&mut self, line: u8, text: &str, inverted: bool) {
            self.events.push(Event::Line(line, text.to_string(), inverted));
        }

        fn set_indicator(&mut self, indicator: Indicator, on: bool) {
            self.events.push(Event::Led(indicator, on));
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        waits_ns: Vec<u32>,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.waits_ns.push(ns);
        }

        fn delay_ms(&mut self, ms: u32) {
            self.waits_ns.push(ms * 1_000_000);
        }
    }

    fn feedback(timing: FeedbackTiming) -> Feedback<RecordingSink, RecordingDelay> {
        Feedback::new(RecordingSink::default(), RecordingDelay::default(), timing)
    }

    #[test]
    fn key_id_renders_identity_in_hex() {
        assert_eq!(key_id_line(&[0xFF, 0x00, 0x00, 0x00, 0x01]), "KeyID:FF00000001");
    }

    #[test]
    fn unknown_command_blinks_red_twice() {
        let mut feedback = feedback(FeedbackTiming::default());
        feedback.unknown_command();

        let red_on = feedback
            .sink()
            .events
            .iter()
            .filter(|event| **event == Event::Led(Indicator::Error, true))
            .count();
        assert_eq!(red_on, 2);
        assert_eq!(
            feedback.delay().waits_ns,
            [500_000_000, 100_000_000, 500_000_000]
        );
        assert_eq!(
            feedback.sink().events.last(),
            Some(&Event::Line(STATUS_LINE, "     ".to_string(), false))
        );
    }

    #[test]
    fn instant_timing_never_waits() {
        let mut feedback = feedback(FeedbackTiming::instant());
        feedback.unknown_command();
        feedback.signature_ok();
        feedback.signature_failed();
        feedback.derivation_error();
        feedback.lockdown_cycle();
        assert!(feedback.delay().waits_ns.is_empty());
    }

    #[test]
    fn lockdown_latches_red_indicator() {
        let mut feedback = feedback(FeedbackTiming::instant());
        feedback.enter_lockdown();
        let events = &feedback.sink().events;
        assert_eq!(events.last(), Some(&Event::Led(Indicator::Error, true)));
        assert!(events.contains(&Event::Line(6, LOCKDOWN_TEXT.to_string(), true)));
    }

    #[test]
    fn boot_banner_fills_first_four_lines() {
        let mut feedback = feedback(FeedbackTiming::instant());
        feedback.boot_banner(&[0xFF, 0x00, 0x00, 0x00, 0x01]);
        let lines: Vec<_> = feedback
            .sink()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Line(line, text, _) => Some((*line, text.as_str())),
                Event::Led(..) => None,
            })
            .collect();
        assert_eq!(
            lines,
            [
                (0, "Admin key"),
                (1, "Siggy-V1.0"),
                (2, "By NebulaFluff"),
                (3, "KeyID:FF00000001"),
            ]
        );
    }
}
