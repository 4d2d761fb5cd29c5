//! Single-threaded control loop tying the link, the handlers and the status outputs together.
use embedded_hal::delay::DelayNs;
use log::{debug, error, info, trace, warn};
use shared::frame::{Command, FrameError, READY_FRAME, RX_FRAME_LEN, decode_request};

use crate::config::DeviceConfig;
use crate::dispatch::{Action, dispatch};
use crate::keys::{DerivationError, SecretProvider, SignError, SignatureEngine};
use crate::lockdown::FaultState;
use crate::status::{Feedback, StatusSink};
use crate::transport::{LinkError, SerialLink};

/// Non-fatal failure observed while handling one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    UnknownCommand(u8),
    Signature(SignError),
    Derivation {
        error: DerivationError,
        consecutive: u8,
    },
    /// The transport reported an error while reading.
    Link(LinkError),
}

/// Result of a single [`Device::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The read timed out with nothing received.
    Idle,
    /// Received bytes were not a frame; nothing was sent.
    Dropped(FrameError),
    /// A response frame for this command was written.
    Replied(Command),
    Faulted(Fault),
    /// This poll pushed the device into lockdown.
    LockdownEntered,
    /// The device was already locked; the link was not touched.
    Locked,
}

pub struct Device<L, P, E, S, D> {
    link: L,
    secrets: P,
    engine: E,
    feedback: Feedback<S, D>,
    config: DeviceConfig,
    faults: FaultState,
}

impl<L, P, E, S, D> Device<L, P, E, S, D>
where
    L: SerialLink,
    P: SecretProvider,
    E: SignatureEngine,
    S: StatusSink,
    D: DelayNs,
{
    pub fn new(
        link: L,
        secrets: P,
        engine: E,
        feedback: Feedback<S, D>,
        config: DeviceConfig,
    ) -> Self {
        Self {
            link,
            secrets,
            engine,
            feedback,
            config,
            faults: FaultState::new(),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn faults(&self) -> &FaultState {
        &self.faults
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn feedback(&self) -> &Feedback<S, D> {
        &self.feedback
    }

    /// Boot banner, settle delay, then the ready frame.
    pub fn announce_ready(&mut self) {
        self.feedback.boot_banner(&self.config.device_id);
        self.feedback.settle();
        info!("signer ready");
        self.transmit(&READY_FRAME);
    }

    /// Read at most one frame and handle it to completion, including any status pattern.
    pub fn poll(&mut self) -> PollOutcome {
        if self.faults.is_locked() {
            return PollOutcome::Locked;
        }

        let mut buffer = [0u8; RX_FRAME_LEN];
        let received = match self.link.read(&mut buffer, self.config.read_timeout_ms) {
            Ok(0) => return PollOutcome::Idle,
            Ok(count) => count.min(RX_FRAME_LEN),
            Err(err) => {
                warn!("{err}");
                return PollOutcome::Faulted(Fault::Link(err));
            }
        };
        trace!("received {received} bytes");

        let frame = match decode_request(&buffer[..received]) {
            Ok(frame) => frame,
            Err(err) => {
                debug!("dropping frame: {err}");
                return PollOutcome::Dropped(err);
            }
        };

        let action = dispatch(
            &frame,
            &self.config,
            &mut self.secrets,
            &mut self.engine,
            &mut self.faults,
        );

        match action {
            Action::Reply { command, frame } => {
                self.transmit(&frame);
                if command == Command::IdentityResponse {
                    self.feedback.signature_ok();
                }
                PollOutcome::Replied(command)
            }
            Action::Unknown(command) => {
                self.feedback.unknown_command();
                PollOutcome::Faulted(Fault::UnknownCommand(command))
            }
            Action::SignatureFailed(error) => {
                self.feedback.signature_failed();
                PollOutcome::Faulted(Fault::Signature(error))
            }
            Action::DerivationFailed { error, consecutive } => {
                self.feedback.derivation_error();
                PollOutcome::Faulted(Fault::Derivation { error, consecutive })
            }
            Action::Lockdown(cause) => {
                error!("entering lockdown after repeated derivation failures ({cause})");
                self.feedback.enter_lockdown();
                PollOutcome::LockdownEntered
            }
        }
    }

    /// Announce, serve frames until lockdown, then show the lockdown alarm until reset.
    pub fn run(mut self) -> ! {
        self.announce_ready();
        while !matches!(
            self.poll(),
            PollOutcome::LockdownEntered | PollOutcome::Locked
        ) {}
        loop {
            self.feedback.lockdown_cycle();
        }
    }

    fn transmit(&mut self, frame: &[u8]) {
        if let Err(err) = self.link.write(frame) {
            warn!("{err}, dropping {} byte frame", frame.len());
        }
    }
}
