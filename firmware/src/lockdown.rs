//! Fault counter and the terminal lockdown state.
//!
//! Only key-derivation failures are counted. Two in a row lock the device until it is power
//! cycled; a single successful signature in between resets the count.

/// Consecutive derivation failures that force lockdown.
pub const LOCKDOWN_THRESHOLD: u8 = 2;

/// Result of registering a derivation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTransition {
    /// Still operational; the peer may retry.
    Transient { consecutive: u8 },
    /// Threshold reached, the device is now locked.
    Lockdown,
}

/// Process-wide fault state, owned by the control loop and lent to the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultState {
    consecutive_failures: u8,
    locked: bool,
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultState {
    pub const fn new() -> Self {
        Self {
            consecutive_failures: 0,
            locked: false,
        }
    }

    /// A challenge was signed and answered.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// The secret provider could not produce the seed.
    pub fn record_derivation_failure(&mut self) -> FaultTransition {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.locked || self.consecutive_failures >= LOCKDOWN_THRESHOLD {
            self.locked = true;
            FaultTransition::Lockdown
        } else {
            FaultTransition::Transient {
                consecutive: self.consecutive_failures,
            }
        }
    }

    pub fn consecutive_failures(&self) -> u8 {
        self.consecutive_failures
    }

    /// Once true, stays true for the lifetime of this value.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_is_transient() {
        let mut state = FaultState::new();
        assert_eq!(
            state.record_derivation_failure(),
            FaultTransition::Transient { consecutive: 1 }
        );
        assert!(!state.is_locked());
    }

    #[test]
    fn second_consecutive_failure_locks() {
        let mut state = FaultState::new();
        state.record_derivation_failure();
        assert_eq!(state.record_derivation_failure(), FaultTransition::Lockdown);
        assert!(state.is_locked());
    }

    #[test]
    fn success_resets_the_counter() {
        let mut state = FaultState::new();
        state.record_derivation_failure();
        state.record_success();
        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(
            state.record_derivation_failure(),
            FaultTransition::Transient { consecutive: 1 }
        );
    }

    #[test]
    fn success_does_not_leave_lockdown() {
        let mut state = FaultState::new();
        state.record_derivation_failure();
        state.record_derivation_failure();
        state.record_success();
        assert!(state.is_locked());
        assert_eq!(state.record_derivation_failure(), FaultTransition::Lockdown);
    }
}
