//! A session-scoped, polled one-shot timer.
//!
//! Replaces the original's `SIGALRM` handler and module-level `volatile`
//! flags (see design notes) with a plain deadline compared against a
//! monotonic clock. Nothing here touches process-global state, so a
//! session's timer carries no risk of interfering with another session's.

use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct Timer {
    deadline: Option<Instant>,
    expiry_count: u32,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer for `timeout` from now, replacing any prior arming.
    pub fn arm(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    /// Cancels the timer without counting an expiry.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns `true` at most once per arming: the first poll after the
    /// deadline has passed consumes the arming and counts one expiry.
    pub fn poll_expired(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.deadline = None;
                self.expiry_count += 1;
                true
            }
            _ => false,
        }
    }

    pub fn expiry_count(&self) -> u32 {
        self.expiry_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn expires_once_per_arming() {
        let mut timer = Timer::new();
        timer.arm(Duration::from_millis(1));
        sleep(Duration::from_millis(5));
        assert!(timer.poll_expired());
        assert!(!timer.poll_expired());
        assert_eq!(timer.expiry_count(), 1);
    }

    #[test]
    fn cancel_suppresses_expiry() {
        let mut timer = Timer::new();
        timer.arm(Duration::from_millis(1));
        timer.cancel();
        sleep(Duration::from_millis(5));
        assert!(!timer.poll_expired());
        assert_eq!(timer.expiry_count(), 0);
    }
}
