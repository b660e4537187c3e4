pub mod bridge;
pub mod classifier;
pub mod dialogs;
pub mod fingerprint;
pub mod protocol;
pub mod session;

use std::thread;
use std::time::Duration;

/// Fixed waits of the polling protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Between two state readings while waiting for idle
    pub poll_interval: Duration,
    /// After setting the prompt text, before pressing Enter
    pub settle: Duration,
    /// After pressing Enter
    pub after_submit: Duration,
    /// After opening a new conversation thread
    pub new_thread: Duration,
    pub dialog_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            settle: Duration::from_secs(1),
            after_submit: Duration::from_secs(2),
            new_thread: Duration::from_secs(1),
            dialog_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl Timing {
    /// No waiting at all, for driving the protocol against a scripted backend
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            settle: Duration::ZERO,
            after_submit: Duration::ZERO,
            new_thread: Duration::ZERO,
            dialog_timeout: Duration::ZERO,
            connect_timeout: Duration::ZERO,
        }
    }
}

/// Sleep for `duration`; zero returns immediately
pub fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
