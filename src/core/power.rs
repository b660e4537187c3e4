use tracing::debug;

#[cfg(windows)]
use windows::Win32::System::Power::{
    SetThreadExecutionState, ES_CONTINUOUS, ES_DISPLAY_REQUIRED, ES_SYSTEM_REQUIRED,
};

/// Keeps the system and display awake until dropped
pub struct KeepAwake {
    _private: (),
}

impl KeepAwake {
    pub fn acquire() -> Self {
        set_keep_awake(true);
        Self { _private: () }
    }
}

impl Drop for KeepAwake {
    fn drop(&mut self) {
        set_keep_awake(false);
    }
}

#[cfg(windows)]
fn set_keep_awake(keep_awake: bool) {
    let flags = if keep_awake {
        // Prevent sleep and display off
        ES_CONTINUOUS | ES_SYSTEM_REQUIRED | ES_DISPLAY_REQUIRED
    } else {
        // Back to default Windows behavior
        ES_CONTINUOUS
    };
    let previous = unsafe { SetThreadExecutionState(flags) };
    debug!(keep_awake, previous = previous.0, "execution state changed");
}

#[cfg(not(windows))]
fn set_keep_awake(keep_awake: bool) {
    debug!(keep_awake, "no power management on this platform");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_can_be_taken_repeatedly() {
        drop(KeepAwake::acquire());
        let _again = KeepAwake::acquire();
    }
}
