use crate::automation::classifier::{ActivityState, StateClassifier};
use crate::core::backend::{ControlType, TargetWindow, UiBackend};
use crate::error::{BridgeError, Result};
use crate::telemetry::PerfLog;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};

/// Width and height of the square send/stop icon
pub const INDICATOR_SIZE: i32 = 56;

/// How the state indicator is told apart from other controls.
/// The icon has no stable name, so its fixed size is the only reliable handle today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorLocator {
    BySize { width: i32, height: i32 },
    ByAutomationId(String),
}

impl Default for IndicatorLocator {
    fn default() -> Self {
        IndicatorLocator::BySize {
            width: INDICATOR_SIZE,
            height: INDICATOR_SIZE,
        }
    }
}

/// Owns the backend and hands out a freshly resolved window for every operation
pub struct WindowSession<B: UiBackend> {
    backend: B,
    target: TargetWindow,
    exe: PathBuf,
    locator: IndicatorLocator,
    connect_timeout: Duration,
    perf: Rc<PerfLog>,
}

impl<B: UiBackend> WindowSession<B> {
    pub fn new(backend: B, exe: PathBuf, connect_timeout: Duration, perf: Rc<PerfLog>) -> Self {
        Self {
            backend,
            target: TargetWindow::default(),
            exe,
            locator: IndicatorLocator::default(),
            connect_timeout,
            perf,
        }
    }

    pub fn with_locator(mut self, locator: IndicatorLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn set_exe(&mut self, exe: PathBuf) {
        self.exe = exe;
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Connect to the running app, launching it when no instance answers.
    /// The result is only good for the operation that immediately follows.
    pub fn acquire(&mut self) -> Result<B::Window> {
        let _scope = self.perf.scope("find_windows");
        match self.backend.connect(&self.target, self.connect_timeout) {
            Ok(window) => Ok(window),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!("could not connect to Bezi: {}", err);
                warn!(exe = %self.exe.display(), "launching Bezi");
                self.backend.launch(&self.exe, &self.target, self.connect_timeout)
            }
        }
    }

    /// Find the state indicator among the window's descendants.
    ///
    /// `IndicatorNotFound` only when every control answered and none matched;
    /// if some control could not be inspected the miss is a `Backend` error.
    pub fn state_indicator(&mut self, window: &B::Window) -> Result<B::Control> {
        let _scope = self.perf.scope("find_submit_button");
        let controls = self.backend.descendants(window, ControlType::Any)?;
        let mut unreadable = None;
        for control in controls {
            match self.is_indicator(&control) {
                Ok(true) => return Ok(control),
                Ok(false) => {}
                Err(err) => unreadable = Some(err),
            }
        }
        match unreadable {
            Some(err) => Err(BridgeError::Backend(format!(
                "indicator lookup incomplete: {}",
                err
            ))),
            None => Err(BridgeError::IndicatorNotFound),
        }
    }

    fn is_indicator(&mut self, control: &B::Control) -> Result<bool> {
        Ok(match &self.locator {
            IndicatorLocator::BySize { width, height } => {
                let rect = self.backend.rect(control)?;
                rect.width() == *width && rect.height() == *height
            }
            IndicatorLocator::ByAutomationId(id) => self.backend.automation_id(control)? == *id,
        })
    }

    /// Resolve the window, find the indicator and classify its pixels.
    ///
    /// A missing indicator is fatal. Stale enumerations and failed captures
    /// read as `Unknown` so the caller simply polls again.
    pub fn read_state(&mut self, classifier: &StateClassifier) -> Result<ActivityState> {
        let _scope = self.perf.scope("get_bezi_state");
        let window = self.acquire()?;

        let indicator = match self.state_indicator(&window) {
            Ok(indicator) => indicator,
            Err(BridgeError::Backend(reason)) => {
                debug!("descendant lookup failed, retrying: {}", reason);
                return Ok(ActivityState::Unknown);
            }
            Err(err) => return Err(err),
        };

        match self.backend.capture(&indicator) {
            Ok(capture) => Ok(classifier.classify(&capture)),
            Err(err) => {
                debug!("indicator capture failed: {}", err);
                Ok(ActivityState::Unknown)
            }
        }
    }
}
