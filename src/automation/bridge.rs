use crate::automation::classifier::StateClassifier;
use crate::automation::dialogs::DialogReaper;
use crate::automation::protocol::PromptSubmission;
use crate::automation::session::{IndicatorLocator, WindowSession};
use crate::automation::{pause, Timing};
use crate::core::backend::{Keystroke, UiBackend};
use crate::core::power::KeepAwake;
use crate::error::{BridgeError, Result};
use crate::settings::SessionConfig;
use crate::telemetry::PerfLog;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub prompt: Option<String>,
    pub bezi_path: Option<String>,
    pub init: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Initialized,
    Harvested(Vec<String>),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Initialized => f.write_str("Initialization Complete"),
            RunOutcome::Harvested(lines) => {
                f.write_str("[")?;
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&quote(line))?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Quote like a Python string repr: double quotes only when the text has a
/// single quote and no double quote
fn quote(text: &str) -> String {
    let delimiter = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(delimiter);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push(delimiter);
    out
}

/// One full invocation: discovery, then either initialization or a prompt round trip
pub struct Bridge<B: UiBackend> {
    session: WindowSession<B>,
    classifier: StateClassifier,
    reaper: DialogReaper,
    config: SessionConfig,
    config_path: PathBuf,
    timing: Timing,
    perf: Rc<PerfLog>,
}

impl<B: UiBackend> Bridge<B> {
    pub fn new(
        backend: B,
        classifier: StateClassifier,
        config: SessionConfig,
        config_path: PathBuf,
        timing: Timing,
        perf: Rc<PerfLog>,
    ) -> Self {
        let exe = config.resolve_exe(None);
        Self {
            session: WindowSession::new(backend, exe, timing.connect_timeout, perf.clone()),
            classifier,
            reaper: DialogReaper::new(timing.dialog_timeout, perf.clone()),
            config,
            config_path,
            timing,
            perf,
        }
    }

    /// Swap how the state indicator is found, e.g. by automation id once the app exposes one
    pub fn with_locator(mut self, locator: IndicatorLocator) -> Self {
        self.session = self.session.with_locator(locator);
        self
    }

    #[cfg(test)]
    pub fn session(&self) -> &WindowSession<B> {
        &self.session
    }

    #[cfg(test)]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The system is kept awake for the whole run and released on every exit path
    pub fn run(&mut self, request: &RunRequest) -> Result<RunOutcome> {
        let _scope = self.perf.scope("run");
        let prompt = request.prompt.as_deref().unwrap_or_default();
        if !request.init && prompt.is_empty() {
            return Err(BridgeError::EmptyPrompt);
        }

        let _awake = KeepAwake::acquire();
        self.session
            .set_exe(self.config.resolve_exe(request.bezi_path.as_deref()));
        self.session.acquire()?;

        if request.init {
            let _scope = self.perf.scope("save_config");
            self.config.initialize(request.bezi_path.as_deref());
            self.config.save(&self.config_path)?;
            info!(path = %self.config_path.display(), "session initialized");
            return Ok(RunOutcome::Initialized);
        }

        self.new_thread()?;
        let mut protocol = PromptSubmission::new(
            &mut self.session,
            &self.classifier,
            &self.reaper,
            self.timing,
            self.perf.clone(),
        );
        let result = protocol.run(prompt);
        debug!(state = ?protocol.state(), "prompt submission finished");
        Ok(RunOutcome::Harvested(result?))
    }

    /// Open a fresh conversation so the harvest only holds this exchange
    fn new_thread(&mut self) -> Result<()> {
        let _scope = self.perf.scope("new_thread");
        let window = self.session.acquire()?;
        let backend = self.session.backend_mut();
        backend.focus(&window)?;
        backend.send_keys(&window, Keystroke::Ctrl('t'))?;
        pause(self.timing.new_thread);
        self.reaper.reap(&mut self.session)
    }
}
