use crate::automation::session::WindowSession;
use crate::core::backend::UiBackend;
use crate::error::Result;
use crate::telemetry::PerfLog;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Buttons of the modal dialogs that can pop up at any time and block input
pub const DIALOG_BUTTONS: [&str; 2] = ["Continue", "Keep All"];

/// Dismisses known modal dialogs. Safe to call at any point; absence of a dialog is normal.
pub struct DialogReaper {
    buttons: Vec<String>,
    timeout: Duration,
    perf: Rc<PerfLog>,
}

impl DialogReaper {
    pub fn new(timeout: Duration, perf: Rc<PerfLog>) -> Self {
        Self {
            buttons: DIALOG_BUTTONS.iter().map(|b| b.to_string()).collect(),
            timeout,
            perf,
        }
    }

    /// Click every known dialog button that is present, re-resolving the window
    /// before each attempt since a dismissed dialog invalidates the old handle.
    /// Only a failure to reach the window at all is returned.
    pub fn reap<B: UiBackend>(&self, session: &mut WindowSession<B>) -> Result<()> {
        let _scope = self.perf.scope("close_dialogs");
        for name in &self.buttons {
            let window = session.acquire()?;
            self.click_button_by_name(session, &window, name);
        }
        Ok(())
    }

    fn click_button_by_name<B: UiBackend>(
        &self,
        session: &mut WindowSession<B>,
        window: &B::Window,
        name: &str,
    ) -> bool {
        let _scope = self.perf.scope("click_button_by_name");
        match session.backend_mut().click_button(window, name, self.timeout) {
            Ok(true) => {
                info!("dismissed dialog via '{}'", name);
                true
            }
            Ok(false) => {
                trace!("no '{}' button", name);
                false
            }
            Err(e) => {
                debug!("clicking '{}' failed: {}", name, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::fake::{Event, FakeBackend};
    use std::path::PathBuf;

    fn session(backend: FakeBackend) -> (WindowSession<FakeBackend>, DialogReaper) {
        let perf = Rc::new(PerfLog::new(false));
        (
            WindowSession::new(backend, PathBuf::from("Bezi.exe"), Duration::ZERO, perf.clone()),
            DialogReaper::new(Duration::ZERO, perf),
        )
    }

    #[test]
    fn reaping_without_dialogs_has_no_side_effects() {
        let (mut session, reaper) = session(FakeBackend::default());
        reaper.reap(&mut session).unwrap();
        reaper.reap(&mut session).unwrap();

        let backend = session.backend();
        assert_eq!(backend.count(|e| matches!(e, Event::Click(_))), 0);
        assert!(backend.events.iter().all(|e| *e == Event::Connect));
    }

    #[test]
    fn clicks_both_known_dialogs_with_fresh_handles() {
        let (mut session, reaper) = session(FakeBackend {
            dialogs: vec!["Keep All".into(), "Continue".into()],
            ..FakeBackend::default()
        });
        reaper.reap(&mut session).unwrap();

        assert_eq!(
            session.backend().events,
            vec![
                Event::Connect,
                Event::Click("Continue".into()),
                Event::Connect,
                Event::Click("Keep All".into()),
            ]
        );
        assert!(session.backend().dialogs.is_empty());
    }

    #[test]
    fn unknown_buttons_are_left_alone() {
        let (mut session, reaper) = session(FakeBackend {
            dialogs: vec!["Discard".into()],
            ..FakeBackend::default()
        });
        reaper.reap(&mut session).unwrap();
        assert_eq!(session.backend().dialogs, vec!["Discard".to_string()]);
    }
}
