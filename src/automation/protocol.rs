//! Prompt submission state machine.
//!
//! ```text
//! AwaitIdlePre -> Submitting -> AwaitIdlePost -> Harvest -> Done
//!        \             \              \             \
//!         +-------------+--------------+-------------+--> Failed
//! ```
//!
//! Both waits only end on `INACTIVE`. `READY` right after completion is not
//! trusted yet, so at most one prompt is ever in flight and output is read
//! only after the app has signalled completion.

use crate::automation::classifier::{ActivityState, StateClassifier};
use crate::automation::dialogs::DialogReaper;
use crate::automation::session::WindowSession;
use crate::automation::{pause, Timing};
use crate::core::backend::{ControlType, Keystroke, UiBackend};
use crate::error::{BridgeError, Result};
use crate::telemetry::PerfLog;
use std::rc::Rc;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    AwaitIdlePre,
    Submitting,
    AwaitIdlePost,
    Harvest,
    Done,
    Failed,
}

pub struct PromptSubmission<'a, B: UiBackend> {
    session: &'a mut WindowSession<B>,
    classifier: &'a StateClassifier,
    reaper: &'a DialogReaper,
    timing: Timing,
    perf: Rc<PerfLog>,
    state: ProtocolState,
    last_reading: Option<ActivityState>,
}

impl<'a, B: UiBackend> PromptSubmission<'a, B> {
    pub fn new(
        session: &'a mut WindowSession<B>,
        classifier: &'a StateClassifier,
        reaper: &'a DialogReaper,
        timing: Timing,
        perf: Rc<PerfLog>,
    ) -> Self {
        Self {
            session,
            classifier,
            reaper,
            timing,
            perf,
            state: ProtocolState::AwaitIdlePre,
            last_reading: None,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Submit `prompt` and return the trimmed text of every text control once the app is idle again
    pub fn run(&mut self, prompt: &str) -> Result<Vec<String>> {
        let _scope = self.perf.scope("send_prompt");
        if prompt.is_empty() {
            self.transition(ProtocolState::Failed);
            return Err(BridgeError::EmptyPrompt);
        }

        match self.drive(prompt) {
            Ok(lines) => {
                self.transition(ProtocolState::Done);
                Ok(lines)
            }
            Err(err) => {
                self.transition(ProtocolState::Failed);
                if err.is_fatal() {
                    error!("{}", err);
                } else {
                    warn!("prompt submission failed: {}", err);
                }
                Err(err)
            }
        }
    }

    fn drive(&mut self, prompt: &str) -> Result<Vec<String>> {
        self.transition(ProtocolState::AwaitIdlePre);
        self.await_idle()?;

        self.transition(ProtocolState::Submitting);
        self.submit(prompt)?;

        self.transition(ProtocolState::AwaitIdlePost);
        self.await_idle()?;

        self.transition(ProtocolState::Harvest);
        self.harvest()
    }

    fn transition(&mut self, next: ProtocolState) {
        debug!(from = ?self.state, to = ?next, "protocol transition");
        self.state = next;
    }

    /// Poll once per interval, clearing dialogs in between, until the indicator reads INACTIVE
    fn await_idle(&mut self) -> Result<()> {
        let _scope = self.perf.scope("await_idle");
        loop {
            let reading = self.session.read_state(self.classifier)?;
            self.last_reading = Some(reading);
            if reading == ActivityState::Inactive {
                break;
            }
            debug!(state = %reading, "not idle yet");
            self.reaper.reap(self.session)?;
            pause(self.timing.poll_interval);
        }
        self.reaper.reap(self.session)
    }

    fn submit(&mut self, prompt: &str) -> Result<()> {
        let _scope = self.perf.scope("submit");
        if self.last_reading != Some(ActivityState::Inactive) {
            return Err(BridgeError::Backend(format!(
                "refusing to submit while the app reads {}",
                self.last_reading.unwrap_or(ActivityState::Unknown)
            )));
        }

        let window = self.session.acquire()?;
        let backend = self.session.backend_mut();

        // The bottom-most edit field is the live prompt box
        let prompt_box = backend
            .descendants(&window, ControlType::Edit)?
            .pop()
            .ok_or(BridgeError::PromptBoxNotFound)?;
        backend.set_text(&prompt_box, prompt)?;
        pause(self.timing.settle);

        backend.send_keys(&window, Keystroke::Enter)?;
        pause(self.timing.after_submit);
        Ok(())
    }

    fn harvest(&mut self) -> Result<Vec<String>> {
        let _scope = self.perf.scope("harvest");
        let window = self.session.acquire()?;
        let backend = self.session.backend_mut();

        let mut lines = Vec::new();
        for control in backend.descendants(&window, ControlType::Text)? {
            lines.push(backend.text(&control)?.trim().to_string());
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::classifier::ActivityState::{Busy, Inactive, Ready, Unknown};
    use crate::core::backend::fake::{references, Event, FakeBackend};
    use std::path::PathBuf;

    struct Harness {
        session: WindowSession<FakeBackend>,
        classifier: StateClassifier,
        reaper: DialogReaper,
        perf: Rc<PerfLog>,
    }

    impl Harness {
        fn new(backend: FakeBackend) -> Self {
            let perf = Rc::new(PerfLog::new(false));
            let timing = Timing::immediate();
            Self {
                session: WindowSession::new(
                    backend,
                    PathBuf::from("Bezi.exe"),
                    timing.connect_timeout,
                    perf.clone(),
                ),
                classifier: StateClassifier::new(references(), perf.clone()),
                reaper: DialogReaper::new(timing.dialog_timeout, perf.clone()),
                perf,
            }
        }

        fn run(&mut self, prompt: &str) -> (Result<Vec<String>>, ProtocolState) {
            let mut protocol = PromptSubmission::new(
                &mut self.session,
                &self.classifier,
                &self.reaper,
                Timing::immediate(),
                self.perf.clone(),
            );
            let result = protocol.run(prompt);
            (result, protocol.state())
        }

        fn events(&self) -> &[Event] {
            &self.session.backend().events
        }
    }

    /// No text may be injected unless the latest reading before it was INACTIVE
    fn assert_injection_only_when_idle(events: &[Event]) {
        let mut last = None;
        for event in events {
            match event {
                Event::Capture(state) => last = Some(*state),
                Event::CaptureFailed => last = None,
                Event::SetText(_) | Event::SendKeys(Keystroke::Enter) => {
                    assert_eq!(last, Some(Inactive), "injection after {:?}", last)
                }
                _ => {}
            }
        }
    }

    #[test]
    fn submits_once_and_harvests_after_second_idle() {
        let mut harness = Harness::new(FakeBackend {
            texts: vec!["  Hello  ".into(), "Hi! How can I help?\n".into()],
            ..FakeBackend::with_states(&[Busy, Busy, Inactive, Busy, Inactive])
        });

        let (result, state) = harness.run("Hello");
        assert_eq!(
            result.unwrap(),
            vec!["Hello".to_string(), "Hi! How can I help?".to_string()]
        );
        assert_eq!(state, ProtocolState::Done);

        let events = harness.events();
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::SetText(_))).count(),
            1
        );
        assert_injection_only_when_idle(events);

        // Harvest comes after the fifth reading, i.e. the second idle
        let captures: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Capture(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(captures, vec![Busy, Busy, Inactive, Busy, Inactive]);
        let last_capture = events.iter().rposition(|e| matches!(e, Event::Capture(_))).unwrap();
        let harvest = events
            .iter()
            .rposition(|e| *e == Event::Descendants(ControlType::Text))
            .unwrap();
        assert!(harvest > last_capture);
    }

    #[test]
    fn empty_prompt_fails_before_touching_the_window() {
        let mut harness = Harness::new(FakeBackend::default());
        let (result, state) = harness.run("");
        assert!(matches!(result, Err(BridgeError::EmptyPrompt)));
        assert_eq!(state, ProtocolState::Failed);
        assert!(harness.events().is_empty());
        assert_eq!(harness.session.backend().acquisitions(), 0);
    }

    #[test]
    fn ready_and_unknown_keep_waiting() {
        let mut harness = Harness::new(FakeBackend::with_states(&[
            Ready, Unknown, Ready, Inactive, Ready, Inactive,
        ]));
        let (result, _) = harness.run("go");
        assert!(result.is_ok());

        let events = harness.events();
        assert_injection_only_when_idle(events);
        let set_text = events.iter().position(|e| matches!(e, Event::SetText(_))).unwrap();
        let captures_before = events[..set_text]
            .iter()
            .filter(|e| matches!(e, Event::Capture(_)))
            .count();
        assert_eq!(captures_before, 4);
    }

    #[test]
    fn injection_never_follows_a_busy_reading_for_any_interleaving() {
        let patterns: [&[ActivityState]; 5] = [
            &[Inactive, Inactive],
            &[Busy, Inactive, Busy, Busy, Busy, Inactive],
            &[Unknown, Busy, Ready, Inactive, Ready, Unknown, Inactive],
            &[Ready, Ready, Ready, Inactive, Inactive],
            &[Busy, Unknown, Inactive, Unknown, Busy, Ready, Inactive],
        ];
        for states in patterns {
            let mut harness = Harness::new(FakeBackend::with_states(states));
            let (result, state) = harness.run("prompt");
            assert!(result.is_ok());
            assert_eq!(state, ProtocolState::Done);
            assert_injection_only_when_idle(harness.events());
        }
    }

    #[test]
    fn failed_capture_keeps_polling_without_injecting() {
        let mut harness = Harness::new(FakeBackend {
            failing_captures: 2,
            ..FakeBackend::with_states(&[Busy, Inactive, Inactive])
        });
        let (result, state) = harness.run("go");
        assert!(result.is_ok());
        assert_eq!(state, ProtocolState::Done);

        let events = harness.events();
        assert_injection_only_when_idle(events);
        let failed = events.iter().rposition(|e| *e == Event::CaptureFailed).unwrap();
        let set_text = events.iter().position(|e| matches!(e, Event::SetText(_))).unwrap();
        assert!(failed < set_text);
        assert!(events[failed..set_text].contains(&Event::Capture(Inactive)));
    }

    #[test]
    fn stale_indicator_rect_does_not_abort_the_wait() {
        let mut harness = Harness::new(FakeBackend {
            stale_rects: 1,
            ..FakeBackend::with_states(&[Busy, Inactive, Inactive])
        });
        let (result, state) = harness.run("go");
        assert!(result.is_ok());
        assert_eq!(state, ProtocolState::Done);
        assert_injection_only_when_idle(harness.events());
    }

    #[test]
    fn dialogs_are_cleared_while_waiting() {
        let mut harness = Harness::new(FakeBackend {
            dialogs: vec!["Continue".into()],
            ..FakeBackend::with_states(&[Busy, Inactive, Inactive])
        });
        let (result, _) = harness.run("go");
        assert!(result.is_ok());

        let events = harness.events();
        let click = events
            .iter()
            .position(|e| *e == Event::Click("Continue".into()))
            .unwrap();
        let set_text = events.iter().position(|e| matches!(e, Event::SetText(_))).unwrap();
        assert!(click < set_text);
    }

    #[test]
    fn missing_prompt_box_fails_without_retry() {
        let mut harness = Harness::new(FakeBackend {
            edits: 0,
            ..FakeBackend::with_states(&[Inactive])
        });
        let (result, state) = harness.run("Hello");
        assert!(matches!(result, Err(BridgeError::PromptBoxNotFound)));
        assert_eq!(state, ProtocolState::Failed);
        assert_eq!(
            harness.events().iter().filter(|e| matches!(e, Event::Capture(_))).count(),
            1
        );
    }

    #[test]
    fn last_edit_field_receives_the_prompt() {
        let mut harness = Harness::new(FakeBackend {
            edits: 3,
            ..FakeBackend::with_states(&[Inactive])
        });
        let (result, _) = harness.run("Hello");
        assert!(result.is_ok());
        assert!(harness.events().contains(&Event::SetText("Hello".into())));
        assert!(harness.events().contains(&Event::SendKeys(Keystroke::Enter)));
    }

    #[test]
    fn missing_indicator_stops_before_polling() {
        let mut harness = Harness::new(FakeBackend {
            indicator: false,
            ..FakeBackend::default()
        });
        let (result, state) = harness.run("Hello");
        assert!(matches!(result, Err(BridgeError::IndicatorNotFound)));
        assert_eq!(state, ProtocolState::Failed);

        let events = harness.events();
        assert!(!events.iter().any(|e| matches!(e, Event::Capture(_))));
        assert!(!events.iter().any(|e| matches!(e, Event::SetText(_))));
        assert_eq!(harness.session.backend().acquisitions(), 1);
    }

    #[test]
    fn traced_steps_are_timed() {
        let mut harness = Harness::new(FakeBackend::with_states(&[Inactive]));
        harness.run("Hello").0.unwrap();
        let functions: Vec<_> = harness.perf.records().iter().map(|r| r.function).collect();
        for expected in ["send_prompt", "await_idle", "submit", "harvest", "get_bezi_state"] {
            assert!(functions.contains(&expected), "missing {}", expected);
        }
    }
}
