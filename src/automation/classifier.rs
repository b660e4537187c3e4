use crate::automation::fingerprint::images_match;
use crate::telemetry::PerfLog;
use image::RgbImage;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use tracing::warn;

/// Looser than the matcher default to tolerate anti-aliasing and animation jitter
pub const CLASSIFY_THRESHOLD: f64 = 0.90;

pub const BUSY_REFERENCE: &str = "ref_busy.png";
pub const INACTIVE_REFERENCE: &str = "ref_ready.png";
pub const READY_REFERENCE: &str = "ref_ready_active.png";

/// What the state indicator icon currently shows. Never cached: it reflects the live UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    /// A prompt is being processed
    Busy,
    /// Idle; the only state in which a prompt may be submitted
    Inactive,
    /// Just finished, not yet confirmed idle
    Ready,
    Unknown,
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityState::Busy => "BUSY",
            ActivityState::Inactive => "INACTIVE",
            ActivityState::Ready => "READY",
            ActivityState::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Reference icons, one per known state. A missing slot never matches.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFingerprints {
    busy: Option<RgbImage>,
    inactive: Option<RgbImage>,
    ready: Option<RgbImage>,
}

impl ReferenceFingerprints {
    pub fn new(
        busy: Option<RgbImage>,
        inactive: Option<RgbImage>,
        ready: Option<RgbImage>,
    ) -> Self {
        Self {
            busy,
            inactive,
            ready,
        }
    }

    /// Load the three reference PNGs from `dir`. Unreadable files are logged and left empty.
    pub fn load(dir: &Path) -> Self {
        Self {
            busy: load_reference(&dir.join(BUSY_REFERENCE)),
            inactive: load_reference(&dir.join(INACTIVE_REFERENCE)),
            ready: load_reference(&dir.join(READY_REFERENCE)),
        }
    }

    pub fn loaded(&self) -> usize {
        [&self.busy, &self.inactive, &self.ready]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Slots in the order they are tested
    fn in_priority_order(&self) -> [(ActivityState, Option<&RgbImage>); 3] {
        [
            (ActivityState::Busy, self.busy.as_ref()),
            (ActivityState::Inactive, self.inactive.as_ref()),
            (ActivityState::Ready, self.ready.as_ref()),
        ]
    }
}

fn load_reference(path: &Path) -> Option<RgbImage> {
    match image::open(path) {
        Ok(img) => Some(img.to_rgb8()),
        Err(e) => {
            warn!(path = %path.display(), "Error loading reference image: {}", e);
            None
        }
    }
}

pub struct StateClassifier {
    references: ReferenceFingerprints,
    threshold: f64,
    perf: Rc<PerfLog>,
}

impl StateClassifier {
    pub fn new(references: ReferenceFingerprints, perf: Rc<PerfLog>) -> Self {
        Self {
            references,
            threshold: CLASSIFY_THRESHOLD,
            perf,
        }
    }

    /// BUSY is tested first so an in-progress state wins when a capture resembles several icons
    pub fn classify(&self, capture: &RgbImage) -> ActivityState {
        let _scope = self.perf.scope("get_button_state");
        for (state, reference) in self.references.in_priority_order() {
            if let Some(reference) = reference {
                let _match_scope = self.perf.scope("images_match");
                if images_match(reference, capture, self.threshold) {
                    return state;
                }
            }
        }
        ActivityState::Unknown
    }
}
