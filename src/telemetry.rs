//! Scoped timing of component calls.
//!
//! A single [`PerfLog`] is created by `main`, shared with every component and
//! flushed once at process end. Each traced call holds a [`PerfScope`] guard,
//! so the duration is recorded on every exit path including `?` returns.
//! Guards keep their own `Rc` so holding one never borrows the component.

use std::cell::{Cell, RefCell};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const TIMINGS_FILE: &str = "debug_timings.csv";
const CSV_HEADER: &str = "timestamp,function,duration";

#[derive(Debug, Clone, PartialEq)]
pub struct TimingRecord {
    pub timestamp: String,
    pub function: &'static str,
    pub duration: Duration,
}

#[derive(Debug, Default)]
pub struct PerfLog {
    console: bool,
    depth: Cell<usize>,
    records: RefCell<Vec<TimingRecord>>,
}

impl PerfLog {
    /// `console` echoes the Entering/Exiting bracket of every scope at debug level
    pub fn new(console: bool) -> Self {
        Self {
            console,
            ..Self::default()
        }
    }

    pub fn scope(self: &Rc<Self>, function: &'static str) -> PerfScope {
        if self.console {
            debug!("{}Entering {}", indent(self.depth.get()), function);
        }
        self.depth.set(self.depth.get() + 1);
        PerfScope {
            log: Rc::clone(self),
            function,
            start: Instant::now(),
        }
    }

    fn finish(&self, function: &'static str, duration: Duration) {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        if self.console {
            debug!(
                "{}Exiting {} ({:.4}s)",
                indent(depth),
                function,
                duration.as_secs_f64()
            );
        }
        self.records.borrow_mut().push(TimingRecord {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            function,
            duration,
        });
    }

    pub fn records(&self) -> Vec<TimingRecord> {
        self.records.borrow().clone()
    }

    /// Append all records as CSV rows. The header is only written for a new file.
    pub fn save(&self, path: &Path) -> std::io::Result<usize> {
        let records = self.records();
        if records.is_empty() {
            return Ok(0);
        }

        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if is_new {
            writeln!(file, "{}", CSV_HEADER)?;
        }
        for record in records.iter() {
            writeln!(
                file,
                "{},{},{:.6}",
                record.timestamp,
                record.function,
                record.duration.as_secs_f64()
            )?;
        }
        Ok(records.len())
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Records the elapsed time of one traced call when dropped
pub struct PerfScope {
    log: Rc<PerfLog>,
    function: &'static str,
    start: Instant,
}

impl Drop for PerfScope {
    fn drop(&mut self) {
        self.log.finish(self.function, self.start.elapsed());
    }
}
