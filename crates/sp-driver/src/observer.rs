//! Step observer trait for progress reporting and snapshot collection.

use std::path::Path;

use sp_core::SimTime;
use sp_elements::ElementData;
use sp_release::{ElementSnapshot, ReleaseResult, write_snapshot_csv};

/// Callbacks invoked by [`ReleaseDriver::run`][crate::ReleaseDriver::run]
/// at key points in the step loop.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example: progress printer
///
/// ```rust,ignore
/// struct Progress;
///
/// impl StepObserver for Progress {
///     fn on_step_end(&mut self, step: u64, time: SimTime, elements: &ElementData) {
///         println!("step {step} ({time}): {} elements", elements.len());
///     }
/// }
/// ```
pub trait StepObserver {
    /// Called at the start of each step, before any release runs.
    fn on_step_start(&mut self, _step: u64, _time: SimTime) {}

    /// Called after release `index` appended `count` elements (never 0).
    fn on_release(&mut self, _step: u64, _index: usize, _count: usize) {}

    /// Called at the end of each step with the full element state.
    fn on_step_end(&mut self, _step: u64, _time: SimTime, _elements: &ElementData) {}

    /// Called once after the final step.
    fn on_run_end(&mut self, _final_step: u64) {}
}

/// A [`StepObserver`] that does nothing.
pub struct NoopObserver;

impl StepObserver for NoopObserver {}

/// Captures an [`ElementSnapshot`] every `interval` steps and at the end of
/// the run.
#[derive(Debug, Default)]
pub struct SnapshotRecorder {
    interval: u64,
    records: Vec<ElementSnapshot>,
    /// Latest state not yet in `records`.
    pending: Option<ElementSnapshot>,
}

impl SnapshotRecorder {
    /// `interval == 0` records only the final state.
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn records(&self) -> &[ElementSnapshot] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ElementSnapshot> {
        self.records
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> ReleaseResult<()> {
        write_snapshot_csv(&self.records, path)
    }
}

impl StepObserver for SnapshotRecorder {
    fn on_step_end(&mut self, step: u64, time: SimTime, elements: &ElementData) {
        let snapshot = ElementSnapshot::from_elements(time, elements);
        if self.interval > 0 && step.is_multiple_of(self.interval) {
            self.records.push(snapshot);
            self.pending = None;
        } else {
            self.pending = Some(snapshot);
        }
    }

    fn on_run_end(&mut self, _final_step: u64) {
        if let Some(snapshot) = self.pending.take() {
            self.records.push(snapshot);
        }
    }
}
