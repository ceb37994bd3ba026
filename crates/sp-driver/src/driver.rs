//! The `ReleaseDriver` struct and its step loop.

use sp_core::{DriverConfig, ReleaseRng, SimClock, SimTime};
use sp_elements::{ColumnMut, ElementData};
use sp_release::Release;

use crate::{DriverError, DriverResult, StepObserver};

/// Integer array tagging each element with the index of its release.
pub const SPILL_NUM: &str = "spill_num";

// ── ReleaseDriver ─────────────────────────────────────────────────────────────

/// Owns the element storage and steps a list of releases through time.
///
/// Create via [`DriverBuilder`][crate::DriverBuilder].
pub struct ReleaseDriver {
    /// Start time, step length, step count and seed.
    pub config: DriverConfig,

    /// Tracks the current step and maps it to absolute time.
    pub clock: SimClock,

    /// Every element released so far.
    pub elements: ElementData,

    pub(crate) rng: ReleaseRng,
    pub(crate) releases: Vec<Box<dyn Release>>,
    /// Elements each release has appended this run.
    pub(crate) released: Vec<usize>,
    pub(crate) prepared: bool,
}

impl ReleaseDriver {
    // ── Public API ────────────────────────────────────────────────────────

    /// Prepare if needed, then run from the current step to
    /// `config.num_steps`.
    pub fn run<O: StepObserver>(&mut self, observer: &mut O) -> DriverResult<()> {
        self.prepare()?;
        while self.clock.current_step < self.config.num_steps {
            self.step(observer)?;
        }
        observer.on_run_end(self.clock.current_step);
        Ok(())
    }

    /// Run exactly `n` steps from the current position (ignores
    /// `num_steps`).
    pub fn run_steps<O: StepObserver>(&mut self, n: u64, observer: &mut O) -> DriverResult<()> {
        self.prepare()?;
        for _ in 0..n {
            self.step(observer)?;
        }
        Ok(())
    }

    /// Call `prepare_for_model_run` on every release.  A no-op once
    /// prepared; [`rewind`](Self::rewind) resets it.
    pub fn prepare(&mut self) -> DriverResult<()> {
        if self.prepared {
            return Ok(());
        }
        let time_step = self.config.time_step_secs;
        for (index, release) in self.releases.iter_mut().enumerate() {
            release
                .prepare_for_model_run(time_step)
                .map_err(|source| DriverError::Release { index, source })?;
        }
        self.prepared = true;
        tracing::debug!(
            target: "sp_driver",
            releases = self.releases.len(),
            time_step,
            "prepared releases"
        );
        Ok(())
    }

    /// Rewind every release, drop all elements, and return to step 0 with
    /// the configured seed.
    pub fn rewind(&mut self) {
        for release in &mut self.releases {
            release.rewind();
        }
        self.elements.clear();
        self.released.fill(0);
        self.clock.reset();
        self.rng = ReleaseRng::new(self.config.seed);
        self.prepared = false;
    }

    pub fn releases(&self) -> &[Box<dyn Release>] {
        &self.releases
    }

    /// Elements appended by each release so far, in release order.
    pub fn released_counts(&self) -> &[usize] {
        &self.released
    }

    /// Total mass of every release, in kilograms.
    pub fn total_release_mass(&self) -> f64 {
        self.releases.iter().map(|r| r.total_release_mass()).sum()
    }

    // ── Core step processing ──────────────────────────────────────────────

    fn step<O: StepObserver>(&mut self, observer: &mut O) -> DriverResult<()> {
        let step = self.clock.current_step;
        let now = self.clock.current_time();
        let dt = self.config.time_step_secs;
        observer.on_step_start(step, now);

        for index in 0..self.releases.len() {
            let count = self.release_one(index, now, dt)?;
            if count > 0 {
                observer.on_release(step, index, count);
            }
        }

        observer.on_step_end(step, now, &self.elements);
        self.clock.advance();
        Ok(())
    }

    fn release_one(&mut self, index: usize, now: SimTime, dt: u32) -> DriverResult<usize> {
        let release = &mut self.releases[index];
        let count = release.num_elements_to_release(now, dt, self.released[index]);
        if count == 0 {
            return Ok(0);
        }

        let rows = self.elements.append(count);
        release
            .initialize_elements(count, &mut self.elements, now, dt, &mut self.rng)
            .map_err(|source| DriverError::Release { index, source })?;
        if let Some(ColumnMut::Integer(tags)) = self.elements.column_mut(SPILL_NUM) {
            tags[rows].fill(index as i64);
        }
        self.released[index] += count;

        tracing::debug!(
            target: "sp_driver",
            release = index,
            count,
            total = self.elements.len(),
            time = %now,
            "released elements"
        );
        Ok(count)
    }
}
