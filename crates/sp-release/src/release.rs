//! The `Release` trait: the contract between a release and the stepping
//! driver.

use sp_core::{ReleaseRng, SimTime};
use sp_elements::ElementData;

use crate::ReleaseResult;

/// A policy deciding when elements enter the simulation and where, with how
/// much mass.
///
/// # Lifecycle
///
/// 1. [`prepare_for_model_run`][Self::prepare_for_model_run] once per run.
///    Calling it again rewinds first.
/// 2. Each timestep, the driver asks
///    [`num_elements_to_release`][Self::num_elements_to_release], appends
///    that many rows to its [`ElementData`], and calls
///    [`initialize_elements`][Self::initialize_elements] to fill them.
/// 3. [`rewind`][Self::rewind] drops all derived state.
///
/// Releases are driven from one thread and own all their mutable state, so
/// no method needs interior mutability.
pub trait Release {
    /// Start of the release.
    fn release_time(&self) -> SimTime;

    /// Total mass the release distributes across its elements, in kilograms.
    fn total_release_mass(&self) -> f64;

    /// Build derived state (timeseries, triangulations) for `time_step_secs`.
    fn prepare_for_model_run(&mut self, time_step_secs: u32) -> ReleaseResult<()>;

    /// Drop derived state.  Safe to call repeatedly.
    fn rewind(&mut self);

    fn is_prepared(&self) -> bool;

    /// Elements that should exist at `t + dt`.  0 if unprepared.
    fn num_elements_after_time(&self, t: SimTime, dt: u32) -> usize;

    /// Elements to append during `[t, t + dt]` given `released` so far.
    ///
    /// Default: the growth of
    /// [`num_elements_after_time`][Self::num_elements_after_time] past
    /// `released`.
    fn num_elements_to_release(&self, t: SimTime, dt: u32, released: usize) -> usize {
        self.num_elements_after_time(t, dt).saturating_sub(released)
    }

    /// Fill the last `count` rows of `data`.
    fn initialize_elements(
        &mut self,
        count: usize,
        data: &mut ElementData,
        t: SimTime,
        dt: u32,
        rng: &mut ReleaseRng,
    ) -> ReleaseResult<()>;

    /// Register any release-specific arrays before the first step.
    ///
    /// Default: none.
    fn register_arrays(&self, _data: &mut ElementData) -> ReleaseResult<()> {
        Ok(())
    }
}

/// Error for lifecycle calls made before `prepare_for_model_run`.
pub(crate) fn not_prepared(kind: &str) -> crate::ReleaseError {
    crate::ReleaseError::Configuration(format!(
        "{kind} used before prepare_for_model_run"
    ))
}
