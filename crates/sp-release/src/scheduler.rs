//! `ReleaseScheduler`: the base release.
//!
//! Owns a [`ReleaseSchedule`] and places elements at a fixed list of custom
//! positions.  Other releases reuse its count bookkeeping through
//! [`PreparedSchedule`] and differ only in where elements go.

use sp_core::{ReleaseRng, SimTime, WorldPoint};
use sp_elements::ElementData;

use crate::release::not_prepared;
use crate::schedule::{PreparedSchedule, ReleaseSchedule};
use crate::{Release, ReleaseError, ReleaseResult};

/// Release from a fixed set of positions on a time schedule.
#[derive(Clone, Debug)]
pub struct ReleaseScheduler {
    schedule: ReleaseSchedule,
    custom_positions: Vec<WorldPoint>,
    prepared: Option<PreparedSchedule>,
}

impl ReleaseScheduler {
    /// A scheduler with no positions; useful only for count queries until
    /// positions are supplied.
    pub fn new(schedule: ReleaseSchedule) -> Self {
        Self {
            schedule,
            custom_positions: Vec::new(),
            prepared: None,
        }
    }

    pub fn with_custom_positions(schedule: ReleaseSchedule, positions: Vec<WorldPoint>) -> Self {
        Self {
            schedule,
            custom_positions: positions,
            prepared: None,
        }
    }

    pub fn schedule(&self) -> &ReleaseSchedule {
        &self.schedule
    }

    pub fn custom_positions(&self) -> &[WorldPoint] {
        &self.custom_positions
    }

    pub fn release_duration(&self) -> i64 {
        self.schedule.release_duration()
    }

    pub fn num_release_time_steps(&self, time_step_secs: u32) -> u64 {
        self.schedule.num_release_time_steps(time_step_secs)
    }

    pub fn le_timestep_ratio(&self, time_step_secs: u32) -> f64 {
        self.schedule.le_timestep_ratio(time_step_secs)
    }

    /// Total elements for this run; `None` until prepared.
    pub fn max_release(&self) -> Option<usize> {
        self.prepared.as_ref().map(PreparedSchedule::max_release)
    }

    /// Mass given to each element; `None` until prepared.
    pub fn mass_per_element(&self) -> Option<f64> {
        self.prepared.as_ref().map(PreparedSchedule::mass_per_element)
    }
}

impl Release for ReleaseScheduler {
    fn release_time(&self) -> SimTime {
        self.schedule.release_time()
    }

    fn total_release_mass(&self) -> f64 {
        self.schedule.release_mass()
    }

    fn prepare_for_model_run(&mut self, time_step_secs: u32) -> ReleaseResult<()> {
        self.rewind();
        self.prepared = Some(self.schedule.prepare(time_step_secs)?);
        Ok(())
    }

    fn rewind(&mut self) {
        self.prepared = None;
    }

    fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    fn num_elements_after_time(&self, t: SimTime, dt: u32) -> usize {
        self.prepared
            .as_ref()
            .map_or(0, |p| p.num_elements_after_time(t, dt))
    }

    fn initialize_elements(
        &mut self,
        count: usize,
        data: &mut ElementData,
        t: SimTime,
        _dt: u32,
        rng: &mut ReleaseRng,
    ) -> ReleaseResult<()> {
        let prepared = self.prepared.as_ref().ok_or_else(|| not_prepared("ReleaseScheduler"))?;
        if self.custom_positions.is_empty() {
            return Err(ReleaseError::Configuration(
                "no positions to release elements from".into(),
            ));
        }
        if count < self.custom_positions.len() {
            tracing::warn!(
                target: "sp_release::scheduler",
                count,
                positions = self.custom_positions.len(),
                time = %t,
                "releasing fewer elements than start positions"
            );
        }

        let rows = data.tail(count)?;
        tile_positions(&self.custom_positions, &mut data.positions_mut()[rows.clone()], rng);
        data.fill_mass(rows, prepared.mass_per_element());
        Ok(())
    }
}

/// Fill `out` with whole passes over `positions`, then draw the remainder
/// uniformly at random.  `positions` must be non-empty.
pub(crate) fn tile_positions(positions: &[WorldPoint], out: &mut [WorldPoint], rng: &mut ReleaseRng) {
    let n = positions.len();
    let full = out.len() / n * n;
    for (slot, pos) in out[..full].iter_mut().zip(positions.iter().cycle()) {
        *slot = *pos;
    }
    for slot in &mut out[full..] {
        *slot = positions[rng.index(n)];
    }
}
