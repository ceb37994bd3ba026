//! `ContinuousPointsRelease`: a time-varying release from several fixed
//! points.
//!
//! Batches are dealt round-robin over the points, and the rotation carries
//! over between timesteps, so by the end of the release every point has
//! received `total / points` elements, give or take one.

use sp_core::{ReleaseRng, SimTime, WorldPoint};
use sp_elements::ElementData;

use crate::release::not_prepared;
use crate::schedule::{PreparedSchedule, ReleaseSchedule};
use crate::{Release, ReleaseError, ReleaseResult};

#[derive(Clone, Debug)]
pub struct ContinuousPointsRelease {
    schedule: ReleaseSchedule,
    points: Vec<WorldPoint>,
    prepared: Option<PreparedSchedule>,
    /// Point the next element goes to.
    next: usize,
}

impl ContinuousPointsRelease {
    /// # Errors
    ///
    /// [`ReleaseError::Configuration`] if `points` is empty.
    pub fn new(schedule: ReleaseSchedule, points: Vec<WorldPoint>) -> ReleaseResult<Self> {
        if points.is_empty() {
            return Err(ReleaseError::Configuration(
                "a continuous points release needs at least one point".into(),
            ));
        }
        Ok(Self {
            schedule,
            points,
            prepared: None,
            next: 0,
        })
    }

    pub fn schedule(&self) -> &ReleaseSchedule {
        &self.schedule
    }

    pub fn points(&self) -> &[WorldPoint] {
        &self.points
    }
}

impl Release for ContinuousPointsRelease {
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
        self.next = 0;
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
        _t: SimTime,
        _dt: u32,
        _rng: &mut ReleaseRng,
    ) -> ReleaseResult<()> {
        let mass = self
            .prepared
            .as_ref()
            .map(PreparedSchedule::mass_per_element)
            .ok_or_else(|| not_prepared("ContinuousPointsRelease"))?;

        let rows = data.tail(count)?;
        let n = self.points.len();
        for slot in &mut data.positions_mut()[rows.clone()] {
            *slot = self.points[self.next];
            self.next = (self.next + 1) % n;
        }
        data.fill_mass(rows, mass);
        Ok(())
    }
}
