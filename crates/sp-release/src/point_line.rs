//! `PointLineRelease`: a point source, or a source moving along a line.
//!
//! The source position is a linear timeseries over the same samples as the
//! count timeseries, running from `start_position` at the release start to
//! `end_position` at its end.  Each timestep's batch is spread evenly along
//! the segment the source covers during `[t, t + dt]`.

use sp_core::{ReleaseRng, SimTime, WorldPoint};
use sp_elements::ElementData;

use crate::release::not_prepared;
use crate::schedule::{PreparedSchedule, ReleaseSchedule};
use crate::timeseries::PositionTimeseries;
use crate::{Release, ReleaseError, ReleaseResult};

#[derive(Clone, Debug)]
struct Prepared {
    schedule: PreparedSchedule,
    positions: PositionTimeseries,
}

/// Release from a fixed point or a moving point along a straight line.
#[derive(Clone, Debug)]
pub struct PointLineRelease {
    schedule: ReleaseSchedule,
    start_position: WorldPoint,
    end_position: Option<WorldPoint>,
    prepared: Option<Prepared>,
}

impl PointLineRelease {
    /// A point source at `position`.
    pub fn point(schedule: ReleaseSchedule, position: WorldPoint) -> Self {
        Self {
            schedule,
            start_position: position,
            end_position: None,
            prepared: None,
        }
    }

    /// A source moving from `start` to `end` over the release duration.
    pub fn line(schedule: ReleaseSchedule, start: WorldPoint, end: WorldPoint) -> Self {
        Self {
            schedule,
            start_position: start,
            end_position: Some(end),
            prepared: None,
        }
    }

    pub fn schedule(&self) -> &ReleaseSchedule {
        &self.schedule
    }

    pub fn start_position(&self) -> WorldPoint {
        self.start_position
    }

    /// End of the line; the start position for a point source.
    pub fn end_position(&self) -> WorldPoint {
        self.end_position.unwrap_or(self.start_position)
    }

    pub fn is_pointsource(&self) -> bool {
        self.end_position.is_none_or(|end| end == self.start_position)
    }

    /// Source position at `t`; `None` until prepared.
    pub fn position_at(&self, t: SimTime) -> Option<WorldPoint> {
        self.prepared.as_ref().map(|p| p.positions.at(t))
    }

    pub fn mass_per_element(&self) -> Option<f64> {
        self.prepared.as_ref().map(|p| p.schedule.mass_per_element())
    }
}

impl Release for PointLineRelease {
    fn release_time(&self) -> SimTime {
        self.schedule.release_time()
    }

    fn total_release_mass(&self) -> f64 {
        self.schedule.release_mass()
    }

    fn prepare_for_model_run(&mut self, time_step_secs: u32) -> ReleaseResult<()> {
        self.rewind();
        let schedule = self.schedule.prepare(time_step_secs)?;
        let times = schedule.counts().times().to_vec();
        let values: Vec<WorldPoint> = self
            .start_position
            .linspace(self.end_position(), times.len())
            .collect();
        let positions = PositionTimeseries::new(times, values).ok_or_else(|| {
            ReleaseError::Consistency("position samples do not match release samples".into())
        })?;
        self.prepared = Some(Prepared { schedule, positions });
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
            .map_or(0, |p| p.schedule.num_elements_after_time(t, dt))
    }

    fn initialize_elements(
        &mut self,
        count: usize,
        data: &mut ElementData,
        t: SimTime,
        dt: u32,
        _rng: &mut ReleaseRng,
    ) -> ReleaseResult<()> {
        let prepared = self.prepared.as_ref().ok_or_else(|| not_prepared("PointLineRelease"))?;
        // An instantaneous step still spans the source's first second.
        let dt = dt.max(1);
        let from = prepared.positions.at(t);
        let to = prepared.positions.at(t + dt as i64);

        let rows = data.tail(count)?;
        let slots = &mut data.positions_mut()[rows.clone()];
        for (slot, pos) in slots.iter_mut().zip(from.linspace(to, count)) {
            *slot = pos;
        }
        data.fill_mass(rows, prepared.schedule.mass_per_element());
        Ok(())
    }
}
