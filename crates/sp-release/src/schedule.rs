//! Release schedules: *when* and *how many* elements enter the simulation.
//!
//! # Count model
//!
//! A schedule is fixed at construction.  [`ReleaseSchedule::prepare`] turns it
//! into a [`PreparedSchedule`] for a given timestep, holding the cumulative
//! count timeseries:
//!
//! ```text
//! steps       = max(1, ceil(duration / ts))
//! max_release = num_per_timestep × steps    (rate-based)
//!             = num_elements                (total-based)
//!
//! single step:  t = [rt, et (+1 s if instantaneous)]   n = [max, max]
//! otherwise:    t = [rt, rt+ts, …, et]                 n = trunc(linspace(0, max, steps+1))
//! ```
//!
//! The driver asks for `ceil(n(t + dt))` each step and releases the
//! difference from what already exists.

use sp_core::SimTime;

use crate::timeseries::ReleaseTimeseries;
use crate::{ReleaseError, ReleaseResult};

/// Element count used when a schedule specifies neither a total nor a rate.
pub const DEFAULT_NUM_ELEMENTS: usize = 1000;

// ── ElementCount ──────────────────────────────────────────────────────────────

/// How the number of released elements is specified.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementCount {
    /// A fixed total spread across the release duration.
    Total(usize),
    /// A fixed number per timestep for every release step.
    PerTimestep(usize),
}

// ── ReleaseSchedule ───────────────────────────────────────────────────────────

/// Validated release timing, element count, and mass.
///
/// Invariant: `end_release_time >= release_time`, `release_mass >= 0`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReleaseSchedule {
    release_time: SimTime,
    end_release_time: SimTime,
    count: ElementCount,
    release_mass: f64,
}

impl ReleaseSchedule {
    /// Start a [`ScheduleBuilder`] for a release beginning at `release_time`.
    pub fn builder(release_time: SimTime) -> ScheduleBuilder {
        ScheduleBuilder::new(release_time)
    }

    /// All `num_elements` at `release_time`, carrying no mass.
    pub fn instantaneous(release_time: SimTime, num_elements: usize) -> Self {
        Self {
            release_time,
            end_release_time: release_time,
            count: ElementCount::Total(num_elements),
            release_mass: 0.0,
        }
    }

    #[inline]
    pub fn release_time(&self) -> SimTime {
        self.release_time
    }

    #[inline]
    pub fn end_release_time(&self) -> SimTime {
        self.end_release_time
    }

    #[inline]
    pub fn count(&self) -> ElementCount {
        self.count
    }

    /// Total mass to release, in kilograms.
    #[inline]
    pub fn release_mass(&self) -> f64 {
        self.release_mass
    }

    /// The configured total, if the schedule is total-based.
    pub fn num_elements(&self) -> Option<usize> {
        match self.count {
            ElementCount::Total(n) => Some(n),
            ElementCount::PerTimestep(_) => None,
        }
    }

    /// The configured rate, if the schedule is rate-based.
    pub fn num_per_timestep(&self) -> Option<usize> {
        match self.count {
            ElementCount::PerTimestep(n) => Some(n),
            ElementCount::Total(_) => None,
        }
    }

    pub fn is_instantaneous(&self) -> bool {
        self.end_release_time == self.release_time
    }

    /// Seconds between start and end of the release (0 if instantaneous).
    pub fn release_duration(&self) -> i64 {
        self.end_release_time - self.release_time
    }

    /// Timesteps needed to cover the release, never less than one.
    pub fn num_release_time_steps(&self, time_step_secs: u32) -> u64 {
        (self.release_duration() as u64)
            .div_ceil(time_step_secs.max(1) as u64)
            .max(1)
    }

    /// Elements released per timestep.
    pub fn le_timestep_ratio(&self, time_step_secs: u32) -> f64 {
        match self.count {
            ElementCount::PerTimestep(n) => n as f64,
            ElementCount::Total(n) => n as f64 / self.num_release_time_steps(time_step_secs) as f64,
        }
    }

    /// Total number of elements the release will produce at this timestep.
    pub fn max_release(&self, time_step_secs: u32) -> usize {
        match self.count {
            ElementCount::PerTimestep(n) => n * self.num_release_time_steps(time_step_secs) as usize,
            ElementCount::Total(n) => n,
        }
    }

    /// Sample times of the count (and position) timeseries.
    pub fn sample_times(&self, time_step_secs: u32) -> Vec<SimTime> {
        let steps = self.num_release_time_steps(time_step_secs);
        if steps == 1 {
            let end = if self.is_instantaneous() {
                self.end_release_time + 1
            } else {
                self.end_release_time
            };
            return vec![self.release_time, end];
        }
        let mut times: Vec<SimTime> = (0..=steps)
            .map(|k| self.release_time + k as i64 * time_step_secs as i64)
            .collect();
        if let Some(last) = times.last_mut() {
            *last = self.end_release_time;
        }
        times
    }

    /// Build the cumulative count timeseries for `time_step_secs`.
    ///
    /// # Errors
    ///
    /// - [`ReleaseError::Configuration`] for a zero timestep.
    /// - [`ReleaseError::InsufficientElements`] if fewer than one element
    ///   would be released per step.
    pub fn prepare(&self, time_step_secs: u32) -> ReleaseResult<PreparedSchedule> {
        if time_step_secs == 0 {
            return Err(ReleaseError::Configuration("time step must be > 0 seconds".into()));
        }
        let steps = self.num_release_time_steps(time_step_secs);
        let ratio = self.le_timestep_ratio(time_step_secs);
        if ratio < 1.0 {
            return Err(ReleaseError::InsufficientElements { ratio, steps });
        }

        let max_release = self.max_release(time_step_secs);
        let times = self.sample_times(time_step_secs);
        let values: Vec<f64> = if steps == 1 {
            vec![max_release as f64; 2]
        } else {
            (0..=steps)
                .map(|k| (max_release as f64 * k as f64 / steps as f64).trunc())
                .collect()
        };
        let counts = ReleaseTimeseries::new(times, values).ok_or_else(|| {
            ReleaseError::Consistency("release sample times are not increasing".into())
        })?;

        tracing::debug!(
            target: "sp_release::schedule",
            steps,
            max_release,
            "prepared release schedule"
        );

        Ok(PreparedSchedule {
            release_time: self.release_time,
            time_step_secs,
            max_release,
            mass_per_element: self.release_mass / max_release as f64,
            counts,
        })
    }
}

// ── PreparedSchedule ──────────────────────────────────────────────────────────

/// Derived state of a schedule for one model run; dropped on rewind.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedSchedule {
    release_time: SimTime,
    time_step_secs: u32,
    max_release: usize,
    mass_per_element: f64,
    counts: ReleaseTimeseries,
}

impl PreparedSchedule {
    #[inline]
    pub fn max_release(&self) -> usize {
        self.max_release
    }

    #[inline]
    pub fn mass_per_element(&self) -> f64 {
        self.mass_per_element
    }

    #[inline]
    pub fn time_step_secs(&self) -> u32 {
        self.time_step_secs
    }

    pub fn counts(&self) -> &ReleaseTimeseries {
        &self.counts
    }

    /// Elements that should exist at `t + dt`; 0 while `t` precedes the
    /// release.
    pub fn num_elements_after_time(&self, t: SimTime, dt: u32) -> usize {
        if t < self.release_time {
            return 0;
        }
        self.counts.at(t + dt as i64).ceil() as usize
    }
}

// ── ScheduleBuilder ───────────────────────────────────────────────────────────

/// Fluent construction of a [`ReleaseSchedule`].
///
/// ```rust,ignore
/// let schedule = ScheduleBuilder::new(t0)
///     .end_release_time(t0 + 3_600)
///     .num_elements(10)
///     .release_mass(1_000.0)
///     .build()?;
/// ```
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleBuilder {
    release_time: Option<SimTime>,
    end_release_time: Option<SimTime>,
    num_elements: Option<usize>,
    num_per_timestep: Option<usize>,
    release_mass: f64,
}

impl ScheduleBuilder {
    pub fn new(release_time: SimTime) -> Self {
        Self {
            release_time: Some(release_time),
            ..Self::default()
        }
    }

    pub fn release_time(mut self, t: SimTime) -> Self {
        self.release_time = Some(t);
        self
    }

    /// Release start, if one has been set.
    pub fn get_release_time(&self) -> Option<SimTime> {
        self.release_time
    }

    /// Omit for an instantaneous release.
    pub fn end_release_time(mut self, t: SimTime) -> Self {
        self.end_release_time = Some(t);
        self
    }

    pub fn num_elements(mut self, n: usize) -> Self {
        self.num_elements = Some(n);
        self
    }

    pub fn num_per_timestep(mut self, n: usize) -> Self {
        self.num_per_timestep = Some(n);
        self
    }

    /// Kilograms; negative values are clamped to zero when built.
    pub fn release_mass(mut self, kg: f64) -> Self {
        self.release_mass = kg;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// - [`ReleaseError::Configuration`] if both `num_elements` and
    ///   `num_per_timestep` are set, or no release time was given.
    /// - [`ReleaseError::Validation`] if the end precedes the start.
    pub fn build(self) -> ReleaseResult<ReleaseSchedule> {
        let release_time = self
            .release_time
            .ok_or_else(|| ReleaseError::Configuration("release_time is required".into()))?;

        let count = match (self.num_elements, self.num_per_timestep) {
            (Some(_), Some(_)) => {
                return Err(ReleaseError::Configuration(
                    "num_elements and num_per_timestep are mutually exclusive".into(),
                ));
            }
            (Some(n), None) => ElementCount::Total(n),
            (None, Some(n)) => ElementCount::PerTimestep(n),
            (None, None) => ElementCount::Total(DEFAULT_NUM_ELEMENTS),
        };

        let end_release_time = self.end_release_time.unwrap_or(release_time);
        if end_release_time < release_time {
            return Err(ReleaseError::Validation(format!(
                "end_release_time {end_release_time} precedes release_time {release_time}"
            )));
        }

        let release_mass = if self.release_mass < 0.0 {
            tracing::warn!(
                target: "sp_release::schedule",
                release_mass = self.release_mass,
                "negative release mass clamped to 0"
            );
            0.0
        } else {
            self.release_mass
        };

        Ok(ReleaseSchedule {
            release_time,
            end_release_time,
            count,
            release_mass,
        })
    }
}
