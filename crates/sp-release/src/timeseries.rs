//! Piecewise-linear timeseries with flat extrapolation.
//!
//! Two instantiations are used: cumulative element counts
//! ([`ReleaseTimeseries`]) and source positions ([`PositionTimeseries`]).
//! Both share the sample times produced by
//! [`ReleaseSchedule::sample_times`](crate::ReleaseSchedule::sample_times).

use sp_core::{SimTime, WorldPoint};

/// Values that can be linearly interpolated between two samples.
pub trait Interpolate: Copy {
    fn interpolate(self, other: Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    #[inline]
    fn interpolate(self, other: f64, t: f64) -> f64 {
        self + (other - self) * t
    }
}

impl Interpolate for WorldPoint {
    #[inline]
    fn interpolate(self, other: WorldPoint, t: f64) -> WorldPoint {
        self.lerp(other, t)
    }
}

/// Ordered `(time, value)` samples.
///
/// Times are strictly increasing.  Evaluation before the first sample
/// returns the first value and after the last sample the last value.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeseries<V> {
    times: Vec<SimTime>,
    values: Vec<V>,
}

/// Number of elements that should exist at a given time.
pub type ReleaseTimeseries = Timeseries<f64>;

/// Source position (lon, lat, z) at a given time.
pub type PositionTimeseries = Timeseries<WorldPoint>;

impl<V: Interpolate> Timeseries<V> {
    /// Pair `times` with `values`.  Returns `None` if the lengths differ,
    /// the series is empty, or the times are not strictly increasing.
    pub fn new(times: Vec<SimTime>, values: Vec<V>) -> Option<Self> {
        if times.is_empty() || times.len() != values.len() {
            return None;
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }
        Some(Self { times, values })
    }

    pub fn times(&self) -> &[SimTime] {
        &self.times
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Value at `t`, interpolated between bracketing samples.
    pub fn at(&self, t: SimTime) -> V {
        let last = self.times.len() - 1;
        if t <= self.times[0] {
            return self.values[0];
        }
        if t >= self.times[last] {
            return self.values[last];
        }
        // First sample strictly after t; 1..=last by the checks above.
        let hi = self.times.partition_point(|&s| s <= t);
        let lo = hi - 1;
        let span = (self.times[hi] - self.times[lo]) as f64;
        let frac = (t - self.times[lo]) as f64 / span;
        self.values[lo].interpolate(self.values[hi], frac)
    }
}
