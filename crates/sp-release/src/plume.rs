//! `PlumeRelease`: continuous release along a vertical plume.
//!
//! The plume geometry comes from a [`PlumeGenerator`], which knows a fixed
//! set of 3-D release coordinates (one per depth bin) and how many elements
//! each bin has released by any instant.  A timestep releases the growth of
//! those cumulative counts over `[t, t + dt]`, replaying each coordinate
//! once per element.

use sp_core::{ReleaseRng, SimTime, WorldPoint};
use sp_elements::ElementData;

use crate::release::not_prepared;
use crate::schedule::ReleaseSchedule;
use crate::{Release, ReleaseError, ReleaseResult};

// ── PlumeGenerator ────────────────────────────────────────────────────────────

/// Source of plume release coordinates and per-bin element counts.
pub trait PlumeGenerator {
    /// Release coordinate of each bin.
    fn coords(&self) -> &[WorldPoint];

    /// Elements each bin has released by `t`; one entry per coordinate.
    ///
    /// Must be non-decreasing in `t`.
    fn cumulative_counts(&self, t: SimTime) -> Vec<usize>;

    /// Elements released in total once the plume is exhausted.
    fn total_elements(&self) -> usize;

    /// Elements released by each bin during `[start, end]`.
    fn elems_in_range(&self, start: SimTime, end: SimTime) -> Vec<usize> {
        let before = self.cumulative_counts(start);
        self.cumulative_counts(end)
            .into_iter()
            .zip(before)
            .map(|(after, before)| after.saturating_sub(before))
            .collect()
    }

    /// Coordinates of every element released during `[start, end]`, each
    /// bin's coordinate repeated once per element.
    fn elem_coords(&self, start: SimTime, end: SimTime) -> Vec<WorldPoint> {
        self.coords()
            .iter()
            .zip(self.elems_in_range(start, end))
            .flat_map(|(&c, n)| std::iter::repeat_n(c, n))
            .collect()
    }
}

// ── VerticalPlumeGenerator ────────────────────────────────────────────────────

/// A plume column above `position`, split into depth bins.
///
/// Each bin receives a fraction of the element total (apportioned by largest
/// remainder so the bins add up exactly) and releases it linearly in time
/// between the release start and end:
///
/// ```text
/// cumulative_i(t) = floor(total_i × clamp((t − start) / (end − start), 0, 1))
/// ```
#[derive(Clone, Debug)]
pub struct VerticalPlumeGenerator {
    start: SimTime,
    end: SimTime,
    coords: Vec<WorldPoint>,
    bin_totals: Vec<usize>,
}

impl VerticalPlumeGenerator {
    /// `bins` are `(depth_m, fraction)` pairs; fractions are normalised.
    ///
    /// # Errors
    ///
    /// [`ReleaseError::Configuration`] if there are no bins, or a fraction
    /// is negative or they sum to zero.
    pub fn new(
        start: SimTime,
        end: SimTime,
        position: WorldPoint,
        bins: &[(f64, f64)],
        num_elements: usize,
    ) -> ReleaseResult<Self> {
        if bins.is_empty() {
            return Err(ReleaseError::Configuration("plume needs at least one depth bin".into()));
        }
        if bins.iter().any(|&(_, f)| !(f >= 0.0)) {
            return Err(ReleaseError::Configuration("plume bin fractions must be >= 0".into()));
        }
        let total_fraction: f64 = bins.iter().map(|&(_, f)| f).sum();
        if !(total_fraction > 0.0) {
            return Err(ReleaseError::Configuration("plume bin fractions sum to zero".into()));
        }

        let coords = bins
            .iter()
            .map(|&(depth, _)| WorldPoint::new(position.lon, position.lat, depth))
            .collect();
        let shares: Vec<f64> = bins
            .iter()
            .map(|&(_, f)| f / total_fraction * num_elements as f64)
            .collect();

        Ok(Self {
            start,
            end,
            coords,
            bin_totals: largest_remainder(&shares, num_elements),
        })
    }

    pub fn bin_totals(&self) -> &[usize] {
        &self.bin_totals
    }

    /// Fraction of the plume released by `t`.  Nothing is out at `start`
    /// itself, so an instantaneous plume lands in the step that opens there.
    fn elapsed_fraction(&self, t: SimTime) -> f64 {
        if t <= self.start {
            return 0.0;
        }
        if self.end <= self.start || t >= self.end {
            return 1.0;
        }
        (t - self.start) as f64 / (self.end - self.start) as f64
    }
}

impl PlumeGenerator for VerticalPlumeGenerator {
    fn coords(&self) -> &[WorldPoint] {
        &self.coords
    }

    fn cumulative_counts(&self, t: SimTime) -> Vec<usize> {
        let frac = self.elapsed_fraction(t);
        self.bin_totals
            .iter()
            .map(|&n| (n as f64 * frac).floor() as usize)
            .collect()
    }

    fn total_elements(&self) -> usize {
        self.bin_totals.iter().sum()
    }
}

/// Round `shares` down to integers, then hand the leftover units to the
/// largest fractional parts so the result sums to `total`.
fn largest_remainder(shares: &[f64], total: usize) -> Vec<usize> {
    let mut counts: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = shares[a] - shares[a].floor();
        let rb = shares[b] - shares[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &i in order.iter().cycle().take(total.saturating_sub(assigned)) {
        counts[i] += 1;
    }
    counts
}

// ── PlumeRelease ──────────────────────────────────────────────────────────────

/// Release driven by a [`PlumeGenerator`].
#[derive(Clone, Debug)]
pub struct PlumeRelease<G = VerticalPlumeGenerator> {
    schedule: ReleaseSchedule,
    generator: G,
    mass_per_element: Option<f64>,
}

impl PlumeRelease<VerticalPlumeGenerator> {
    /// A vertical plume at `position` spanning the schedule's release
    /// window.
    ///
    /// # Errors
    ///
    /// [`ReleaseError::Configuration`] if the schedule is rate-based (a
    /// plume needs a total) or the bins are invalid.
    pub fn vertical(
        schedule: ReleaseSchedule,
        position: WorldPoint,
        bins: &[(f64, f64)],
    ) -> ReleaseResult<Self> {
        let total = schedule.num_elements().ok_or_else(|| {
            ReleaseError::Configuration("a plume release needs num_elements".into())
        })?;
        let generator = VerticalPlumeGenerator::new(
            schedule.release_time(),
            schedule.end_release_time(),
            position,
            bins,
            total,
        )?;
        Ok(Self::new(schedule, generator))
    }
}

impl<G: PlumeGenerator> PlumeRelease<G> {
    pub fn new(schedule: ReleaseSchedule, generator: G) -> Self {
        Self {
            schedule,
            generator,
            mass_per_element: None,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn schedule(&self) -> &ReleaseSchedule {
        &self.schedule
    }
}

impl<G: PlumeGenerator> Release for PlumeRelease<G> {
    fn release_time(&self) -> SimTime {
        self.schedule.release_time()
    }

    fn total_release_mass(&self) -> f64 {
        self.schedule.release_mass()
    }

    fn prepare_for_model_run(&mut self, time_step_secs: u32) -> ReleaseResult<()> {
        if time_step_secs == 0 {
            return Err(ReleaseError::Configuration("time step must be > 0 seconds".into()));
        }
        let total = self.generator.total_elements();
        if total == 0 {
            return Err(ReleaseError::InsufficientElements { ratio: 0.0, steps: 1 });
        }
        self.mass_per_element = Some(self.schedule.release_mass() / total as f64);
        Ok(())
    }

    fn rewind(&mut self) {
        self.mass_per_element = None;
    }

    fn is_prepared(&self) -> bool {
        self.mass_per_element.is_some()
    }

    fn num_elements_after_time(&self, t: SimTime, dt: u32) -> usize {
        if !self.is_prepared() {
            return 0;
        }
        self.generator.cumulative_counts(t + dt as i64).iter().sum()
    }

    /// Count of elements the generator yields within `[t, t + dt]`.
    fn num_elements_to_release(&self, t: SimTime, dt: u32, _released: usize) -> usize {
        if !self.is_prepared() {
            return 0;
        }
        self.generator.elems_in_range(t, t + dt as i64).iter().sum()
    }

    fn initialize_elements(
        &mut self,
        count: usize,
        data: &mut ElementData,
        t: SimTime,
        dt: u32,
        _rng: &mut ReleaseRng,
    ) -> ReleaseResult<()> {
        let mass = self
            .mass_per_element
            .ok_or_else(|| not_prepared("PlumeRelease"))?;
        let coords = self.generator.elem_coords(t, t + dt as i64);
        if coords.len() != count {
            return Err(ReleaseError::Consistency(format!(
                "plume generator produced {} coordinates for {count} new elements",
                coords.len()
            )));
        }
        let rows = data.tail(count)?;
        data.positions_mut()[rows.clone()].copy_from_slice(&coords);
        data.fill_mass(rows, mass);
        Ok(())
    }
}
