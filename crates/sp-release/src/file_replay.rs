//! `FileReplayRelease`: re-release the elements of a saved snapshot.
//!
//! Every element of the chosen record enters in the first active timestep;
//! later steps release nothing.  Arrays present in both the snapshot and
//! the live storage are copied into the new rows, the rest are ignored.

use std::path::Path;

use sp_core::{ReleaseRng, SimTime};
use sp_elements::{ArrayKind, Column, ElementData, INIT_MASS, MASS, POSITIONS};

use crate::release::not_prepared;
use crate::schedule::{PreparedSchedule, ReleaseSchedule, ScheduleBuilder};
use crate::snapshot::{ElementSnapshot, SnapshotSelector, read_snapshot_csv};
use crate::{Release, ReleaseError, ReleaseResult};

/// Instantaneous release replaying one [`ElementSnapshot`].
#[derive(Clone, Debug)]
pub struct FileReplayRelease {
    snapshot: ElementSnapshot,
    schedule: ReleaseSchedule,
    prepared: Option<PreparedSchedule>,
}

impl FileReplayRelease {
    /// Read the snapshot file at `path` and pick one record.
    ///
    /// `release_time` defaults to the record's own time.
    pub fn from_csv(
        path: impl AsRef<Path>,
        selector: SnapshotSelector,
        release_time: Option<SimTime>,
    ) -> ReleaseResult<Self> {
        let path = path.as_ref();
        let records = read_snapshot_csv(path)?;
        let snapshot = selector.select(&records).cloned().ok_or_else(|| {
            ReleaseError::Configuration(format!(
                "{selector:?} matches no record in {} ({} records)",
                path.display(),
                records.len()
            ))
        })?;
        Self::new(snapshot, release_time)
    }

    /// # Errors
    ///
    /// [`ReleaseError::Configuration`] if the snapshot has no elements.
    pub fn new(mut snapshot: ElementSnapshot, release_time: Option<SimTime>) -> ReleaseResult<Self> {
        if snapshot.is_empty() {
            return Err(ReleaseError::Configuration(format!(
                "snapshot at {} has no elements to replay",
                snapshot.time
            )));
        }
        if !snapshot.arrays.contains_key(INIT_MASS) {
            if let Some(mass) = snapshot.arrays.get(MASS).cloned() {
                snapshot.arrays.insert(INIT_MASS.to_owned(), mass);
            }
        }

        let schedule = ScheduleBuilder::new(release_time.unwrap_or(snapshot.time))
            .num_elements(snapshot.len())
            .release_mass(snapshot.total_mass())
            .build()?;

        Ok(Self {
            snapshot,
            schedule,
            prepared: None,
        })
    }

    pub fn snapshot(&self) -> &ElementSnapshot {
        &self.snapshot
    }

    pub fn schedule(&self) -> &ReleaseSchedule {
        &self.schedule
    }
}

impl Release for FileReplayRelease {
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
        _t: SimTime,
        _dt: u32,
        _rng: &mut ReleaseRng,
    ) -> ReleaseResult<()> {
        if self.prepared.is_none() {
            return Err(not_prepared("FileReplayRelease"));
        }
        if count != self.snapshot.len() {
            return Err(ReleaseError::Consistency(format!(
                "asked to replay {count} elements from a snapshot of {}",
                self.snapshot.len()
            )));
        }

        let rows = data.tail(count)?;
        data.positions_mut()[rows.clone()].copy_from_slice(&self.snapshot.positions);

        for (name, values) in &self.snapshot.arrays {
            if name == POSITIONS {
                continue;
            }
            let Some(mut column) = data.column_mut(name) else {
                continue;
            };
            match column.kind() {
                ArrayKind::Scalar => column.fill_from(name, rows.clone(), Column::Scalar(values))?,
                ArrayKind::Integer => {
                    let ints: Vec<i64> = values.iter().map(|&v| v.round() as i64).collect();
                    column.fill_from(name, rows.clone(), Column::Integer(&ints))?;
                }
                ArrayKind::Point => continue,
            }
        }
        Ok(())
    }
}
