//! Element snapshots: the saved state a [`FileReplayRelease`] replays.
//!
//! # CSV format
//!
//! One row per element per record.  Rows of one record are contiguous and
//! share the `time` value; every numeric column after `z` is a named array.
//!
//! ```csv
//! time,lon,lat,z,init_mass,mass,spill_num
//! 2024-01-01T00:00:00,-70.1,41.2,0,10,10,0
//! 2024-01-01T00:00:00,-70.2,41.3,0,10,10,0
//! 2024-01-01T01:00:00,-70.1,41.2,0,10,9.5,0
//! ```
//!
//! [`FileReplayRelease`]: crate::FileReplayRelease

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{StringRecord, Writer};

use sp_core::{SimTime, WorldPoint};
use sp_elements::{Column, ElementData, MASS};

use crate::{ReleaseError, ReleaseResult};

const FIXED_COLUMNS: [&str; 4] = ["time", "lon", "lat", "z"];

// ── ElementSnapshot ───────────────────────────────────────────────────────────

/// Every element's position and numeric arrays at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementSnapshot {
    pub time: SimTime,
    pub positions: Vec<WorldPoint>,
    /// Scalar and integer arrays by name, integers widened to `f64`.
    pub arrays: BTreeMap<String, Vec<f64>>,
}

impl ElementSnapshot {
    /// Capture `data` at `time`.  Point-valued extra arrays are not saved.
    pub fn from_elements(time: SimTime, data: &ElementData) -> Self {
        let mut arrays = BTreeMap::new();
        for name in data.array_names() {
            let values = match data.column(name) {
                Some(Column::Scalar(v)) => v.to_vec(),
                Some(Column::Integer(v)) => v.iter().map(|&x| x as f64).collect(),
                Some(Column::Point(_)) | None => continue,
            };
            arrays.insert(name.to_owned(), values);
        }
        Self {
            time,
            positions: data.positions().to_vec(),
            arrays,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn array(&self, name: &str) -> Option<&[f64]> {
        self.arrays.get(name).map(Vec::as_slice)
    }

    /// Sum of the `mass` array; 0 if absent.
    pub fn total_mass(&self) -> f64 {
        self.array(MASS).map_or(0.0, |m| m.iter().sum())
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// Which record of a snapshot file to replay.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum SnapshotSelector {
    #[default]
    Last,
    /// Record index; negative counts from the end (`-1` is the last).
    Index(isize),
    /// The record closest in time; the earlier one on a tie.
    Time(SimTime),
}

impl SnapshotSelector {
    pub fn select<'a>(&self, records: &'a [ElementSnapshot]) -> Option<&'a ElementSnapshot> {
        match *self {
            SnapshotSelector::Last => records.last(),
            SnapshotSelector::Index(i) if i >= 0 => records.get(i as usize),
            SnapshotSelector::Index(i) => records
                .len()
                .checked_sub(i.unsigned_abs())
                .and_then(|j| records.get(j)),
            SnapshotSelector::Time(t) => records
                .iter()
                .min_by_key(|r| (r.time - t).unsigned_abs()),
        }
    }
}

// ── Writing ───────────────────────────────────────────────────────────────────

/// Write `records` to a CSV file at `path`.
///
/// # Errors
///
/// [`ReleaseError::Consistency`] if the records carry different array sets
/// or an array's length differs from the element count.
pub fn write_snapshot_csv(records: &[ElementSnapshot], path: impl AsRef<Path>) -> ReleaseResult<()> {
    write_snapshot_writer(records, File::create(path)?)
}

/// Like [`write_snapshot_csv`] but accepts any `Write` sink.
pub fn write_snapshot_writer<W: Write>(records: &[ElementSnapshot], sink: W) -> ReleaseResult<()> {
    let names: Vec<&str> = records
        .first()
        .map(|r| r.arrays.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let mut writer = Writer::from_writer(sink);
    writer.write_record(FIXED_COLUMNS.iter().copied().chain(names.iter().copied()))?;

    for record in records {
        if !record.arrays.keys().map(String::as_str).eq(names.iter().copied()) {
            return Err(ReleaseError::Consistency(format!(
                "snapshot at {} has a different array set",
                record.time
            )));
        }
        if let Some((name, _)) = record.arrays.iter().find(|(_, v)| v.len() != record.len()) {
            return Err(ReleaseError::Consistency(format!(
                "snapshot array {name:?} at {} does not match {} elements",
                record.time,
                record.len()
            )));
        }

        let time = record.time.to_string();
        for (i, pos) in record.positions.iter().enumerate() {
            let mut row = vec![time.clone(), pos.lon.to_string(), pos.lat.to_string(), pos.z.to_string()];
            row.extend(record.arrays.values().map(|v| v[i].to_string()));
            writer.write_record(&row)?;
        }
    }
    writer.flush()?;
    Ok(())
}

// ── Reading ───────────────────────────────────────────────────────────────────

/// Read every record from a snapshot CSV file.
pub fn read_snapshot_csv(path: impl AsRef<Path>) -> ReleaseResult<Vec<ElementSnapshot>> {
    read_snapshot_reader(File::open(path)?)
}

/// Like [`read_snapshot_csv`] but accepts any `Read` source.
///
/// # Errors
///
/// [`ReleaseError::Configuration`] if the header lacks `time`, `lon`, `lat`
/// or `z`, or a cell does not parse.
pub fn read_snapshot_reader<R: Read>(source: R) -> ReleaseResult<Vec<ElementSnapshot>> {
    let mut reader = csv::Reader::from_reader(source);
    let headers = reader.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ReleaseError::Configuration(format!("snapshot CSV has no {name:?} column")))
    };
    let [time_col, lon_col, lat_col, z_col] = [
        column("time")?,
        column("lon")?,
        column("lat")?,
        column("z")?,
    ];
    let array_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| ![time_col, lon_col, lat_col, z_col].contains(&i))
        .map(|(i, h)| (i, h.trim().to_owned()))
        .collect();

    let mut records: Vec<ElementSnapshot> = Vec::new();
    let mut current_time_text = String::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let time_text = cell(&row, time_col, line)?;
        if records.is_empty() || time_text != current_time_text {
            current_time_text = time_text.to_owned();
            records.push(ElementSnapshot {
                time: SimTime::parse_iso8601(time_text)?,
                positions: Vec::new(),
                arrays: array_cols.iter().map(|(_, n)| (n.clone(), Vec::new())).collect(),
            });
        }
        let Some(record) = records.last_mut() else {
            continue;
        };

        record.positions.push(WorldPoint::new(
            number(&row, lon_col, line)?,
            number(&row, lat_col, line)?,
            number(&row, z_col, line)?,
        ));
        for (col, name) in &array_cols {
            let value = number(&row, *col, line)?;
            if let Some(values) = record.arrays.get_mut(name) {
                values.push(value);
            }
        }
    }

    tracing::debug!(target: "sp_release::snapshot", records = records.len(), "read snapshot file");
    Ok(records)
}

fn cell(row: &StringRecord, col: usize, line: usize) -> ReleaseResult<&str> {
    row.get(col)
        .map(str::trim)
        .ok_or_else(|| ReleaseError::Configuration(format!("snapshot row {line} is missing column {col}")))
}

fn number(row: &StringRecord, col: usize, line: usize) -> ReleaseResult<f64> {
    let text = cell(row, col, line)?;
    text.parse().map_err(|_| {
        ReleaseError::Configuration(format!("snapshot row {line}: {text:?} is not a number"))
    })
}
