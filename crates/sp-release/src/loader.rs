//! Releases built from position lists: grids, splot files and position
//! CSVs.
//!
//! # Position CSV
//!
//! ```csv
//! lon,lat,z
//! -70.1,41.2,0
//! -70.2,41.3,5
//! ```
//!
//! # Splot file
//!
//! Whitespace-separated `lon lat count` rows.  Each position is released
//! `count` times at the surface.  Blank lines and `#` comments are skipped.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use sp_core::{SimTime, WorldPoint};

use crate::schedule::ScheduleBuilder;
use crate::scheduler::ReleaseScheduler;
use crate::{ReleaseError, ReleaseResult};

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PositionRecord {
    lon: f64,
    lat: f64,
    #[serde(default)]
    z: f64,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load custom release positions from a CSV file.
pub fn load_positions_csv(path: impl AsRef<Path>) -> ReleaseResult<Vec<WorldPoint>> {
    load_positions_reader(File::open(path)?)
}

/// Like [`load_positions_csv`] but accepts any `Read` source.
pub fn load_positions_reader<R: Read>(reader: R) -> ReleaseResult<Vec<WorldPoint>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut positions = Vec::new();
    for result in csv_reader.deserialize() {
        let row: PositionRecord = result?;
        positions.push(WorldPoint::new(row.lon, row.lat, row.z));
    }
    Ok(positions)
}

/// One element at each node of a `resolution × resolution` lon/lat mesh
/// spanning `bounds = ((min_lon, min_lat), (max_lon, max_lat))`.
///
/// # Errors
///
/// [`ReleaseError::Configuration`] if `resolution` is 0, and
/// [`ReleaseError::Validation`] if a minimum exceeds its maximum.
pub fn grid_release(
    release_time: SimTime,
    bounds: ((f64, f64), (f64, f64)),
    resolution: usize,
) -> ReleaseResult<ReleaseScheduler> {
    let ((min_lon, min_lat), (max_lon, max_lat)) = bounds;
    if resolution == 0 {
        return Err(ReleaseError::Configuration("grid resolution must be > 0".into()));
    }
    if min_lon > max_lon || min_lat > max_lat {
        return Err(ReleaseError::Validation(format!(
            "grid bounds are inverted: {bounds:?}"
        )));
    }

    let lons = linspace(min_lon, max_lon, resolution);
    let lats = linspace(min_lat, max_lat, resolution);
    let positions: Vec<WorldPoint> = lats
        .iter()
        .flat_map(|&lat| lons.iter().map(move |&lon| WorldPoint::surface(lon, lat)))
        .collect();

    let schedule = ScheduleBuilder::new(release_time)
        .num_elements(positions.len())
        .build()?;
    Ok(ReleaseScheduler::with_custom_positions(schedule, positions))
}

/// Release every splot of the file at `path` at `release_time`.
pub fn release_from_splot_data(
    release_time: SimTime,
    path: impl AsRef<Path>,
) -> ReleaseResult<ReleaseScheduler> {
    let mut text = String::new();
    File::open(path)?.read_to_string(&mut text)?;
    let positions = parse_splots(&text)?;
    if positions.is_empty() {
        return Err(ReleaseError::Configuration("splot file releases no elements".into()));
    }

    let schedule = ScheduleBuilder::new(release_time)
        .num_elements(positions.len())
        .build()?;
    Ok(ReleaseScheduler::with_custom_positions(schedule, positions))
}

/// Expand `lon lat count` rows into repeated surface positions.  Counts
/// are truncated to integers.
pub fn parse_splots(text: &str) -> ReleaseResult<Vec<WorldPoint>> {
    let mut positions = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bad = || ReleaseError::Configuration(format!("splot line {}: {line:?}", i + 1));

        let fields: Vec<f64> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| bad())?;
        let &[lon, lat, count] = fields.as_slice() else {
            return Err(bad());
        };
        if !(count >= 0.0) {
            return Err(bad());
        }
        positions.extend(std::iter::repeat_n(WorldPoint::surface(lon, lat), count as usize));
    }
    Ok(positions)
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}
