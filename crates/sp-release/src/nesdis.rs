//! `NesdisRelease`: spatial release from a NESDIS satellite oil analysis.
//!
//! # Input product
//!
//! A zipped shapefile in Web Mercator (EPSG:3857) whose polygons carry:
//!
//! | Attribute | Meaning                                            |
//! |-----------|----------------------------------------------------|
//! | `OILTYPE` | `Thin` or `Thick` classification                   |
//! | `DATE`    | image capture date, `MM/DD/YYYY`                   |
//! | `TIME`    | image capture time; non-digits stripped → `HHMM`   |
//!
//! Ingestion reprojects to lon/lat, stores the capture instant on each
//! feature as `release_time` (ISO-8601) and maps `OILTYPE` to a
//! `thickness`, so the underlying [`SpatialRelease`] weights polygons by
//! oil volume.

use std::path::Path;

use serde_json::Value;

use sp_core::{ReleaseRng, SimTime};
use sp_elements::ElementData;
use sp_geometry::{Crs, FeatureCollection, load_shapefile};

use crate::spatial::{SpatialRelease, SpatialReleaseBuilder, THICKNESS};
use crate::{Release, ReleaseError, ReleaseResult, ScheduleBuilder};

/// Thickness assigned to polygons classified `Thin`, in metres.
pub const THIN_OIL_THICKNESS_M: f64 = 5e-6;
/// Thickness assigned to every other polygon, in metres.
pub const THICK_OIL_THICKNESS_M: f64 = 200e-6;

/// Feature property holding the parsed capture instant.
pub const RELEASE_TIME: &str = "release_time";

const OILTYPE: &str = "OILTYPE";
const DATE: &str = "DATE";
const TIME: &str = "TIME";

/// Per-feature weights and thicknesses, as saved alongside the polygons.
#[derive(Clone, Debug, PartialEq)]
pub struct NesdisMetadata {
    pub weights: Option<Vec<f64>>,
    pub thicknesses: Option<Vec<f64>>,
}

/// A [`SpatialRelease`] built from a NESDIS product.
#[derive(Clone, Debug)]
pub struct NesdisRelease {
    inner: SpatialRelease,
}

impl NesdisRelease {
    /// Load a NESDIS bundle from `path`.
    pub fn load(path: impl AsRef<Path>, schedule: ScheduleBuilder) -> ReleaseResult<Self> {
        Self::from_builder(SpatialReleaseBuilder::new(schedule).shapefile(path))
    }

    /// Build from a spatial builder holding either a shapefile path or an
    /// already-ingested feature collection.
    ///
    /// Polygons, weights and thicknesses on the builder are ignored with a
    /// warning; they are always derived from the product's attributes.  The
    /// release time comes from the first feature's capture time, falling
    /// back to the builder's release time.
    pub fn from_builder(builder: SpatialReleaseBuilder) -> ReleaseResult<Self> {
        for (name, given) in [
            ("polygons", builder.polygons.is_some()),
            ("weights", builder.weights.is_some()),
            ("thicknesses", builder.thicknesses.is_some()),
        ] {
            if given {
                tracing::warn!(target: "sp_release::nesdis", argument = name, "ignored by NESDIS release");
            }
        }

        let features = match (builder.filename, builder.features) {
            (Some(_), Some(_)) => {
                return Err(ReleaseError::Configuration(
                    "a NESDIS release takes a shapefile or a feature collection, not both".into(),
                ));
            }
            (Some(path), None) => load_nesdis(&path)?,
            (None, Some(fc)) => fc,
            (None, None) => {
                return Err(ReleaseError::Configuration(
                    "a NESDIS release needs a shapefile or a feature collection".into(),
                ));
            }
        };

        let first_time = features
            .features
            .first()
            .and_then(|f| f.property_str(RELEASE_TIME))
            .map(SimTime::parse_iso8601)
            .transpose()?;
        let schedule = match first_time {
            Some(t) => builder.schedule.release_time(t),
            None if builder.schedule.get_release_time().is_some() => builder.schedule,
            None => {
                return Err(ReleaseError::Configuration(
                    "no capture time in the NESDIS product and no release_time given".into(),
                ));
            }
        };

        let inner = SpatialRelease::new(schedule.build()?, features)?;
        Ok(Self { inner })
    }

    pub fn spatial(&self) -> &SpatialRelease {
        &self.inner
    }

    pub fn features(&self) -> &FeatureCollection {
        self.inner.features()
    }

    /// Geodesic area of each record in m².
    pub fn record_areas(&self) -> ReleaseResult<Vec<f64>> {
        self.inner.areas()
    }

    /// The raw `OILTYPE` of each record (empty if absent).
    pub fn oil_types(&self) -> Vec<String> {
        self.inner
            .features()
            .iter()
            .map(|f| f.property_str(OILTYPE).unwrap_or_default().to_owned())
            .collect()
    }

    pub fn metadata(&self) -> NesdisMetadata {
        NesdisMetadata {
            weights: self.inner.weights(),
            thicknesses: self.inner.thicknesses(),
        }
    }
}

impl Release for NesdisRelease {
    fn release_time(&self) -> SimTime {
        self.inner.release_time()
    }

    fn total_release_mass(&self) -> f64 {
        self.inner.total_release_mass()
    }

    fn prepare_for_model_run(&mut self, time_step_secs: u32) -> ReleaseResult<()> {
        self.inner.prepare_for_model_run(time_step_secs)
    }

    fn rewind(&mut self) {
        self.inner.rewind();
    }

    fn is_prepared(&self) -> bool {
        self.inner.is_prepared()
    }

    fn num_elements_after_time(&self, t: SimTime, dt: u32) -> usize {
        self.inner.num_elements_after_time(t, dt)
    }

    fn initialize_elements(
        &mut self,
        count: usize,
        data: &mut ElementData,
        t: SimTime,
        dt: u32,
        rng: &mut ReleaseRng,
    ) -> ReleaseResult<()> {
        self.inner.initialize_elements(count, data, t, dt, rng)
    }
}

// ── Ingestion ─────────────────────────────────────────────────────────────────

/// Read a NESDIS bundle into lon/lat features with `release_time` and
/// `thickness` properties.
pub fn load_nesdis(path: impl AsRef<Path>) -> ReleaseResult<FeatureCollection> {
    let mut fc = load_shapefile(path)?.into_geographic(Crs::WebMercator)?;

    for (i, feature) in fc.features.iter_mut().enumerate() {
        let date = feature.property(DATE).map(attribute_text).unwrap_or_default();
        let time = feature.property(TIME).map(attribute_text).unwrap_or_default();
        match parse_capture_time(&date, &time) {
            Some(t) => feature.set_property(RELEASE_TIME, t.to_string()),
            None => tracing::warn!(
                target: "sp_release::nesdis",
                record = i,
                date = %date,
                time = %time,
                "could not parse shapefile capture time"
            ),
        }

        let oil_type = feature.property_str(OILTYPE).ok_or_else(|| {
            ReleaseError::Configuration(format!("record {i} has no {OILTYPE} attribute"))
        })?;
        let thickness = if oil_type.eq_ignore_ascii_case("thin") {
            THIN_OIL_THICKNESS_M
        } else {
            THICK_OIL_THICKNESS_M
        };
        feature.set_property(THICKNESS, thickness);
    }
    Ok(fc)
}

/// dBASE columns may decode as text or numbers depending on field type.
fn attribute_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `MM/DD/YYYY` plus a time whose digits read `HHMM` (or `HMM`).
pub fn parse_capture_time(date: &str, time: &str) -> Option<SimTime> {
    let mut parts = date.trim().split('/');
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let digits: String = time.chars().filter(char::is_ascii_digit).collect();
    if !(3..=4).contains(&digits.len()) {
        return None;
    }
    let (h, m) = digits.split_at(digits.len() - 2);
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;

    SimTime::from_civil(year, month, day, hour, minute, 0).ok()
}
