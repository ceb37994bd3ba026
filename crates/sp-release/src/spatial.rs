//! `SpatialRelease`: elements placed at random inside a set of polygons.
//!
//! # Placement model
//!
//! Each polygon (a multipolygon, possibly with holes) gets a weight:
//!
//! 1. if any feature carries a `thickness`, weight ∝ area × thickness;
//! 2. otherwise explicit per-feature `weight`s, when every feature has one;
//! 3. otherwise weight ∝ area.
//!
//! `prepare_for_model_run` triangulates every polygon and splits its weight
//! across its triangles in proportion to their geodesic area.  Each new
//! element picks a triangle by categorical sampling on those weights and a
//! uniform point inside it (z = 0).
//!
//! The polygon set is stored as a GeoJSON [`FeatureCollection`]; weights
//! and thicknesses live in the feature properties.

use std::path::{Path, PathBuf};

use rand::distributions::{Distribution, WeightedIndex};

use sp_core::{ReleaseRng, SimTime, WorldPoint};
use sp_elements::ElementData;
use sp_geometry::area::{multipolygon_area, triangle_area};
use sp_geometry::{Crs, Feature, FeatureCollection, MultiPolygon, Triangle, load_shapefile, triangulate};

use crate::release::not_prepared;
use crate::schedule::{PreparedSchedule, ReleaseSchedule, ScheduleBuilder};
use crate::{Release, ReleaseError, ReleaseResult};

/// Feature property holding an explicit sampling weight.
pub const WEIGHT: &str = "weight";
/// Feature property holding an oil thickness in metres.
pub const THICKNESS: &str = "thickness";

/// Tolerance on weights that must sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

// ── Builder ───────────────────────────────────────────────────────────────────

/// Collects the mutually exclusive polygon sources of a [`SpatialRelease`].
///
/// Exactly one of [`shapefile`](Self::shapefile),
/// [`features`](Self::features) or [`polygons`](Self::polygons) must be
/// given; explicit `weights` and `thicknesses` only combine with
/// `polygons`, and never with each other.
#[derive(Clone, Debug, Default)]
pub struct SpatialReleaseBuilder {
    pub(crate) schedule: ScheduleBuilder,
    pub(crate) filename: Option<PathBuf>,
    pub(crate) features: Option<FeatureCollection>,
    pub(crate) polygons: Option<Vec<MultiPolygon>>,
    pub(crate) weights: Option<Vec<f64>>,
    pub(crate) thicknesses: Option<Vec<f64>>,
}

impl SpatialReleaseBuilder {
    pub fn new(schedule: ScheduleBuilder) -> Self {
        Self {
            schedule,
            ..Self::default()
        }
    }

    /// A zipped shapefile bundle (or loose `.shp`) in lon/lat.
    pub fn shapefile(mut self, path: impl AsRef<Path>) -> Self {
        self.filename = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn features(mut self, fc: FeatureCollection) -> Self {
        self.features = Some(fc);
        self
    }

    pub fn polygons(mut self, polygons: Vec<MultiPolygon>) -> Self {
        self.polygons = Some(polygons);
        self
    }

    /// One weight per polygon, summing to 1.
    pub fn weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// One thickness (m) per polygon; weights become area × thickness.
    pub fn thicknesses(mut self, thicknesses: Vec<f64>) -> Self {
        self.thicknesses = Some(thicknesses);
        self
    }

    /// Validate the sources and build.
    ///
    /// # Errors
    ///
    /// - [`ReleaseError::Configuration`] for conflicting or missing sources,
    ///   weights combined with thicknesses, or length mismatches.
    /// - [`ReleaseError::Validation`] if explicit weights do not sum to 1.
    pub fn build(self) -> ReleaseResult<SpatialRelease> {
        let schedule = self.schedule.build()?;
        let features = match (self.filename, self.features, self.polygons) {
            (Some(path), None, None) => {
                reject_attributes(&self.weights, &self.thicknesses, "a shapefile")?;
                load_shapefile(&path)?.into_geographic(Crs::Geographic)?
            }
            (None, Some(fc), None) => {
                reject_attributes(&self.weights, &self.thicknesses, "a feature collection")?;
                fc
            }
            (None, None, Some(polys)) => features_from_polygons(polys, self.weights, self.thicknesses)?,
            (None, None, None) => {
                return Err(ReleaseError::Configuration(
                    "a spatial release needs a shapefile, a feature collection, or polygons".into(),
                ));
            }
            _ => {
                return Err(ReleaseError::Configuration(
                    "shapefile, feature collection and polygons are mutually exclusive".into(),
                ));
            }
        };
        SpatialRelease::new(schedule, features)
    }
}

fn reject_attributes(
    weights: &Option<Vec<f64>>,
    thicknesses: &Option<Vec<f64>>,
    source: &str,
) -> ReleaseResult<()> {
    if weights.is_some() || thicknesses.is_some() {
        return Err(ReleaseError::Configuration(format!(
            "weights and thicknesses are read from {source}, not passed separately"
        )));
    }
    Ok(())
}

fn features_from_polygons(
    polygons: Vec<MultiPolygon>,
    weights: Option<Vec<f64>>,
    thicknesses: Option<Vec<f64>>,
) -> ReleaseResult<FeatureCollection> {
    if weights.is_some() && thicknesses.is_some() {
        return Err(ReleaseError::Configuration(
            "weights and thicknesses are mutually exclusive".into(),
        ));
    }
    let (name, values) = match (weights, thicknesses) {
        (Some(w), _) => (WEIGHT, Some(w)),
        (_, Some(t)) => (THICKNESS, Some(t)),
        _ => (WEIGHT, None),
    };
    if let Some(values) = &values {
        if values.len() != polygons.len() {
            return Err(ReleaseError::Configuration(format!(
                "{} {name} values for {} polygons",
                values.len(),
                polygons.len()
            )));
        }
    }

    Ok(polygons
        .iter()
        .enumerate()
        .map(|(i, mp)| {
            let feature = Feature::from_multipolygon(mp);
            match &values {
                Some(v) => feature.with_property(name, v[i]),
                None => feature,
            }
        })
        .collect())
}

// ── SpatialRelease ────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Prepared {
    schedule: PreparedSchedule,
    triangles: Vec<Triangle>,
    weights: Vec<f64>,
    sampler: WeightedIndex<f64>,
}

/// Release into a weighted set of polygons.
#[derive(Clone, Debug)]
pub struct SpatialRelease {
    schedule: ReleaseSchedule,
    features: FeatureCollection,
    prepared: Option<Prepared>,
}

impl SpatialRelease {
    pub fn builder(schedule: ScheduleBuilder) -> SpatialReleaseBuilder {
        SpatialReleaseBuilder::new(schedule)
    }

    /// Wrap a feature collection, checking explicit weights.
    ///
    /// # Errors
    ///
    /// [`ReleaseError::Validation`] if every feature carries a weight and
    /// the weights do not sum to 1.
    pub fn new(schedule: ReleaseSchedule, features: FeatureCollection) -> ReleaseResult<Self> {
        if features.is_empty() {
            return Err(ReleaseError::Configuration("spatial release has no polygons".into()));
        }
        let release = Self {
            schedule,
            features,
            prepared: None,
        };
        if let Some(weights) = release.weights() {
            let sum: f64 = weights.iter().sum();
            if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
                return Err(ReleaseError::Validation(format!(
                    "polygon weights sum to {sum}, expected 1"
                )));
            }
        }
        Ok(release)
    }

    /// Parse a GeoJSON feature collection.
    pub fn from_geojson_str(schedule: ReleaseSchedule, text: &str) -> ReleaseResult<Self> {
        Self::new(schedule, FeatureCollection::from_json_str(text)?)
    }

    pub fn to_geojson_string(&self) -> ReleaseResult<String> {
        Ok(self.features.to_json_string()?)
    }

    pub fn schedule(&self) -> &ReleaseSchedule {
        &self.schedule
    }

    pub fn features(&self) -> &FeatureCollection {
        &self.features
    }

    pub fn polygons(&self) -> ReleaseResult<Vec<MultiPolygon>> {
        Ok(self.features.multipolygons()?)
    }

    /// Geodesic area of each polygon in m².
    pub fn areas(&self) -> ReleaseResult<Vec<f64>> {
        Ok(self.polygons()?.iter().map(multipolygon_area).collect())
    }

    /// Explicit weights, when every feature carries one.
    pub fn weights(&self) -> Option<Vec<f64>> {
        self.property_column(WEIGHT)
    }

    /// Thicknesses, when every feature carries one.
    pub fn thicknesses(&self) -> Option<Vec<f64>> {
        self.property_column(THICKNESS)
    }

    fn property_column(&self, name: &str) -> Option<Vec<f64>> {
        self.features.iter().map(|f| f.property_f64(name)).collect()
    }

    /// Normalised triangle weights; `None` until prepared.
    pub fn triangle_weights(&self) -> Option<&[f64]> {
        self.prepared.as_ref().map(|p| p.weights.as_slice())
    }

    pub fn triangles(&self) -> Option<&[Triangle]> {
        self.prepared.as_ref().map(|p| p.triangles.as_slice())
    }

    /// Exterior rings of every polygon part, for drawing.
    ///
    /// Returns per-ring vertex counts and the closed rings themselves as
    /// `f32` pairs.  Multipolygons are flattened into their parts, in
    /// feature order.
    pub fn get_polygons(&self) -> ReleaseResult<(Vec<i32>, Vec<Vec<[f32; 2]>>)> {
        let rings: Vec<Vec<[f32; 2]>> = self
            .polygons()?
            .iter()
            .flat_map(|mp| mp.parts().to_vec())
            .map(|poly| {
                poly.closed_exterior()
                    .into_iter()
                    .map(|c| [c[0] as f32, c[1] as f32])
                    .collect()
            })
            .collect();
        let lengths = rings.iter().map(|r| r.len() as i32).collect();
        Ok((lengths, rings))
    }

    /// Per-polygon weights after resolving thickness / explicit / area
    /// priority.  `None` means "proportional to area".
    fn polygon_weights(&self, areas: &[f64]) -> ReleaseResult<Option<Vec<f64>>> {
        let any_thickness = self.features.iter().any(|f| f.property(THICKNESS).is_some());
        if any_thickness {
            let thicknesses = self.thicknesses().ok_or_else(|| {
                ReleaseError::Configuration(
                    "thickness weighting needs a thickness on every polygon".into(),
                )
            })?;
            let volumes: Vec<f64> = areas.iter().zip(&thicknesses).map(|(a, t)| a * t).collect();
            let total: f64 = volumes.iter().sum();
            if !(total > 0.0) {
                return Err(ReleaseError::Validation(format!(
                    "total oil volume is {total}; thicknesses must be positive"
                )));
            }
            return Ok(Some(volumes.into_iter().map(|v| v / total).collect()));
        }
        Ok(self.weights())
    }
}

impl Release for SpatialRelease {
    fn release_time(&self) -> SimTime {
        self.schedule.release_time()
    }

    fn total_release_mass(&self) -> f64 {
        self.schedule.release_mass()
    }

    fn prepare_for_model_run(&mut self, time_step_secs: u32) -> ReleaseResult<()> {
        self.rewind();
        let schedule = self.schedule.prepare(time_step_secs)?;

        let polygons = self.polygons()?;
        for (i, mp) in polygons.iter().enumerate() {
            mp.validate()
                .and_then(|()| mp.validate_geographic())
                .map_err(|e| ReleaseError::Validation(format!("polygon {i}: {e}")))?;
        }
        let areas: Vec<f64> = polygons.iter().map(multipolygon_area).collect();
        if let Some(i) = areas.iter().position(|a| !(a.is_finite() && *a > 0.0)) {
            return Err(ReleaseError::Validation(format!(
                "polygon {i} has invalid area {}",
                areas[i]
            )));
        }
        let poly_weights = self.polygon_weights(&areas)?;

        let mut triangles = Vec::new();
        let mut tri_areas = Vec::new();
        let mut owners = Vec::new();
        for (i, mp) in polygons.iter().enumerate() {
            for part in mp.parts() {
                for tri in triangulate(part)? {
                    tri_areas.push(triangle_area(&tri));
                    triangles.push(tri);
                    owners.push(i);
                }
            }
        }

        let weights: Vec<f64> = match &poly_weights {
            Some(pw) => {
                let mut per_poly = vec![0.0; polygons.len()];
                for (a, &i) in tri_areas.iter().zip(&owners) {
                    per_poly[i] += a;
                }
                tri_areas
                    .iter()
                    .zip(&owners)
                    .map(|(a, &i)| pw[i] * a / per_poly[i])
                    .collect()
            }
            None => {
                let total: f64 = tri_areas.iter().sum();
                tri_areas.iter().map(|a| a / total).collect()
            }
        };

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ReleaseError::Validation(format!(
                "triangle weights sum to {sum}, expected 1"
            )));
        }
        let sampler = WeightedIndex::new(&weights)
            .map_err(|e| ReleaseError::Validation(format!("triangle weights: {e}")))?;

        tracing::debug!(
            target: "sp_release::spatial",
            polygons = polygons.len(),
            triangles = triangles.len(),
            "triangulated release polygons"
        );

        self.prepared = Some(Prepared {
            schedule,
            triangles,
            weights,
            sampler,
        });
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
        _t: SimTime,
        _dt: u32,
        rng: &mut ReleaseRng,
    ) -> ReleaseResult<()> {
        let prepared = self.prepared.as_ref().ok_or_else(|| not_prepared("SpatialRelease"))?;
        let rows = data.tail(count)?;
        for slot in &mut data.positions_mut()[rows.clone()] {
            let tri = &prepared.triangles[prepared.sampler.sample(rng.inner())];
            let [lon, lat] = tri.random_point(rng);
            *slot = WorldPoint::surface(lon, lat);
        }
        data.fill_mass(rows, prepared.schedule.mass_per_element());
        Ok(())
    }
}
