//! GeoJSON feature collections: the persisted form of a polygon set.
//!
//! Only the subset the release subsystem needs is modelled: `Polygon` and
//! `MultiPolygon` geometries plus a free-form `properties` object.  Per-
//! feature attributes such as `weight`, `thickness`, `release_time` or
//! `oil_type` live in `properties`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::polygon::{Coord, MultiPolygon, Polygon};
use crate::{GeometryError, GeometryResult};

type Ring = Vec<Vec<f64>>;

// ── Geometry ──────────────────────────────────────────────────────────────────

/// GeoJSON geometry object (`{"type": ..., "coordinates": ...}`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Encode a multipolygon; single-part input becomes a plain `Polygon`.
    pub fn from_multipolygon(mp: &MultiPolygon) -> Self {
        match mp.parts() {
            [single] => Geometry::Polygon(encode_polygon(single)),
            parts => Geometry::MultiPolygon(parts.iter().map(encode_polygon).collect()),
        }
    }

    /// Decode into normalised polygons.
    pub fn to_multipolygon(&self) -> GeometryResult<MultiPolygon> {
        match self {
            Geometry::Polygon(rings) => Ok(MultiPolygon(vec![decode_polygon(rings)?])),
            Geometry::MultiPolygon(polys) => Ok(MultiPolygon(
                polys
                    .iter()
                    .map(|rings| decode_polygon(rings))
                    .collect::<GeometryResult<_>>()?,
            )),
        }
    }
}

fn encode_ring(ring: &[Coord]) -> Ring {
    let mut out: Ring = ring.iter().map(|c| vec![c[0], c[1]]).collect();
    if let Some(first) = out.first().cloned() {
        out.push(first);
    }
    out
}

fn encode_polygon(poly: &Polygon) -> Vec<Ring> {
    std::iter::once(poly.exterior())
        .chain(poly.holes().iter().map(Vec::as_slice))
        .map(encode_ring)
        .collect()
}

fn decode_ring(ring: &Ring) -> GeometryResult<Vec<Coord>> {
    ring.iter()
        .map(|pos| match pos.as_slice() {
            [x, y, ..] => Ok([*x, *y]),
            _ => Err(GeometryError::GeoJson(format!(
                "position needs at least two values, got {}",
                pos.len()
            ))),
        })
        .collect()
}

fn decode_polygon(rings: &[Ring]) -> GeometryResult<Polygon> {
    let Some((exterior, holes)) = rings.split_first() else {
        return Err(GeometryError::GeoJson("polygon has no rings".into()));
    };
    Ok(Polygon::new(
        decode_ring(exterior)?,
        holes.iter().map(decode_ring).collect::<GeometryResult<_>>()?,
    ))
}

// ── Feature ───────────────────────────────────────────────────────────────────

/// One GeoJSON feature: a polygonal geometry plus properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            kind: "Feature".to_owned(),
            geometry,
            properties: None,
        }
    }

    pub fn from_multipolygon(mp: &MultiPolygon) -> Self {
        Self::new(Geometry::from_multipolygon(mp))
    }

    pub fn multipolygon(&self) -> GeometryResult<MultiPolygon> {
        self.geometry.to_multipolygon()
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(name).filter(|v| !v.is_null())
    }

    /// Numeric property, or `None` when absent, null or non-numeric.
    pub fn property_f64(&self, name: &str) -> Option<f64> {
        self.property(name)?.as_f64()
    }

    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.property(name)?.as_str()
    }

    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) {
        self.properties
            .get_or_insert_with(Map::new)
            .insert(name.to_owned(), value.into());
    }

    /// Builder-style [`set_property`](Self::set_property).
    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_property(name, value);
        self
    }
}

// ── FeatureCollection ─────────────────────────────────────────────────────────

/// A GeoJSON `FeatureCollection`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection".to_owned(),
            features,
        }
    }

    /// Parse GeoJSON text, rejecting anything but a `FeatureCollection`.
    pub fn from_json_str(text: &str) -> GeometryResult<Self> {
        let fc: FeatureCollection = serde_json::from_str(text)?;
        if fc.kind != "FeatureCollection" {
            return Err(GeometryError::GeoJson(format!(
                "expected a FeatureCollection, found {:?}",
                fc.kind
            )));
        }
        if let Some(f) = fc.features.iter().find(|f| f.kind != "Feature") {
            return Err(GeometryError::GeoJson(format!(
                "expected a Feature, found {:?}",
                f.kind
            )));
        }
        Ok(fc)
    }

    pub fn to_json_string(&self) -> GeometryResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Decode every feature's geometry, in order.
    pub fn multipolygons(&self) -> GeometryResult<Vec<MultiPolygon>> {
        self.features.iter().map(Feature::multipolygon).collect()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
