//! ESRI shapefile polygon reader.
//!
//! A shapefile is a bundle: `.shp` holds geometry, `.dbf` attributes and an
//! optional `.prj` the coordinate system as WKT.  Bundles arrive either as
//! loose files next to each other or zipped together; [`load_shapefile`]
//! accepts both.
//!
//! Only polygon shape types (5, 15, 25) are read; Z and M values are
//! ignored.  Shapefile rings wind clockwise for outers and
//! counter-clockwise for holes; each hole is attached to the first outer
//! that contains it.

use std::path::Path;

use serde_json::{Map, Value};

use crate::archive::read_zip;
use crate::dbf::{DbfTable, read_dbf};
use crate::feature::{Feature, FeatureCollection};
use crate::polygon::{Coord, MultiPolygon, Polygon, ring_contains, signed_area};
use crate::{Crs, GeometryError, GeometryResult};

const FILE_CODE: i32 = 9994;
const HEADER_LEN: usize = 100;

const SHAPE_NULL: i32 = 0;
const SHAPE_POLYGON: i32 = 5;
const SHAPE_POLYGON_Z: i32 = 15;
const SHAPE_POLYGON_M: i32 = 25;

/// Features read from a shapefile, still in the source coordinate system.
#[derive(Clone, Debug)]
pub struct Shapefile {
    pub features: FeatureCollection,
    /// CRS declared by the `.prj`, if one was present and recognised.
    pub crs: Option<Crs>,
}

impl Shapefile {
    /// Features reprojected to lon/lat, assuming `fallback` when the bundle
    /// did not declare its CRS.
    pub fn into_geographic(self, fallback: Crs) -> GeometryResult<FeatureCollection> {
        let crs = self.crs.unwrap_or(fallback);
        if crs == Crs::Geographic {
            return Ok(self.features);
        }
        self.features
            .features
            .into_iter()
            .map(|mut f| {
                let mp = f.multipolygon()?.map_coords(|c| crs.to_lon_lat(c));
                f.geometry = crate::Geometry::from_multipolygon(&mp);
                Ok(f)
            })
            .collect::<GeometryResult<Vec<_>>>()
            .map(FeatureCollection::new)
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Load a shapefile bundle from a `.zip` archive or a loose `.shp` path.
pub fn load_shapefile(path: impl AsRef<Path>) -> GeometryResult<Shapefile> {
    let path = path.as_ref();
    let is_zip = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));

    if is_zip {
        return load_shapefile_bytes(&std::fs::read(path)?);
    }

    let shp = std::fs::read(path)?;
    let dbf = std::fs::read(path.with_extension("dbf")).ok();
    let prj = std::fs::read_to_string(path.with_extension("prj")).ok();
    assemble(&shp, dbf.as_deref(), prj.as_deref())
}

/// Load a zipped shapefile bundle held in memory.
pub fn load_shapefile_bytes(zip: &[u8]) -> GeometryResult<Shapefile> {
    let entries = read_zip(zip)?;
    let find = |ext: &str| {
        entries
            .iter()
            .find(|(name, _)| {
                !name.starts_with("__MACOSX")
                    && name.to_ascii_lowercase().ends_with(ext)
            })
            .map(|(_, bytes)| bytes.as_slice())
    };
    let shp = find(".shp")
        .ok_or_else(|| GeometryError::Shapefile("archive contains no .shp entry".into()))?;
    let prj = find(".prj").map(|b| String::from_utf8_lossy(b).into_owned());
    assemble(shp, find(".dbf"), prj.as_deref())
}

fn assemble(shp: &[u8], dbf: Option<&[u8]>, prj: Option<&str>) -> GeometryResult<Shapefile> {
    let shapes = read_shp(shp)?;
    let table = dbf.map(read_dbf).transpose()?.unwrap_or_default();
    if dbf.is_some() && table.len() != shapes.len() {
        return Err(GeometryError::Shapefile(format!(
            "{} shapes but {} attribute records",
            shapes.len(),
            table.len()
        )));
    }

    let mut features = Vec::with_capacity(shapes.len());
    for (i, shape) in shapes.into_iter().enumerate() {
        let Some(mp) = shape else {
            tracing::warn!(target: "sp_geometry::shapefile", record = i, "skipping null shape");
            continue;
        };
        let props = match attributes(&table, i, dbf.is_some()) {
            Some(props) => props,
            None => continue,
        };
        let mut feature = Feature::from_multipolygon(&mp);
        if !props.is_empty() {
            feature.properties = Some(props);
        }
        features.push(feature);
    }

    Ok(Shapefile {
        features: FeatureCollection::new(features),
        crs: prj.and_then(Crs::from_prj),
    })
}

/// Attribute map for shape `i`; `None` if the row is flagged deleted.
fn attributes(table: &DbfTable, i: usize, has_dbf: bool) -> Option<Map<String, Value>> {
    if !has_dbf {
        return Some(Map::new());
    }
    let row = table.records.get(i)?.clone();
    if row.is_none() {
        tracing::warn!(target: "sp_geometry::shapefile", record = i, "skipping deleted record");
    }
    row
}

// ── .shp parsing ──────────────────────────────────────────────────────────────

fn be_i32(buf: &[u8], at: usize) -> GeometryResult<i32> {
    buf.get(at..at + 4)
        .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| GeometryError::Shapefile(format!("truncated at offset {at}")))
}

fn le_i32(buf: &[u8], at: usize) -> GeometryResult<i32> {
    buf.get(at..at + 4)
        .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| GeometryError::Shapefile(format!("truncated at offset {at}")))
}

fn le_f64(buf: &[u8], at: usize) -> GeometryResult<f64> {
    buf.get(at..at + 8)
        .and_then(|b| b.try_into().ok())
        .map(f64::from_le_bytes)
        .ok_or_else(|| GeometryError::Shapefile(format!("truncated at offset {at}")))
}

/// Big-endian length in 16-bit words, converted to bytes.
fn word_len(buf: &[u8], at: usize, what: &str) -> GeometryResult<usize> {
    usize::try_from(be_i32(buf, at)?)
        .ok()
        .and_then(|words| words.checked_mul(2))
        .ok_or_else(|| GeometryError::Shapefile(format!("negative {what}")))
}

fn count(buf: &[u8], at: usize, what: &str) -> GeometryResult<usize> {
    usize::try_from(le_i32(buf, at)?)
        .map_err(|_| GeometryError::Shapefile(format!("negative {what}")))
}

/// Parse every record; `None` entries are null shapes.
pub fn read_shp(bytes: &[u8]) -> GeometryResult<Vec<Option<MultiPolygon>>> {
    if be_i32(bytes, 0)? != FILE_CODE {
        return Err(GeometryError::Shapefile("bad file code; not a .shp file".into()));
    }
    let declared_len = word_len(bytes, 24, "file length")?;
    let end = declared_len.min(bytes.len());
    let file_type = le_i32(bytes, 32)?;
    if !matches!(file_type, SHAPE_NULL | SHAPE_POLYGON | SHAPE_POLYGON_Z | SHAPE_POLYGON_M) {
        return Err(GeometryError::Shapefile(format!(
            "shape type {file_type} is not a polygon type"
        )));
    }

    let mut shapes = Vec::new();
    let mut at = HEADER_LEN;
    while at + 8 <= end {
        let content_len = word_len(bytes, at + 4, "record length")?;
        let content = (at + 8)
            .checked_add(content_len)
            .and_then(|stop| bytes.get(at + 8..stop))
            .ok_or_else(|| GeometryError::Shapefile("record runs past end of file".into()))?;
        shapes.push(read_record(content)?);
        at += 8 + content_len;
    }
    Ok(shapes)
}

fn read_record(rec: &[u8]) -> GeometryResult<Option<MultiPolygon>> {
    match le_i32(rec, 0)? {
        SHAPE_NULL => return Ok(None),
        SHAPE_POLYGON | SHAPE_POLYGON_Z | SHAPE_POLYGON_M => {}
        other => {
            return Err(GeometryError::Shapefile(format!(
                "record shape type {other} is not a polygon type"
            )));
        }
    }
    let num_parts = count(rec, 36, "part count")?;
    let num_points = count(rec, 40, "point count")?;
    let parts_at = 44;
    let points_at = parts_at + 4 * num_parts;
    if points_at + 16 * num_points > rec.len() {
        return Err(GeometryError::Shapefile(format!(
            "record declares {num_parts} parts and {num_points} points but holds {} bytes",
            rec.len()
        )));
    }

    let mut starts = Vec::with_capacity(num_parts + 1);
    for p in 0..num_parts {
        starts.push(count(rec, parts_at + 4 * p, "part offset")?);
    }
    starts.push(num_points);

    let mut rings = Vec::with_capacity(num_parts);
    for w in starts.windows(2) {
        let (s, e) = (w[0], w[1]);
        if s > e || e > num_points {
            return Err(GeometryError::Shapefile("part offsets out of order".into()));
        }
        let ring = (s..e)
            .map(|k| {
                let off = points_at + 16 * k;
                Ok([le_f64(rec, off)?, le_f64(rec, off + 8)?])
            })
            .collect::<GeometryResult<Vec<Coord>>>()?;
        rings.push(ring);
    }
    Ok(Some(group_rings(rings)))
}

/// Split rings into outers (clockwise) and holes (counter-clockwise),
/// attaching each hole to the first outer that contains it.
fn group_rings(rings: Vec<Vec<Coord>>) -> MultiPolygon {
    let (outers, holes): (Vec<_>, Vec<_>) =
        rings.into_iter().partition(|r| signed_area(r) <= 0.0);

    let mut polys: Vec<(Vec<Coord>, Vec<Vec<Coord>>)> =
        outers.into_iter().map(|o| (o, Vec::new())).collect();
    for hole in holes {
        let owner = hole
            .first()
            .and_then(|&p| polys.iter().position(|(outer, _)| ring_contains(outer, p)));
        match owner {
            Some(i) => polys[i].1.push(hole),
            // Mis-wound outer ring.
            None => polys.push((hole, Vec::new())),
        }
    }
    MultiPolygon(
        polys
            .into_iter()
            .map(|(outer, holes)| Polygon::new(outer, holes))
            .collect(),
    )
}
