//! Coordinate reference systems understood by the ingestion path.
//!
//! Only two are needed in practice: plain geographic lon/lat (EPSG:4326)
//! and spherical Web Mercator (EPSG:3857), in which satellite oil-extent
//! products are commonly delivered.  Web Mercator's inverse is closed-form,
//! so no projection library is involved.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::polygon::Coord;

/// WGS-84 semi-major axis, the sphere radius used by Web Mercator.
const WEB_MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Source coordinate reference system of a geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Crs {
    /// Longitude/latitude degrees (EPSG:4326).
    Geographic,
    /// Spherical Web Mercator metres (EPSG:3857).
    WebMercator,
}

impl Crs {
    /// Guess the CRS from the WKT text of a `.prj` sidecar.
    ///
    /// A `PROJCS` naming the Web Mercator / auxiliary-sphere projection is
    /// Web Mercator; a bare `GEOGCS` is geographic.  Any other projection
    /// yields `None`.
    pub fn from_prj(wkt: &str) -> Option<Crs> {
        let upper = wkt.to_ascii_uppercase();
        if upper.contains("PROJCS") {
            let web = ["WEB_MERCATOR", "PSEUDO_MERCATOR", "PSEUDO-MERCATOR", "AUXILIARY_SPHERE", "3857"];
            return web.iter().any(|k| upper.contains(k)).then_some(Crs::WebMercator);
        }
        if upper.contains("GEOGCS") {
            return Some(Crs::Geographic);
        }
        None
    }

    /// Convert one coordinate in this CRS to `[lon, lat]` degrees.
    pub fn to_lon_lat(self, c: Coord) -> Coord {
        match self {
            Crs::Geographic => c,
            Crs::WebMercator => {
                let lon = (c[0] / WEB_MERCATOR_RADIUS_M).to_degrees();
                let lat = (2.0 * (c[1] / WEB_MERCATOR_RADIUS_M).exp().atan() - FRAC_PI_2)
                    .to_degrees();
                [lon.clamp(-180.0, 180.0), lat]
            }
        }
    }

    /// Convert `[lon, lat]` degrees into this CRS.
    pub fn from_lon_lat(self, c: Coord) -> Coord {
        match self {
            Crs::Geographic => c,
            Crs::WebMercator => {
                let x = WEB_MERCATOR_RADIUS_M * c[0].to_radians();
                let y = WEB_MERCATOR_RADIUS_M * (PI / 4.0 + c[1].to_radians() / 2.0).tan().ln();
                [x, y]
            }
        }
    }
}
