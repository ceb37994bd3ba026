//! `sp-geometry` — polygon geometry and ingestion for spatial releases.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`polygon`]     | `Polygon`, `MultiPolygon`, validity and containment       |
//! | [`area`]        | Geodesic (spherical) ring/polygon/triangle area           |
//! | [`triangulate`] | `Triangle`, ear-clipping triangulation with holes         |
//! | [`projection`]  | `Crs` (geographic / Web Mercator) and `.prj` sniffing     |
//! | [`feature`]     | GeoJSON `FeatureCollection`, `Feature`, `Geometry`        |
//! | [`archive`]     | Minimal zip reader (stored + deflate entries)             |
//! | [`shapefile`]   | `.shp` polygon reader, `load_shapefile` entry point       |
//! | [`dbf`]         | dBASE III attribute table reader                          |
//! | [`error`]       | `GeometryError`, `GeometryResult<T>`                      |
//!
//! Coordinates are `[x, y]` pairs — `[lon, lat]` in degrees once in
//! geographic form.

pub mod archive;
pub mod area;
pub mod dbf;
pub mod error;
pub mod feature;
pub mod polygon;
pub mod projection;
pub mod shapefile;
pub mod triangulate;


pub use error::{GeometryError, GeometryResult};
pub use feature::{Feature, FeatureCollection, Geometry};
pub use polygon::{Coord, MultiPolygon, Polygon};
pub use projection::Crs;
pub use shapefile::{Shapefile, load_shapefile, load_shapefile_bytes};
pub use triangulate::{Triangle, triangulate};
