//! Geometry-subsystem error type.

use thiserror::Error;

/// Errors produced by `sp-geometry`.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate polygon: {0}")]
    Degenerate(String),

    #[error("polygon ring is not simple: edges {first} and {second} intersect")]
    SelfIntersection { first: usize, second: usize },

    /// Ring 0 is the exterior; ring `k` is hole `k - 1`.
    #[error("polygon rings {first} and {second} cross or touch")]
    RingsIntersect { first: usize, second: usize },

    #[error("coordinate ({x}, {y}) is not longitude/latitude; projected input?")]
    NotGeographic { x: f64, y: f64 },

    #[error("triangulation failed: {0}")]
    Triangulation(String),

    #[error("zip archive error: {0}")]
    Archive(String),

    #[error("shapefile error: {0}")]
    Shapefile(String),

    #[error("dBASE error: {0}")]
    Dbf(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GeometryResult<T> = Result<T, GeometryError>;
