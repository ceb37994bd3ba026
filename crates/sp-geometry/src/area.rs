//! Geodesic area on a spherical Earth.
//!
//! Uses the Chamberlain & Duquette (2007) line-integral approximation:
//!
//! ```text
//! A = R² / 2 · | Σ (λ₂ − λ₁) · (2 + sin φ₁ + sin φ₂) |
//! ```
//!
//! Because it is a line integral, areas are additive over any partition of
//! a polygon: shared interior edges cancel.  The triangles of a
//! triangulation therefore sum back to their parent polygon's area, which
//! keeps triangle weights normalised.

use sp_core::geo::EARTH_RADIUS_M;

use crate::polygon::{Coord, MultiPolygon, Polygon};
use crate::Triangle;

/// Signed spherical area of a lon/lat ring in m².
fn ring_area_signed(ring: &[Coord]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let p1 = ring[i];
        let p2 = ring[(i + 1) % n];
        sum += (p2[0] - p1[0]).to_radians()
            * (2.0 + p1[1].to_radians().sin() + p2[1].to_radians().sin());
    }
    sum * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0
}

/// Unsigned spherical area of a lon/lat ring in m².
pub fn ring_area(ring: &[Coord]) -> f64 {
    ring_area_signed(ring).abs()
}

/// Exterior area minus hole areas, in m².
pub fn polygon_area(poly: &Polygon) -> f64 {
    ring_area(poly.exterior()) - poly.holes().iter().map(|h| ring_area(h)).sum::<f64>()
}

/// Sum of part areas, in m².
pub fn multipolygon_area(mp: &MultiPolygon) -> f64 {
    mp.parts().iter().map(polygon_area).sum()
}

/// Spherical area of one triangle, in m².
pub fn triangle_area(tri: &Triangle) -> f64 {
    ring_area(&tri.vertices())
}
