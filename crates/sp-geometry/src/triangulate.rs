//! Ear-clipping triangulation of polygons with holes.
//!
//! # Algorithm
//!
//! 1. Holes are merged into the exterior one at a time (rightmost hole
//!    first) by a zero-width *bridge*: the hole's rightmost vertex is joined
//!    to the nearest exterior vertex whose connecting segment crosses no
//!    other edge.  The merged ring visits the hole and returns along the
//!    bridge, so both bridge endpoints appear twice.
//! 2. The resulting weakly-simple counter-clockwise ring is ear-clipped:
//!    repeatedly cut a convex vertex whose triangle contains no other ring
//!    vertex.  Collinear vertices are dropped without emitting a triangle.
//!
//! O(n²) per polygon, which is ample for spill outlines (hundreds of
//! vertices).

use sp_core::ReleaseRng;

use crate::polygon::{Coord, Polygon, cross, segments_intersect, signed_area};
use crate::{GeometryError, GeometryResult};

/// Relative tolerance for convexity / collinearity tests.
const EPS: f64 = 1e-12;

// ── Triangle ──────────────────────────────────────────────────────────────────

/// A counter-clockwise triangle in lon/lat space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub a: Coord,
    pub b: Coord,
    pub c: Coord,
}

impl Triangle {
    pub fn new(a: Coord, b: Coord, c: Coord) -> Self {
        Self { a, b, c }
    }

    pub fn vertices(&self) -> [Coord; 3] {
        [self.a, self.b, self.c]
    }

    /// Planar area in coordinate units².
    pub fn planar_area(&self) -> f64 {
        cross(self.a, self.b, self.c).abs() * 0.5
    }

    /// Point at barycentric offsets `(u, v)` along `ab` and `ac`.
    ///
    /// `(u, v)` pairs with `u + v > 1` are reflected back into the
    /// triangle, so uniform `(u, v)` on the unit square yields a uniform
    /// point in the triangle.
    pub fn point_at(&self, mut u: f64, mut v: f64) -> Coord {
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        [
            self.a[0] + u * (self.b[0] - self.a[0]) + v * (self.c[0] - self.a[0]),
            self.a[1] + u * (self.b[1] - self.a[1]) + v * (self.c[1] - self.a[1]),
        ]
    }

    /// Uniformly random point inside the triangle.
    pub fn random_point(&self, rng: &mut ReleaseRng) -> Coord {
        let u: f64 = rng.random();
        let v: f64 = rng.random();
        self.point_at(u, v)
    }

    /// Inclusive containment test (points on an edge count as inside).
    pub fn contains(&self, p: Coord) -> bool {
        let d1 = cross(self.a, self.b, p);
        let d2 = cross(self.b, self.c, p);
        let d3 = cross(self.c, self.a, p);
        let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
        let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
        !(has_neg && has_pos)
    }
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Triangulate `poly` (holes included) into counter-clockwise triangles.
///
/// # Errors
///
/// [`GeometryError::Triangulation`] if the ring is too degenerate for ear
/// clipping to make progress.
pub fn triangulate(poly: &Polygon) -> GeometryResult<Vec<Triangle>> {
    let ring = merge_holes(poly)?;
    clip_ears(ring)
}

// ── Hole bridging ─────────────────────────────────────────────────────────────

fn rightmost(ring: &[Coord]) -> usize {
    let mut best = 0;
    for (i, c) in ring.iter().enumerate() {
        if c[0] > ring[best][0] || (c[0] == ring[best][0] && c[1] < ring[best][1]) {
            best = i;
        }
    }
    best
}

/// `true` if segment `p–q` crosses an edge of `ring` that does not touch
/// either endpoint.
fn crosses_ring(p: Coord, q: Coord, ring: &[Coord]) -> bool {
    let n = ring.len();
    (0..n).any(|i| {
        let (e1, e2) = (ring[i], ring[(i + 1) % n]);
        if e1 == p || e1 == q || e2 == p || e2 == q {
            return false;
        }
        segments_intersect(p, q, e1, e2)
    })
}

fn merge_holes(poly: &Polygon) -> GeometryResult<Vec<Coord>> {
    let mut outer: Vec<Coord> = poly.exterior().to_vec();
    let mut holes: Vec<Vec<Coord>> = poly.holes().iter().filter(|h| h.len() >= 3).cloned().collect();
    holes.sort_by(|a, b| {
        let ax = a[rightmost(a)][0];
        let bx = b[rightmost(b)][0];
        bx.total_cmp(&ax)
    });

    for hi in 0..holes.len() {
        let hole = &holes[hi];
        let m_idx = rightmost(hole);
        let m = hole[m_idx];

        // Candidate exterior vertices, nearest first.
        let mut candidates: Vec<usize> = (0..outer.len()).collect();
        candidates.sort_by(|&i, &j| {
            let di = (outer[i][0] - m[0]).powi(2) + (outer[i][1] - m[1]).powi(2);
            let dj = (outer[j][0] - m[0]).powi(2) + (outer[j][1] - m[1]).powi(2);
            di.total_cmp(&dj)
        });

        let bridge = candidates.into_iter().find(|&vi| {
            let v = outer[vi];
            !crosses_ring(m, v, &outer)
                && !holes.iter().any(|h| crosses_ring(m, v, h))
                && inside_cone(&outer, vi, m)
        });
        let Some(vi) = bridge else {
            return Err(GeometryError::Triangulation(
                "no visible exterior vertex to bridge a hole".into(),
            ));
        };

        // outer[..=vi], hole from m around back to m, then v again.
        let mut merged = Vec::with_capacity(outer.len() + hole.len() + 2);
        merged.extend_from_slice(&outer[..=vi]);
        for k in 0..=hole.len() {
            merged.push(hole[(m_idx + k) % hole.len()]);
        }
        merged.push(outer[vi]);
        merged.extend_from_slice(&outer[vi + 1..]);
        outer = merged;
    }
    Ok(outer)
}

/// `true` if direction `v → p` points into the polygon interior at vertex
/// `vi` (between the incoming and outgoing edges of a CCW ring).
fn inside_cone(ring: &[Coord], vi: usize, p: Coord) -> bool {
    let n = ring.len();
    let prev = ring[(vi + n - 1) % n];
    let v = ring[vi];
    let next = ring[(vi + 1) % n];
    if cross(prev, v, next) >= 0.0 {
        // Convex corner: p must be left of both edges.
        cross(prev, v, p) >= 0.0 && cross(v, next, p) >= 0.0
    } else {
        // Reflex corner: p must not be in the exterior wedge.
        !(cross(prev, v, p) < 0.0 && cross(v, next, p) < 0.0)
    }
}

// ── Ear clipping ──────────────────────────────────────────────────────────────

/// `true` if `a → b → c` turns by less than the tolerance relative to the
/// two edge lengths (also catches zero-length edges and bridge spikes).
fn nearly_collinear(a: Coord, b: Coord, c: Coord) -> bool {
    let ab = (b[0] - a[0]).hypot(b[1] - a[1]);
    let bc = (c[0] - b[0]).hypot(c[1] - b[1]);
    cross(a, b, c).abs() <= EPS * ab * bc
}

fn clip_ears(ring: Vec<Coord>) -> GeometryResult<Vec<Triangle>> {
    let has_area = ring.first().is_some_and(|&o| {
        let local: Vec<Coord> = ring.iter().map(|c| [c[0] - o[0], c[1] - o[1]]).collect();
        let (w, h) = local.iter().fold((0.0_f64, 0.0_f64), |(w, h), c| {
            (w.max(c[0].abs()), h.max(c[1].abs()))
        });
        signed_area(&local) > EPS * w.max(h).powi(2)
    });
    let mut idx: Vec<usize> = (0..ring.len()).collect();
    let mut tris = Vec::with_capacity(ring.len().saturating_sub(2));

    while idx.len() > 3 {
        let n = idx.len();
        let mut clipped = false;

        for i in 0..n {
            let (pi, ci, ni) = (idx[(i + n - 1) % n], idx[i], idx[(i + 1) % n]);
            let (a, b, c) = (ring[pi], ring[ci], ring[ni]);
            let turn = cross(a, b, c);

            if nearly_collinear(a, b, c) {
                // Collinear (or a bridge spike): drop without a triangle.
                idx.remove(i);
                clipped = true;
                break;
            }
            if turn < 0.0 {
                continue; // reflex
            }

            let tri = Triangle::new(a, b, c);
            let blocked = idx.iter().any(|&k| {
                let p = ring[k];
                k != pi && k != ci && k != ni && p != a && p != b && p != c && tri.contains(p)
            });
            if !blocked {
                tris.push(tri);
                idx.remove(i);
                clipped = true;
                break;
            }
        }

        if !clipped {
            return Err(GeometryError::Triangulation(format!(
                "no ear found with {} vertices remaining",
                idx.len()
            )));
        }
    }

    if idx.len() == 3 {
        let tri = Triangle::new(ring[idx[0]], ring[idx[1]], ring[idx[2]]);
        if !nearly_collinear(tri.a, tri.b, tri.c) && cross(tri.a, tri.b, tri.c) > 0.0 {
            tris.push(tri);
        }
    }

    if tris.is_empty() && has_area {
        return Err(GeometryError::Triangulation(
            "ring with positive area produced no triangles".into(),
        ));
    }
    Ok(tris)
}
