//! Polygon types, ring normalisation, validity and containment tests.
//!
//! Rings are stored *open* (the closing vertex that repeats the first is
//! dropped on construction) with consecutive duplicates removed.  Exterior
//! rings are wound counter-clockwise and holes clockwise, so signed planar
//! areas of exteriors are positive.

use crate::{GeometryError, GeometryResult};

/// An `[x, y]` coordinate pair (`[lon, lat]` in geographic form).
pub type Coord = [f64; 2];

// ── Polygon ───────────────────────────────────────────────────────────────────

/// A polygon with one exterior ring and zero or more holes.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    exterior: Vec<Coord>,
    holes: Vec<Vec<Coord>>,
}

impl Polygon {
    /// Build a polygon, normalising ring closure and winding.
    pub fn new(exterior: Vec<Coord>, holes: Vec<Vec<Coord>>) -> Self {
        let mut exterior = open_ring(exterior);
        if signed_area(&exterior) < 0.0 {
            exterior.reverse();
        }
        let holes = holes
            .into_iter()
            .map(open_ring)
            .map(|mut h| {
                if signed_area(&h) > 0.0 {
                    h.reverse();
                }
                h
            })
            .collect();
        Self { exterior, holes }
    }

    /// Axis-aligned rectangle, mostly for tests and grid setups.
    pub fn rectangle(min: Coord, max: Coord) -> Self {
        Self::new(
            vec![min, [max[0], min[1]], max, [min[0], max[1]]],
            Vec::new(),
        )
    }

    pub fn exterior(&self) -> &[Coord] {
        &self.exterior
    }

    pub fn holes(&self) -> &[Vec<Coord>] {
        &self.holes
    }

    /// Exterior ring with the first vertex repeated at the end.
    pub fn closed_exterior(&self) -> Vec<Coord> {
        let mut ring = self.exterior.clone();
        if let Some(&first) = ring.first() {
            ring.push(first);
        }
        ring
    }

    /// Planar area in coordinate units² (exterior minus holes).
    pub fn planar_area(&self) -> f64 {
        signed_area(&self.exterior).abs()
            - self.holes.iter().map(|h| signed_area(h).abs()).sum::<f64>()
    }

    /// Apply `f` to every vertex, returning a renormalised polygon.
    pub fn map_coords(&self, f: impl Fn(Coord) -> Coord) -> Polygon {
        Polygon::new(
            self.exterior.iter().map(|&c| f(c)).collect(),
            self.holes
                .iter()
                .map(|h| h.iter().map(|&c| f(c)).collect())
                .collect(),
        )
    }

    /// Iterate over every vertex of every ring.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.exterior
            .iter()
            .chain(self.holes.iter().flatten())
            .copied()
    }

    /// `true` if `p` lies inside the exterior and outside every hole.
    pub fn contains(&self, p: Coord) -> bool {
        ring_contains(&self.exterior, p) && !self.holes.iter().any(|h| ring_contains(h, p))
    }

    /// Reject rings with fewer than three distinct vertices, zero area,
    /// self-intersections, or edges shared with another ring.
    pub fn validate(&self) -> GeometryResult<()> {
        for ring in std::iter::once(&self.exterior).chain(&self.holes) {
            if ring.len() < 3 {
                return Err(GeometryError::Degenerate(format!(
                    "ring has {} distinct vertices, need at least 3",
                    ring.len()
                )));
            }
            if signed_area(ring) == 0.0 {
                return Err(GeometryError::Degenerate("ring has zero area".into()));
            }
            check_simple(ring)?;
        }
        let rings: Vec<&[Coord]> = std::iter::once(self.exterior.as_slice())
            .chain(self.holes.iter().map(Vec::as_slice))
            .collect();
        for first in 0..rings.len() {
            for second in first + 1..rings.len() {
                if rings_meet(rings[first], rings[second]) {
                    return Err(GeometryError::RingsIntersect { first, second });
                }
            }
        }
        Ok(())
    }

    /// Reject coordinates outside [-180, 180] × [-90, 90].
    pub fn validate_geographic(&self) -> GeometryResult<()> {
        match self
            .coords()
            .find(|c| !(-180.0..=180.0).contains(&c[0]) || !(-90.0..=90.0).contains(&c[1]))
        {
            Some(c) => Err(GeometryError::NotGeographic { x: c[0], y: c[1] }),
            None => Ok(()),
        }
    }
}

// ── MultiPolygon ──────────────────────────────────────────────────────────────

/// One or more polygons treated as a single weighted unit.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct MultiPolygon(pub Vec<Polygon>);

impl MultiPolygon {
    pub fn parts(&self) -> &[Polygon] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn map_coords(&self, f: impl Fn(Coord) -> Coord) -> MultiPolygon {
        MultiPolygon(self.0.iter().map(|p| p.map_coords(&f)).collect())
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.0.iter().flat_map(Polygon::coords)
    }

    pub fn contains(&self, p: Coord) -> bool {
        self.0.iter().any(|poly| poly.contains(p))
    }

    pub fn validate(&self) -> GeometryResult<()> {
        if self.0.is_empty() {
            return Err(GeometryError::Degenerate("multipolygon has no parts".into()));
        }
        self.0.iter().try_for_each(Polygon::validate)
    }

    pub fn validate_geographic(&self) -> GeometryResult<()> {
        self.0.iter().try_for_each(Polygon::validate_geographic)
    }
}

impl From<Polygon> for MultiPolygon {
    fn from(p: Polygon) -> Self {
        MultiPolygon(vec![p])
    }
}

// ── Ring helpers ──────────────────────────────────────────────────────────────

/// Drop consecutive duplicates and the closing vertex.
fn open_ring(mut ring: Vec<Coord>) -> Vec<Coord> {
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Shoelace signed area; positive for counter-clockwise rings.
pub fn signed_area(ring: &[Coord]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        sum += a[0] * b[1] - b[0] * a[1];
    }
    sum * 0.5
}

/// Even-odd ray casting.
pub fn ring_contains(ring: &[Coord], p: Coord) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x = (b[0] - a[0]) * (p[1] - a[1]) / (b[1] - a[1]) + a[0];
            if p[0] < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Orientation of `c` relative to the directed line `a → b`
/// (positive = left turn).
#[inline]
pub(crate) fn cross(a: Coord, b: Coord, c: Coord) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn on_segment(a: Coord, b: Coord, p: Coord) -> bool {
    p[0] >= a[0].min(b[0])
        && p[0] <= a[0].max(b[0])
        && p[1] >= a[1].min(b[1])
        && p[1] <= a[1].max(b[1])
}

/// Closed-segment intersection test (touching counts).
pub(crate) fn segments_intersect(p1: Coord, p2: Coord, q1: Coord, q2: Coord) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

fn edges(ring: &[Coord]) -> impl Iterator<Item = (Coord, Coord)> + '_ {
    (0..ring.len()).map(move |i| (ring[i], ring[(i + 1) % ring.len()]))
}

/// `true` if any edge of `a` meets any edge of `b`.
fn rings_meet(a: &[Coord], b: &[Coord]) -> bool {
    edges(a).any(|(a1, a2)| edges(b).any(|(b1, b2)| segments_intersect(a1, a2, b1, b2)))
}

/// O(n²) check that no two non-adjacent edges of `ring` meet.
fn check_simple(ring: &[Coord]) -> GeometryResult<()> {
    let n = ring.len();
    for i in 0..n {
        let (a1, a2) = (ring[i], ring[(i + 1) % n]);
        for j in i + 1..n {
            // Adjacent edges share a vertex by construction.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b1, b2) = (ring[j], ring[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return Err(GeometryError::SelfIntersection { first: i, second: j });
            }
        }
    }
    Ok(())
}
