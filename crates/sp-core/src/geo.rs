//! Geographic coordinate type and spatial utilities.
//!
//! `WorldPoint` uses `f64` longitude/latitude in degrees and a depth `z` in
//! metres (positive down).  Release geometry is accumulated over many
//! interpolation steps, so single precision is not enough here.

/// Mean Earth radius in metres, shared by distance and area helpers.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A (longitude, latitude, depth) release coordinate.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldPoint {
    pub lon: f64,
    pub lat: f64,
    pub z: f64,
}

impl WorldPoint {
    pub const ORIGIN: WorldPoint = WorldPoint { lon: 0.0, lat: 0.0, z: 0.0 };

    #[inline]
    pub fn new(lon: f64, lat: f64, z: f64) -> Self {
        Self { lon, lat, z }
    }

    /// A surface point (z = 0).
    #[inline]
    pub fn surface(lon: f64, lat: f64) -> Self {
        Self { lon, lat, z: 0.0 }
    }

    /// Component-wise linear interpolation; `t = 0` gives `self`, `t = 1`
    /// gives `other`.
    #[inline]
    pub fn lerp(self, other: WorldPoint, t: f64) -> WorldPoint {
        WorldPoint {
            lon: self.lon + (other.lon - self.lon) * t,
            lat: self.lat + (other.lat - self.lat) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// `n` evenly spaced points from `self` to `other`, both ends included.
    ///
    /// `n == 1` yields only `self`; `n == 0` yields nothing.
    pub fn linspace(self, other: WorldPoint, n: usize) -> impl Iterator<Item = WorldPoint> {
        let denom = n.saturating_sub(1).max(1) as f64;
        (0..n).map(move |i| self.lerp(other, i as f64 / denom))
    }

    /// `true` if the horizontal coordinate is a valid lon/lat pair.
    #[inline]
    pub fn is_geographic(self) -> bool {
        (-180.0..=180.0).contains(&self.lon) && (-90.0..=90.0).contains(&self.lat)
    }

    /// Haversine great-circle surface distance in metres (ignores `z`).
    pub fn distance_m(self, other: WorldPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    #[inline]
    pub fn to_array(self) -> [f64; 3] {
        [self.lon, self.lat, self.z]
    }
}

impl From<[f64; 3]> for WorldPoint {
    #[inline]
    fn from(a: [f64; 3]) -> Self {
        WorldPoint::new(a[0], a[1], a[2])
    }
}

impl From<(f64, f64, f64)> for WorldPoint {
    #[inline]
    fn from((lon, lat, z): (f64, f64, f64)) -> Self {
        WorldPoint::new(lon, lat, z)
    }
}

impl std::fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.2})", self.lon, self.lat, self.z)
    }
}
