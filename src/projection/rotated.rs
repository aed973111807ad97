//! Rotated pole latitude/longitude grids.
//!
//! The rotated system is defined by the position of its north pole in
//! geographic coordinates, as in the CF `rotated_latitude_longitude` grid
//! mapping. The rotated origin lies on the meridian opposite the pole.

/// Rotated pole definition.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedPole {
    pole_lat: f64,
    pole_lon: f64,
    /// Geographic unit vector of the rotated north pole
    p: [f64; 3],
    /// Geographic unit vector of rotated (lat 0, lon 0)
    q: [f64; 3],
    /// Geographic unit vector of rotated (lat 0, lon 90)
    r: [f64; 3],
}

impl RotatedPole {
    /// Create from the geographic position of the rotated north pole.
    pub fn new(pole_lat: f64, pole_lon: f64) -> Self {
        let (sin_phi, cos_phi) = pole_lat.to_radians().sin_cos();
        let (sin_lam, cos_lam) = pole_lon.to_radians().sin_cos();

        Self {
            pole_lat,
            pole_lon,
            p: [cos_phi * cos_lam, cos_phi * sin_lam, sin_phi],
            q: [-sin_phi * cos_lam, -sin_phi * sin_lam, cos_phi],
            r: [sin_lam, -cos_lam, 0.0],
        }
    }

    /// Geographic latitude of the rotated north pole.
    pub fn pole_lat(&self) -> f64 {
        self.pole_lat
    }

    /// Geographic longitude of the rotated north pole.
    pub fn pole_lon(&self) -> f64 {
        self.pole_lon
    }

    /// Rotated `(rlon, rlat)` in degrees to geographic `(lat, lon)`.
    pub fn unrotate(&self, rlon: f64, rlat: f64) -> (f64, f64) {
        let v = unit_vector(rlat, rlon);
        let g = [
            v[0] * self.q[0] + v[1] * self.r[0] + v[2] * self.p[0],
            v[0] * self.q[1] + v[1] * self.r[1] + v[2] * self.p[1],
            v[0] * self.q[2] + v[1] * self.r[2] + v[2] * self.p[2],
        ];
        to_lat_lon(g)
    }

    /// Geographic `(lat, lon)` in degrees to rotated `(rlon, rlat)`.
    pub fn rotate(&self, lat: f64, lon: f64) -> (f64, f64) {
        let g = unit_vector(lat, lon);
        let v = [dot(g, self.q), dot(g, self.r), dot(g, self.p)];
        let (rlat, rlon) = to_lat_lon(v);
        (rlon, rlat)
    }
}

fn unit_vector(lat: f64, lon: f64) -> [f64; 3] {
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn to_lat_lon(v: [f64; 3]) -> (f64, f64) {
    let lat = v[2].clamp(-1.0, 1.0).asin().to_degrees();
    let lon = v[1].atan2(v[0]).to_degrees();
    (lat, lon)
}
