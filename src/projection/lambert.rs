//! Lambert Conformal Conic projection on a sphere.
//!
//! The cone may be tangent (one standard parallel) or secant (two). Projected
//! coordinates are metres from the projection origin, shifted by the false
//! easting/northing.

use std::f64::consts::FRAC_PI_4;

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformal {
    lat_0: f64,
    lon_0: f64,
    lat_1: f64,
    lat_2: f64,
    radius: f64,
    false_easting: f64,
    false_northing: f64,
    /// Cone constant
    n: f64,
    /// Scaled `F` constant (R * F)
    rf: f64,
    /// Radius of the parallel through the origin
    rho0: f64,
}

impl LambertConformal {
    /// Create a projection; all angles in degrees, radius in metres.
    pub fn new(lat_0: f64, lon_0: f64, lat_1: f64, lat_2: f64, radius: f64) -> Self {
        let phi1 = lat_1.to_radians();
        let phi2 = lat_2.to_radians();

        let n = if (phi1 - phi2).abs() < 1e-10 {
            phi1.sin()
        } else {
            (phi1.cos() / phi2.cos()).ln()
                / ((FRAC_PI_4 + phi2 / 2.0).tan() / (FRAC_PI_4 + phi1 / 2.0).tan()).ln()
        };
        let f = phi1.cos() * (FRAC_PI_4 + phi1 / 2.0).tan().powf(n) / n;
        let rf = radius * f;
        let rho0 = rf / (FRAC_PI_4 + lat_0.to_radians() / 2.0).tan().powf(n);

        Self {
            lat_0,
            lon_0,
            lat_1,
            lat_2,
            radius,
            false_easting: 0.0,
            false_northing: 0.0,
            n,
            rf,
            rho0,
        }
    }

    /// Shift projected coordinates by a false easting and northing.
    pub fn with_false_origin(mut self, easting: f64, northing: f64) -> Self {
        self.false_easting = easting;
        self.false_northing = northing;
        self
    }

    /// Latitude of the projection origin in degrees.
    pub fn lat_0(&self) -> f64 {
        self.lat_0
    }

    /// Central meridian in degrees.
    pub fn lon_0(&self) -> f64 {
        self.lon_0
    }

    /// Standard parallels in degrees.
    pub fn standard_parallels(&self) -> (f64, f64) {
        (self.lat_1, self.lat_2)
    }

    /// Sphere radius in metres.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// False easting and northing in metres.
    pub fn false_origin(&self) -> (f64, f64) {
        (self.false_easting, self.false_northing)
    }

    /// Project geographic coordinates (degrees) to `(x, y)` metres.
    pub fn forward(&self, lat: f64, lon: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let mut dlon = (lon - self.lon_0).to_radians();
        while dlon > std::f64::consts::PI {
            dlon -= 2.0 * std::f64::consts::PI;
        }
        while dlon < -std::f64::consts::PI {
            dlon += 2.0 * std::f64::consts::PI;
        }

        let rho = self.rf / (FRAC_PI_4 + phi / 2.0).tan().powf(self.n);
        let theta = self.n * dlon;

        (
            rho * theta.sin() + self.false_easting,
            self.rho0 - rho * theta.cos() + self.false_northing,
        )
    }

    /// Unproject `(x, y)` metres to geographic `(lat, lon)` in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let x = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);

        let sign = self.n.signum();
        let rho = sign * (x * x + dy * dy).sqrt();
        if rho == 0.0 {
            return (90.0 * sign, self.lon_0);
        }
        let theta = (sign * x).atan2(sign * dy);

        let phi = 2.0 * (self.rf / rho).powf(1.0 / self.n).atan() - std::f64::consts::FRAC_PI_2;
        let lon = self.lon_0 + (theta / self.n).to_degrees();

        (phi.to_degrees(), lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metcoop() -> LambertConformal {
        LambertConformal::new(63.0, 15.0, 63.0, 63.0, 6.371e6)
    }

    #[test]
    fn origin_maps_to_reference_point() {
        let (lat, lon) = metcoop().inverse(0.0, 0.0);
        assert!((lat - 63.0).abs() < 1e-9);
        assert!((lon - 15.0).abs() < 1e-9);
    }

    #[test]
    fn forward_and_inverse_agree() {
        let proj = metcoop();
        for &(lat, lon) in &[(53.5, 10.0), (70.1, 30.2), (50.0, -5.0)] {
            let (x, y) = proj.forward(lat, lon);
            let (lat2, lon2) = proj.inverse(x, y);
            assert!((lat - lat2).abs() < 1e-8, "{lat} vs {lat2}");
            assert!((lon - lon2).abs() < 1e-8, "{lon} vs {lon2}");
        }
    }

    #[test]
    fn secant_cone_round_trip() {
        let proj = LambertConformal::new(25.0, -95.0, 25.0, 35.0, 6_371_229.0)
            .with_false_origin(1000.0, -2000.0);
        let (x, y) = proj.forward(38.5, -97.5);
        let (lat, lon) = proj.inverse(x, y);
        assert!((lat - 38.5).abs() < 1e-8);
        assert!((lon + 97.5).abs() < 1e-8);
    }

    #[test]
    fn north_of_origin_has_positive_y() {
        let (x, y) = metcoop().forward(65.0, 15.0);
        assert!(x.abs() < 1e-6);
        assert!(y > 0.0);
    }
}
