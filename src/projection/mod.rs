//! Map projections for projected grids.
//!
//! Projections are spherical. They are built from a proj4 string or from CF
//! grid mapping parameters and translate projected `(x, y)` grid coordinates
//! to geographic latitude and longitude.

mod lambert;
mod rotated;

pub use lambert::LambertConformal;
pub use rotated::RotatedPole;

use crate::error::{MetgridError, Result};
use std::collections::HashMap;

/// Sphere radius used when a definition names none, in metres.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// A supported map projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Lambert Conformal Conic; `(x, y)` in metres.
    LambertConformal(LambertConformal),
    /// Rotated pole; `(x, y)` are rotated longitude/latitude in degrees.
    RotatedPole(RotatedPole),
    /// Plain longitude/latitude; `(x, y)` are longitude/latitude in degrees.
    LongLat,
}

impl Projection {
    /// Parse a proj4 definition such as
    /// `+proj=lcc +lat_0=63 +lon_0=15 +lat_1=63 +lat_2=63 +R=6.371e+06`.
    pub fn from_proj4(definition: &str) -> Result<Self> {
        let params = proj4_params(definition)?;
        let proj = params
            .get("proj")
            .and_then(|v| v.as_deref())
            .ok_or_else(|| MetgridError::Projection(format!("no +proj in `{definition}`")))?;

        match proj {
            "lcc" => {
                let lat_1 = required(&params, "lat_1")?;
                let lat_2 = optional(&params, "lat_2")?.unwrap_or(lat_1);
                let lat_0 = optional(&params, "lat_0")?.unwrap_or(0.0);
                let lon_0 = optional(&params, "lon_0")?.unwrap_or(0.0);
                let radius = radius(&params)?;
                let x_0 = optional(&params, "x_0")?.unwrap_or(0.0);
                let y_0 = optional(&params, "y_0")?.unwrap_or(0.0);
                Ok(Projection::LambertConformal(
                    LambertConformal::new(lat_0, lon_0, lat_1, lat_2, radius).with_false_origin(x_0, y_0),
                ))
            }
            "ob_tran" => {
                match params.get("o_proj").and_then(|v| v.as_deref()) {
                    Some("longlat" | "latlong" | "lonlat" | "latlon") => {}
                    other => {
                        return Err(MetgridError::Projection(format!(
                            "ob_tran needs +o_proj=longlat, got {other:?}"
                        )))
                    }
                }
                let o_lat_p = required(&params, "o_lat_p")?;
                let o_lon_p = optional(&params, "o_lon_p")?.unwrap_or(0.0);
                let lon_0 = optional(&params, "lon_0")?.unwrap_or(0.0);
                let pole_lon = normalize_lon(lon_0 - 180.0 + o_lon_p);
                Ok(Projection::RotatedPole(RotatedPole::new(o_lat_p, pole_lon)))
            }
            "longlat" | "latlong" | "lonlat" | "latlon" => Ok(Projection::LongLat),
            other => Err(MetgridError::Projection(format!("unsupported projection `{other}`"))),
        }
    }

    /// Render as a proj4 string that [`Projection::from_proj4`] accepts.
    pub fn to_proj4(&self) -> String {
        match self {
            Projection::LambertConformal(lcc) => {
                let (lat_1, lat_2) = lcc.standard_parallels();
                let mut definition = format!(
                    "+proj=lcc +lat_0={} +lon_0={} +lat_1={} +lat_2={} +R={}",
                    lcc.lat_0(),
                    lcc.lon_0(),
                    lat_1,
                    lat_2,
                    lcc.radius()
                );
                let (x_0, y_0) = lcc.false_origin();
                if x_0 != 0.0 || y_0 != 0.0 {
                    definition.push_str(&format!(" +x_0={x_0} +y_0={y_0}"));
                }
                definition.push_str(" +no_defs");
                definition
            }
            Projection::RotatedPole(pole) => format!(
                "+proj=ob_tran +o_proj=longlat +o_lat_p={} +o_lon_p=0 +lon_0={}",
                pole.pole_lat(),
                normalize_lon(pole.pole_lon() + 180.0)
            ),
            Projection::LongLat => "+proj=longlat +no_defs".to_string(),
        }
    }

    /// Projected `(x, y)` to geographic `(lat, lon)` in degrees.
    pub fn to_lat_lon(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::LambertConformal(lcc) => lcc.inverse(x, y),
            Projection::RotatedPole(pole) => pole.unrotate(x, y),
            Projection::LongLat => (y, x),
        }
    }

    /// Geographic `(lat, lon)` in degrees to projected `(x, y)`.
    pub fn from_lat_lon(&self, lat: f64, lon: f64) -> (f64, f64) {
        match self {
            Projection::LambertConformal(lcc) => lcc.forward(lat, lon),
            Projection::RotatedPole(pole) => pole.rotate(lat, lon),
            Projection::LongLat => (lon, lat),
        }
    }
}

type Proj4Params = HashMap<String, Option<String>>;

fn proj4_params(definition: &str) -> Result<Proj4Params> {
    let mut params = HashMap::new();
    for token in definition.split_whitespace() {
        let token = token.strip_prefix('+').ok_or_else(|| {
            MetgridError::Projection(format!("proj4 token `{token}` does not start with `+`"))
        })?;
        match token.split_once('=') {
            Some((key, value)) => params.insert(key.to_lowercase(), Some(value.to_string())),
            None => params.insert(token.to_lowercase(), None),
        };
    }
    Ok(params)
}

fn optional(params: &Proj4Params, key: &str) -> Result<Option<f64>> {
    match params.get(key) {
        Some(Some(value)) => value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| MetgridError::Projection(format!("+{key}={value} is not a number"))),
        Some(None) => Err(MetgridError::Projection(format!("+{key} needs a value"))),
        None => Ok(None),
    }
}

fn required(params: &Proj4Params, key: &str) -> Result<f64> {
    optional(params, key)?.ok_or_else(|| MetgridError::Projection(format!("missing +{key}")))
}

fn radius(params: &Proj4Params) -> Result<f64> {
    Ok(optional(params, "r")?
        .or(optional(params, "a")?)
        .unwrap_or(EARTH_RADIUS))
}

/// Wrap a longitude into `[-180, 180)`.
pub(crate) fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const METCOOP: &str = "+proj=lcc +lat_0=63 +lon_0=15 +lat_1=63 +lat_2=63 +no_defs +R=6.371e+06";

    #[test]
    fn parses_lambert_proj4() {
        let proj = Projection::from_proj4(METCOOP).unwrap();
        match &proj {
            Projection::LambertConformal(lcc) => {
                assert_eq!(lcc.lat_0(), 63.0);
                assert_eq!(lcc.lon_0(), 15.0);
                assert_eq!(lcc.radius(), 6.371e6);
            }
            other => panic!("unexpected projection {other:?}"),
        }
        let (lat, lon) = proj.to_lat_lon(0.0, 0.0);
        assert!((lat - 63.0).abs() < 1e-9);
        assert!((lon - 15.0).abs() < 1e-9);
    }

    #[test]
    fn ob_tran_conventions_agree() {
        let legacy = Projection::from_proj4(
            "+proj=ob_tran +o_proj=longlat +o_lon_p=-170.415 +o_lat_p=36.0625 +lon_0=180",
        )
        .unwrap();
        let standard = Projection::from_proj4(
            "+proj=ob_tran +o_proj=longlat +o_lon_p=0 +o_lat_p=36.0625 +lon_0=9.585",
        )
        .unwrap();

        let (lat_a, lon_a) = legacy.to_lat_lon(3.0, -2.0);
        let (lat_b, lon_b) = standard.to_lat_lon(3.0, -2.0);
        assert!((lat_a - lat_b).abs() < 1e-9);
        assert!((lon_a - lon_b).abs() < 1e-9);
    }

    #[test]
    fn proj4_output_parses_back() {
        for definition in [
            METCOOP,
            "+proj=ob_tran +o_proj=longlat +o_lat_p=40 +o_lon_p=0 +lon_0=10",
            "+proj=lcc +lat_1=25 +lat_2=35 +lon_0=-95 +x_0=500 +y_0=-20",
        ] {
            let proj = Projection::from_proj4(definition).unwrap();
            let again = Projection::from_proj4(&proj.to_proj4()).unwrap();
            let a = proj.to_lat_lon(1.5, 2.5);
            let b = again.to_lat_lon(1.5, 2.5);
            assert!((a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_unknown_projection() {
        let err = Projection::from_proj4("+proj=merc +lon_0=0").unwrap_err();
        assert!(err.to_string().contains("merc"));
        assert!(Projection::from_proj4("+proj=lcc +lat_0=10").is_err());
        assert!(Projection::from_proj4("proj=lcc").is_err());
    }

    #[test]
    fn normalizes_longitudes() {
        assert_eq!(normalize_lon(190.0), -170.0);
        assert_eq!(normalize_lon(-180.0), -180.0);
        assert_eq!(normalize_lon(180.0), -180.0);
        assert!((normalize_lon(9.585) - 9.585).abs() < 1e-9);
    }
}
