//! Building grids from griddes descriptions.

use super::axis::{AngleUnit, Axis, EvenAxis};
use super::curvilinear::{CurvilinearGrid, DEFAULT_NVERTEX};
use super::description::{GridDescription, GridValue};
use super::gaussian::GaussianGrid;
use super::lonlat::LatLonGrid;
use super::projected::ProjectionGrid;
use super::unstructured::{CellBounds, UnstructuredGrid};
use super::{Grid, GridKind};
use crate::error::{MetgridError, ParseError, Result};
use crate::projection::{LambertConformal, Projection, RotatedPole, EARTH_RADIUS};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Turns a [`GridDescription`] into a [`Grid`].
///
/// Per-point coordinates of curvilinear and unstructured grids are often kept
/// apart from the header; [`GridBuilder::with_values`] adds them before
/// [`GridBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct GridBuilder {
    description: GridDescription,
}

impl GridBuilder {
    /// Start from an already decoded description.
    pub fn new(description: GridDescription) -> Self {
        Self { description }
    }

    /// Start from griddes text.
    pub fn from_text(text: &str) -> Self {
        Self::new(GridDescription::parse(text))
    }

    /// Start from a griddes file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| MetgridError::file_open(path.to_path_buf(), e))?;
        Ok(Self::from_text(&text))
    }

    /// Set a number list such as `xvals` or `ybounds`.
    pub fn with_values(mut self, key: &str, values: Vec<f64>) -> Self {
        self.description.insert(key, values);
        self
    }

    /// The description built so far.
    pub fn description(&self) -> &GridDescription {
        &self.description
    }

    /// Build the grid selected by `gridtype`.
    pub fn build(&self) -> Result<Grid> {
        let gridtype = match self.description.get("gridtype") {
            Some(GridValue::Text(text)) => text.as_str(),
            Some(other) => {
                return Err(ParseError::invalid_value("gridtype", format!("`{other}` is not a grid type")).into())
            }
            None => return Err(ParseError::missing_key("gridtype", "?").into()),
        };
        let kind: GridKind = gridtype.parse()?;
        debug!(gridtype = kind.as_str(), entries = self.description.len(), "building grid");

        let keys = Keys {
            description: &self.description,
            gridtype: kind.as_str(),
        };
        let grid = match kind {
            GridKind::LatLon => build_lonlat(&keys)?,
            GridKind::Gaussian => build_gaussian(&keys)?,
            GridKind::Projection => build_projection(&keys)?,
            GridKind::Curvilinear => build_curvilinear(&keys)?,
            GridKind::Unstructured => build_unstructured(&keys)?,
        };

        if let Some(gridsize) = keys.optional_size("gridsize")? {
            let points = grid
                .shape()
                .into_iter()
                .try_fold(1, |n: usize, len| n.checked_mul(len))
                .ok_or_else(|| ParseError::invalid_value("gridsize", "grid point count overflows"))?;
            if gridsize != points {
                return Err(ParseError::invalid_value(
                    "gridsize",
                    format!("{gridsize} does not match {points} grid points"),
                )
                .into());
            }
        }

        debug!(shape = ?grid.shape(), "built {} grid", kind);
        Ok(grid)
    }
}

/// Typed key lookups that report errors against the grid type.
struct Keys<'a> {
    description: &'a GridDescription,
    gridtype: &'static str,
}

impl Keys<'_> {
    fn get(&self, key: &str) -> std::result::Result<&GridValue, ParseError> {
        self.description
            .get(key)
            .ok_or_else(|| ParseError::missing_key(key, self.gridtype))
    }

    fn contains(&self, key: &str) -> bool {
        self.description.contains(key)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.description.get(key).and_then(GridValue::as_text)
    }

    fn number(&self, key: &str) -> Result<f64> {
        let value = self.get(key)?;
        value
            .as_f64()
            .ok_or_else(|| ParseError::invalid_value(key, format!("`{value}` is not a number")).into())
    }

    fn optional_number(&self, key: &str) -> Result<Option<f64>> {
        if self.contains(key) {
            self.number(key).map(Some)
        } else {
            Ok(None)
        }
    }

    fn size(&self, key: &str) -> Result<usize> {
        let n = self.number(key)?;
        if n < 1.0 || n.fract() != 0.0 {
            return Err(ParseError::invalid_value(key, format!("{n} is not a positive integer")).into());
        }
        if n >= usize::MAX as f64 {
            return Err(ParseError::invalid_value(key, format!("{n} is too large")).into());
        }
        Ok(n as usize)
    }

    /// `a * b` for sizes read from `key`, failing instead of overflowing.
    fn product(&self, key: &str, a: usize, b: usize) -> Result<usize> {
        a.checked_mul(b)
            .ok_or_else(|| ParseError::invalid_value(key, format!("{a} x {b} overflows")).into())
    }

    /// `(xsize, ysize)` of a structured grid whose point count fits a `usize`.
    fn xy_sizes(&self) -> Result<(usize, usize)> {
        let xsize = self.size("xsize")?;
        let ysize = self.size("ysize")?;
        self.product("ysize", xsize, ysize)?;
        Ok((xsize, ysize))
    }

    fn optional_size(&self, key: &str) -> Result<Option<usize>> {
        if self.contains(key) {
            self.size(key).map(Some)
        } else {
            Ok(None)
        }
    }

    fn list(&self, key: &str, len: usize) -> Result<Vec<f64>> {
        let value = self.get(key)?;
        let values = value
            .to_list()
            .ok_or_else(|| ParseError::invalid_value(key, "expected a list of numbers"))?;
        if values.len() != len {
            return Err(
                ParseError::invalid_value(key, format!("expected {len} values, found {}", values.len())).into(),
            );
        }
        Ok(values)
    }

    fn angle_unit(&self, key: &str) -> Result<AngleUnit> {
        match self.text(key) {
            None => Ok(AngleUnit::Degrees),
            Some(units) => AngleUnit::parse(units)
                .ok_or_else(|| ParseError::invalid_value(key, format!("`{units}` is not an angle unit")).into()),
        }
    }

    fn even_axis(&self, dim: &str, size: usize) -> Result<EvenAxis> {
        let first = self.number(&format!("{dim}first"))?;
        let inc = self.number(&format!("{dim}inc"))?;
        Ok(EvenAxis::new(first, inc, size))
    }
}

fn build_lonlat(keys: &Keys<'_>) -> Result<Grid> {
    let (xsize, ysize) = keys.xy_sizes()?;
    let x = keys.even_axis("x", xsize)?;
    let y = keys.even_axis("y", ysize)?;
    let grid = LatLonGrid::new(y, x).with_units(keys.angle_unit("yunits")?, keys.angle_unit("xunits")?);
    Ok(grid.into())
}

fn build_gaussian(keys: &Keys<'_>) -> Result<Grid> {
    let (xsize, ysize) = keys.xy_sizes()?;
    let x = listed_or_even_axis(keys, "x", xsize)?;
    let y = listed_or_even_axis(keys, "y", ysize)?;
    let grid = GaussianGrid::new(y, x).with_units(keys.angle_unit("yunits")?, keys.angle_unit("xunits")?);
    Ok(grid.into())
}

fn listed_or_even_axis(keys: &Keys<'_>, dim: &str, size: usize) -> Result<Axis> {
    let vals = format!("{dim}vals");
    if keys.contains(&vals) {
        Ok(Axis::Values(keys.list(&vals, size)?))
    } else {
        Ok(Axis::Even(keys.even_axis(dim, size)?))
    }
}

fn build_projection(keys: &Keys<'_>) -> Result<Grid> {
    let (xsize, ysize) = keys.xy_sizes()?;
    let x = scaled(keys.even_axis("x", xsize)?, keys.text("xunits"));
    let y = scaled(keys.even_axis("y", ysize)?, keys.text("yunits"));

    let projection = match keys.text("proj4") {
        Some(definition) => Projection::from_proj4(definition)
            .map_err(|e| ParseError::invalid_value("proj4", e.to_string()))?,
        None => cf_projection(keys)?,
    };
    Ok(ProjectionGrid::new(y, x, projection).into())
}

/// Projected axes given in kilometres are stored in metres.
fn scaled(axis: EvenAxis, units: Option<&str>) -> EvenAxis {
    match units {
        Some(units) if units.eq_ignore_ascii_case("km") => {
            EvenAxis::new(axis.first() * 1000.0, axis.inc() * 1000.0, axis.len())
        }
        _ => axis,
    }
}

/// Projection from CF grid mapping attributes.
fn cf_projection(keys: &Keys<'_>) -> Result<Projection> {
    let name = match (keys.text("grid_mapping_name"), keys.text("grid_mapping")) {
        (Some(name), _) => name.to_lowercase(),
        (None, Some(mapping)) if mapping.eq_ignore_ascii_case("rotated_pole") => {
            "rotated_latitude_longitude".to_string()
        }
        _ => return Err(ParseError::missing_key("proj4", keys.gridtype).into()),
    };

    match name.as_str() {
        "lambert_conformal_conic" => {
            let parallels = keys
                .get("standard_parallel")?
                .to_list()
                .filter(|p| matches!(p.len(), 1 | 2))
                .ok_or_else(|| ParseError::invalid_value("standard_parallel", "expected one or two latitudes"))?;
            let lat_1 = parallels[0];
            let lat_2 = parallels.last().copied().unwrap_or(lat_1);
            let lon_0 = keys.number("longitude_of_central_meridian")?;
            let lat_0 = keys.number("latitude_of_projection_origin")?;
            let radius = keys.optional_number("earth_radius")?.unwrap_or(EARTH_RADIUS);
            let false_easting = keys.optional_number("false_easting")?.unwrap_or(0.0);
            let false_northing = keys.optional_number("false_northing")?.unwrap_or(0.0);
            Ok(Projection::LambertConformal(
                LambertConformal::new(lat_0, lon_0, lat_1, lat_2, radius)
                    .with_false_origin(false_easting, false_northing),
            ))
        }
        "rotated_latitude_longitude" => {
            let pole_lat = keys.number("grid_north_pole_latitude")?;
            let pole_lon = keys.number("grid_north_pole_longitude")?;
            Ok(Projection::RotatedPole(RotatedPole::new(pole_lat, pole_lon)))
        }
        "latitude_longitude" => Ok(Projection::LongLat),
        other => Err(ParseError::invalid_value(
            "grid_mapping_name",
            format!("unsupported grid mapping `{other}`"),
        )
        .into()),
    }
}

fn build_curvilinear(keys: &Keys<'_>) -> Result<Grid> {
    let xsize = keys.size("xsize")?;
    let ysize = keys.size("ysize")?;
    let size = keys.product("ysize", xsize, ysize)?;
    let lon = degrees(keys.list("xvals", size)?, keys.angle_unit("xunits")?);
    let lat = degrees(keys.list("yvals", size)?, keys.angle_unit("yunits")?);
    let mut grid = CurvilinearGrid::new(ysize, xsize, lat, lon)?;

    let nvertex = keys.optional_size("nvertex")?.unwrap_or(DEFAULT_NVERTEX);
    if let Some(bounds) = cell_bounds(keys, nvertex, size)? {
        grid = grid.with_bounds(bounds)?;
    }
    Ok(grid.into())
}

fn build_unstructured(keys: &Keys<'_>) -> Result<Grid> {
    let size = keys.size("gridsize")?;
    let lon = degrees(keys.list("xvals", size)?, keys.angle_unit("xunits")?);
    let lat = degrees(keys.list("yvals", size)?, keys.angle_unit("yunits")?);
    let mut grid = UnstructuredGrid::new(lat, lon)?;

    if keys.contains("xbounds") || keys.contains("ybounds") {
        let nvertex = keys.size("nvertex")?;
        if let Some(bounds) = cell_bounds(keys, nvertex, size)? {
            grid = grid.with_bounds(bounds)?;
        }
    }
    Ok(grid.into())
}

/// Vertex bounds, when the description has any; both axes must be given.
fn cell_bounds(keys: &Keys<'_>, nvertex: usize, cells: usize) -> Result<Option<CellBounds>> {
    if !keys.contains("xbounds") && !keys.contains("ybounds") {
        return Ok(None);
    }
    let len = keys.product("nvertex", nvertex, cells)?;
    let lon = degrees(keys.list("xbounds", len)?, keys.angle_unit("xunits")?);
    let lat = degrees(keys.list("ybounds", len)?, keys.angle_unit("yunits")?);
    CellBounds::new(nvertex, cells, lat, lon).map(Some)
}

fn degrees(values: Vec<f64>, unit: AngleUnit) -> Vec<f64> {
    match unit {
        AngleUnit::Degrees => values,
        AngleUnit::Radians => values.into_iter().map(f64::to_degrees).collect(),
    }
}
