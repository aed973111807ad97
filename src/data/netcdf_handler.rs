//! NetCDF reading.

use super::handler::{FileHandler, Message};
use crate::error::{MetgridError, Result};
use crate::grid::{Axis, EvenAxis, GaussianGrid, Grid, LatLonGrid};
use ndarray::{ArrayD, IxDyn};
use netcdf::types::{FloatType, IntType, NcVariableType};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fill value NetCDF uses for floating point variables without `_FillValue`.
pub const DEFAULT_FILL_VALUE: f64 = 9.96921e36;

/// Reads variables from a NetCDF file.
///
/// Values are unpacked with CF `scale_factor`/`add_offset`, and fill or
/// missing values become NaN. A lon/lat grid is inferred from 1-D
/// latitude/longitude coordinate variables on the trailing dimensions.
pub struct NetCdfHandler {
    path: PathBuf,
    file: Option<netcdf::File>,
}

impl NetCdfHandler {
    /// Handler for `path`; nothing is read before [`FileHandler::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Create a handler and load the file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut handler = Self::new(path);
        handler.load()?;
        Ok(handler)
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dimension names of `variable`.
    pub fn dims(&self, variable: &str) -> Result<Vec<String>> {
        let var = self
            .file()?
            .variable(variable)
            .ok_or_else(|| MetgridError::variable_not_found(variable))?;
        Ok(dim_names(&var))
    }

    fn file(&self) -> Result<&netcdf::File> {
        self.file.as_ref().ok_or_else(|| {
            MetgridError::NetCDF(format!("{} is not loaded", self.path.display()))
        })
    }
}

impl fmt::Debug for NetCdfHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetCdfHandler")
            .field("path", &self.path)
            .field("loaded", &self.file.is_some())
            .finish()
    }
}

impl FileHandler for NetCdfHandler {
    fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Err(MetgridError::file_open(
                self.path.clone(),
                io::Error::new(io::ErrorKind::NotFound, "no such file"),
            ));
        }
        let file = netcdf::open(&self.path)?;
        debug!(
            path = %self.path.display(),
            variables = file.variables().count(),
            "opened NetCDF file"
        );
        self.file = Some(file);
        Ok(())
    }

    fn variable_names(&self) -> Result<Vec<String>> {
        Ok(self
            .file()?
            .variables()
            .filter(|var| !is_coordinate_variable(var))
            .map(|var| var.name().to_string())
            .collect())
    }

    fn extract(&self, variable: &str) -> Result<Message> {
        let file = self.file()?;
        let var = file
            .variable(variable)
            .ok_or_else(|| MetgridError::variable_not_found(variable))?;

        let dims = dim_names(&var);
        let attributes: HashMap<String, String> = var
            .attributes()
            .map(|attr| (attr.name().to_string(), attr_value_to_string(&attr)))
            .collect();
        let data = read_unpacked(&var)?;
        let grid = infer_grid(file, &dims)?;

        debug!(
            variable,
            shape = ?data.shape(),
            grid = grid.as_ref().map(|g| g.kind().as_str()),
            "extracted variable"
        );

        Ok(Message {
            name: variable.to_string(),
            dims,
            data,
            attributes,
            grid,
        })
    }

    fn station_lonlat(&self) -> Result<Option<(f64, f64)>> {
        let file = self.file()?;
        let lat = scalar_value(file, &["lat", "latitude"])?;
        let lon = scalar_value(file, &["lon", "longitude"])?;
        Ok(lon.zip(lat))
    }
}

#[derive(Clone, Copy)]
enum Coordinate {
    Latitude,
    Longitude,
}

impl Coordinate {
    fn names(self) -> &'static [&'static str] {
        match self {
            Coordinate::Latitude => &["lat", "latitude"],
            Coordinate::Longitude => &["lon", "longitude"],
        }
    }

    fn units(self) -> &'static [&'static str] {
        match self {
            Coordinate::Latitude => &["degrees_north", "degree_north", "degrees_n", "degree_n"],
            Coordinate::Longitude => &["degrees_east", "degree_east", "degrees_e", "degree_e"],
        }
    }

    fn standard_name(self) -> &'static str {
        match self {
            Coordinate::Latitude => "latitude",
            Coordinate::Longitude => "longitude",
        }
    }

    fn matches(self, var: &netcdf::Variable<'_>) -> bool {
        let name = var.name().to_lowercase();
        if self.names().contains(&name.as_str()) {
            return true;
        }
        let text = |key: &str| var.attribute(key).map(|attr| attr_value_to_string(&attr).to_lowercase());
        text("standard_name").as_deref() == Some(self.standard_name())
            || text("units").is_some_and(|units| self.units().contains(&units.as_str()))
    }
}

fn dim_names(var: &netcdf::Variable<'_>) -> Vec<String> {
    var.dimensions()
        .iter()
        .map(|d: &netcdf::Dimension<'_>| d.name().to_string())
        .collect()
}

/// A variable named after its only dimension, or a scalar station coordinate.
fn is_coordinate_variable(var: &netcdf::Variable<'_>) -> bool {
    let dims = dim_names(var);
    let name = var.name().to_string();
    match dims.as_slice() {
        [dim] => *dim == name,
        [] => Coordinate::Latitude.names().contains(&name.as_str())
            || Coordinate::Longitude.names().contains(&name.as_str()),
        _ => false,
    }
}

/// Lon/lat grid of the last two dimensions, from their coordinate variables.
fn infer_grid(file: &netcdf::File, dims: &[String]) -> Result<Option<Grid>> {
    let [.., ydim, xdim] = dims else {
        return Ok(None);
    };
    let (Some(yvar), Some(xvar)) = (file.variable(ydim), file.variable(xdim)) else {
        return Ok(None);
    };
    let one_dimensional = yvar.dimensions().len() == 1 && xvar.dimensions().len() == 1;
    if !one_dimensional || !Coordinate::Latitude.matches(&yvar) || !Coordinate::Longitude.matches(&xvar) {
        return Ok(None);
    }

    let y = fit_axis(read_unpacked(&yvar)?.iter().copied().collect());
    let x = fit_axis(read_unpacked(&xvar)?.iter().copied().collect());
    let grid = match (y, x) {
        (Axis::Even(y), Axis::Even(x)) => Grid::LatLon(LatLonGrid::new(y, x)),
        (y, x) => Grid::Gaussian(GaussianGrid::new(y, x)),
    };
    Ok(Some(grid))
}

/// An even axis if the values lie on a line, else the values themselves.
fn fit_axis(values: Vec<f64>) -> Axis {
    match values.len() {
        0 => return Axis::Values(Vec::new()),
        1 => return Axis::Even(EvenAxis::new(values[0], 0.0, 1)),
        _ => {}
    }
    let (first, last) = (values[0], values[values.len() - 1]);
    let inc = (last - first) / (values.len() - 1) as f64;
    let tolerance = 1e-3 * inc.abs();
    let even = values
        .iter()
        .enumerate()
        .all(|(k, v)| (v - (first + k as f64 * inc)).abs() <= tolerance);
    if even {
        Axis::Even(EvenAxis::new(first, inc, values.len()))
    } else {
        Axis::Values(values)
    }
}

fn scalar_value(file: &netcdf::File, names: &[&str]) -> Result<Option<f64>> {
    for name in names {
        if let Some(var) = file.variable(name) {
            if var.dimensions().is_empty() {
                return Ok(read_unpacked(&var)?.iter().next().copied());
            }
        }
    }
    Ok(None)
}

/// Variable values with fill values masked and CF packing undone.
fn read_unpacked(var: &netcdf::Variable<'_>) -> Result<ArrayD<f64>> {
    let mut data = read_variable_array(var)?;

    let fill = var
        .attribute("_FillValue")
        .or_else(|| var.attribute("missing_value"))
        .and_then(|attr| attr_number(&attr))
        .unwrap_or(DEFAULT_FILL_VALUE);
    data.mapv_inplace(|v| if is_fill(v, fill) { f64::NAN } else { v });

    let scale_factor = var
        .attribute("scale_factor")
        .and_then(|attr| attr_number(&attr))
        .unwrap_or(1.0);
    let add_offset = var
        .attribute("add_offset")
        .and_then(|attr| attr_number(&attr))
        .unwrap_or(0.0);
    if scale_factor != 1.0 || add_offset != 0.0 {
        data.mapv_inplace(|v| v * scale_factor + add_offset);
    }
    Ok(data)
}

/// Fill values stored as f32 differ from their f64 spelling in the last bits.
fn is_fill(value: f64, fill: f64) -> bool {
    value == fill || (value - fill).abs() <= fill.abs() * f64::from(f32::EPSILON)
}

fn read_variable_array(var: &netcdf::Variable<'_>) -> Result<ArrayD<f64>> {
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let vartype = var.vartype();

    macro_rules! read_as {
        ($t:ty) => {{
            let values: Vec<$t> = var.get_values(..).map_err(|e| {
                MetgridError::NetCDF(format!(
                    "failed to read {} as {}: {}",
                    var.name(),
                    stringify!($t),
                    e
                ))
            })?;
            values.into_iter().map(|x| x as f64).collect::<Vec<f64>>()
        }};
    }

    let values = match vartype {
        NcVariableType::Float(FloatType::F64) => read_as!(f64),
        NcVariableType::Float(FloatType::F32) => read_as!(f32),
        NcVariableType::Int(IntType::I64) => read_as!(i64),
        NcVariableType::Int(IntType::I32) => read_as!(i32),
        NcVariableType::Int(IntType::I16) => read_as!(i16),
        NcVariableType::Int(IntType::I8) => read_as!(i8),
        NcVariableType::Int(IntType::U64) => read_as!(u64),
        NcVariableType::Int(IntType::U32) => read_as!(u32),
        NcVariableType::Int(IntType::U16) => read_as!(u16),
        NcVariableType::Int(IntType::U8) => read_as!(u8),
        NcVariableType::Char | NcVariableType::String => {
            return Err(MetgridError::NetCDF(format!(
                "{} holds text, not numbers",
                var.name()
            )))
        }
        _ => {
            return Err(MetgridError::NetCDF(format!(
                "unsupported variable type: {vartype:?}"
            )))
        }
    };

    ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| MetgridError::NetCDF(format!("invalid shape/data size: {e}")))
}

/// First number of a numeric attribute.
fn attr_number(attr: &netcdf::Attribute<'_>) -> Option<f64> {
    use netcdf::AttributeValue;

    match attr.value().ok()? {
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Ulonglong(v) => Some(v as f64),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Shorts(v) => v.first().copied().map(f64::from),
        AttributeValue::Ints(v) => v.first().copied().map(f64::from),
        AttributeValue::Floats(v) => v.first().copied().map(f64::from),
        AttributeValue::Doubles(v) => v.first().copied(),
        _ => None,
    }
}

fn attr_value_to_string(attr: &netcdf::Attribute<'_>) -> String {
    use netcdf::AttributeValue;

    match attr.value() {
        Ok(AttributeValue::Uchar(v)) => v.to_string(),
        Ok(AttributeValue::Schar(v)) => v.to_string(),
        Ok(AttributeValue::Ushort(v)) => v.to_string(),
        Ok(AttributeValue::Short(v)) => v.to_string(),
        Ok(AttributeValue::Uint(v)) => v.to_string(),
        Ok(AttributeValue::Int(v)) => v.to_string(),
        Ok(AttributeValue::Ulonglong(v)) => v.to_string(),
        Ok(AttributeValue::Longlong(v)) => v.to_string(),
        Ok(AttributeValue::Float(v)) => v.to_string(),
        Ok(AttributeValue::Double(v)) => v.to_string(),
        Ok(AttributeValue::Str(v)) => v,
        Ok(AttributeValue::Uchars(v)) => format!("{v:?}"),
        Ok(AttributeValue::Schars(v)) => format!("{v:?}"),
        Ok(AttributeValue::Ushorts(v)) => format!("{v:?}"),
        Ok(AttributeValue::Shorts(v)) => format!("{v:?}"),
        Ok(AttributeValue::Uints(v)) => format!("{v:?}"),
        Ok(AttributeValue::Ints(v)) => format!("{v:?}"),
        Ok(AttributeValue::Ulonglongs(v)) => format!("{v:?}"),
        Ok(AttributeValue::Longlongs(v)) => format!("{v:?}"),
        Ok(AttributeValue::Floats(v)) => format!("{v:?}"),
        Ok(AttributeValue::Doubles(v)) => format!("{v:?}"),
        Ok(AttributeValue::Strs(v)) => v.join(", "),
        Err(_) => format!("{attr:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_axis_detects_even_spacing() {
        assert_eq!(
            fit_axis(vec![50.0, 50.5, 51.0, 51.5]),
            Axis::Even(EvenAxis::new(50.0, 0.5, 4))
        );
        assert_eq!(
            fit_axis(vec![88.57, 84.75, 80.95]),
            Axis::Values(vec![88.57, 84.75, 80.95])
        );
        assert_eq!(fit_axis(vec![3.0]), Axis::Even(EvenAxis::new(3.0, 0.0, 1)));
    }

    #[test]
    fn fill_comparison_tolerates_f32_rounding() {
        let stored = f64::from(9.96921e36_f32);
        assert!(is_fill(stored, DEFAULT_FILL_VALUE));
        assert!(is_fill(-999.0, -999.0));
        assert!(!is_fill(-998.0, -999.0));
    }

    #[test]
    fn unloaded_handler_reports_error() {
        let handler = NetCdfHandler::new("never-loaded.nc");
        assert!(matches!(handler.variable_names(), Err(MetgridError::NetCDF(_))));
    }

    #[test]
    fn missing_file_is_file_open_error() {
        let mut handler = NetCdfHandler::new("/definitely/not/here.nc");
        assert!(matches!(handler.load(), Err(MetgridError::FileOpen { .. })));
    }
}
