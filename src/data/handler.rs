//! The file handler contract and the messages handlers emit.

use crate::error::Result;
use crate::grid::Grid;
use ndarray::ArrayD;
use std::collections::HashMap;

/// One variable read from a file: its values, dimension names, attributes
/// and, when the file describes one, its grid.
#[derive(Debug, Clone)]
pub struct Message {
    /// Variable name.
    pub name: String,
    /// Dimension names, outermost first.
    pub dims: Vec<String>,
    /// Values as f64; missing values are NaN.
    pub data: ArrayD<f64>,
    /// Variable attributes rendered as text.
    pub attributes: HashMap<String, String>,
    /// Grid of the trailing dimensions, if one could be inferred.
    pub grid: Option<Grid>,
}

impl Message {
    /// Shape of the data.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }
}

/// A reader for one file format.
pub trait FileHandler {
    /// Open the file and read its metadata.
    fn load(&mut self) -> Result<()>;

    /// Names of the data variables, without coordinate variables.
    fn variable_names(&self) -> Result<Vec<String>>;

    /// Read one variable.
    fn extract(&self, variable: &str) -> Result<Message>;

    /// `(lon, lat)` of the station a file belongs to, for point data.
    fn station_lonlat(&self) -> Result<Option<(f64, f64)>> {
        Ok(None)
    }
}
