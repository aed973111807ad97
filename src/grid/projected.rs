//! Grids that are regular in a projected coordinate system.

use super::axis::EvenAxis;
use super::description::GridDescription;
use super::flat_indices;
use super::unstructured::UnstructuredGrid;
use crate::projection::Projection;
use std::ops::Range;

/// Evenly spaced `x`/`y` axes in projected space plus the projection that
/// maps them to longitude and latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionGrid {
    y: EvenAxis,
    x: EvenAxis,
    projection: Projection,
}

impl ProjectionGrid {
    /// Create a grid from its projected axes.
    pub fn new(y: EvenAxis, x: EvenAxis, projection: Projection) -> Self {
        Self { y, x, projection }
    }

    /// Projected y axis.
    pub fn y(&self) -> &EvenAxis {
        &self.y
    }

    /// Projected x axis.
    pub fn x(&self) -> &EvenAxis {
        &self.x
    }

    /// The projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// `[ysize, xsize]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.y.len(), self.x.len()]
    }

    /// Projected `(y, x)` at `(j, i)`, before any transform.
    pub fn coordinate(&self, j: usize, i: usize) -> (f64, f64) {
        (self.y.value(j), self.x.value(i))
    }

    /// Latitude and longitude in degrees at `(j, i)`.
    pub fn lat_lon(&self, j: usize, i: usize) -> (f64, f64) {
        self.projection.to_lat_lon(self.x.value(i), self.y.value(j))
    }

    /// Points in the given index ranges as an unstructured grid.
    ///
    /// The projected regularity is lost; the result keeps only the
    /// geographic coordinates of the selected points.
    pub fn slice(&self, y: Range<usize>, x: Range<usize>) -> UnstructuredGrid {
        let cells = flat_indices(self.x.len(), &y, &x);
        self.select(&cells)
    }

    pub(crate) fn select(&self, cells: &[usize]) -> UnstructuredGrid {
        let nx = self.x.len();
        let (lat, lon) = cells.iter().map(|&c| self.lat_lon(c / nx, c % nx)).unzip();
        UnstructuredGrid::from_parts(lat, lon, None)
    }

    /// Grid description in griddes form.
    pub fn describe(&self) -> GridDescription {
        let mut desc = GridDescription::new();
        desc.insert("gridtype", "projection");
        desc.insert("gridsize", self.y.len() * self.x.len());
        desc.insert("xsize", self.x.len());
        desc.insert("ysize", self.y.len());
        desc.insert("xname", "x");
        desc.insert("yname", "y");
        desc.insert("xfirst", self.x.first());
        desc.insert("xinc", self.x.inc());
        desc.insert("yfirst", self.y.first());
        desc.insert("yinc", self.y.inc());
        desc.insert("proj4", self.projection.to_proj4());
        desc
    }
}
