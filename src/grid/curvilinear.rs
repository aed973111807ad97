//! Curvilinear grids: a 2-D index space with per-point coordinates.

use super::description::GridDescription;
use super::unstructured::{CellBounds, UnstructuredGrid};
use super::flat_indices;
use crate::error::{MetgridError, Result};
use std::ops::Range;

/// Vertices per cell assumed when a curvilinear grid names none.
pub const DEFAULT_NVERTEX: usize = 4;

/// A grid of `ysize * xsize` points, each with its own latitude/longitude.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvilinearGrid {
    ysize: usize,
    xsize: usize,
    lat: Vec<f64>,
    lon: Vec<f64>,
    bounds: Option<CellBounds>,
}

impl CurvilinearGrid {
    /// Create from row-major latitudes and longitudes in degrees.
    pub fn new(ysize: usize, xsize: usize, lat: Vec<f64>, lon: Vec<f64>) -> Result<Self> {
        let size = ysize * xsize;
        if lat.len() != size || lon.len() != size {
            return Err(MetgridError::shape_mismatch(&[size, size], &[lat.len(), lon.len()]));
        }
        Ok(Self {
            ysize,
            xsize,
            lat,
            lon,
            bounds: None,
        })
    }

    /// Attach per-point vertex bounds.
    pub fn with_bounds(mut self, bounds: CellBounds) -> Result<Self> {
        if bounds.cells() != self.lat.len() {
            return Err(MetgridError::shape_mismatch(&[self.lat.len()], &[bounds.cells()]));
        }
        self.bounds = Some(bounds);
        Ok(self)
    }

    /// `[ysize, xsize]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.ysize, self.xsize]
    }

    /// Vertex bounds, if known.
    pub fn bounds(&self) -> Option<&CellBounds> {
        self.bounds.as_ref()
    }

    /// Row-major latitudes.
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Row-major longitudes.
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Latitude and longitude at `(j, i)`.
    pub fn lat_lon(&self, j: usize, i: usize) -> (f64, f64) {
        let k = j * self.xsize + i;
        (self.lat[k], self.lon[k])
    }

    /// Points in the given index ranges as an unstructured grid.
    pub fn slice(&self, y: Range<usize>, x: Range<usize>) -> UnstructuredGrid {
        let cells = flat_indices(self.xsize, &y, &x);
        self.select(&cells)
    }

    pub(crate) fn select(&self, cells: &[usize]) -> UnstructuredGrid {
        UnstructuredGrid::from_parts(
            cells.iter().map(|&c| self.lat[c]).collect(),
            cells.iter().map(|&c| self.lon[c]).collect(),
            self.bounds.as_ref().map(|b| b.select(cells)),
        )
    }

    /// Grid description in griddes form.
    pub fn describe(&self) -> GridDescription {
        let mut desc = GridDescription::new();
        desc.insert("gridtype", "curvilinear");
        desc.insert("gridsize", self.ysize * self.xsize);
        desc.insert("xsize", self.xsize);
        desc.insert("ysize", self.ysize);
        if let Some(bounds) = &self.bounds {
            desc.insert("nvertex", bounds.nvertex());
        }
        desc.insert("xname", "lon");
        desc.insert("xunits", "degrees");
        desc.insert("yname", "lat");
        desc.insert("yunits", "degrees");
        desc.insert("xvals", self.lon.clone());
        if let Some(bounds) = &self.bounds {
            desc.insert("xbounds", bounds.lon().to_vec());
        }
        desc.insert("yvals", self.lat.clone());
        if let Some(bounds) = &self.bounds {
            desc.insert("ybounds", bounds.lat().to_vec());
        }
        desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skewed() -> CurvilinearGrid {
        CurvilinearGrid::new(
            2,
            3,
            vec![50.0, 50.5, 51.0, 51.0, 51.5, 52.0],
            vec![5.0, 6.0, 7.0, 5.5, 6.5, 7.5],
        )
        .unwrap()
    }

    #[test]
    fn lat_lon_is_row_major() {
        assert_eq!(skewed().lat_lon(1, 2), (52.0, 7.5));
    }

    #[test]
    fn slice_degrades_to_unstructured() {
        let sliced: UnstructuredGrid = skewed().slice(0..2, 1..2);
        assert_eq!(sliced.lat(), &[50.5, 51.5]);
        assert_eq!(sliced.lon(), &[6.0, 6.5]);
    }

    #[test]
    fn slice_carries_bounds() {
        let bounds = CellBounds::new(
            DEFAULT_NVERTEX,
            6,
            (0..24).map(f64::from).collect(),
            (0..24).map(f64::from).collect(),
        )
        .unwrap();
        let grid = skewed().with_bounds(bounds).unwrap();
        let sliced = grid.slice(1..2, 0..1);
        let (lat, _) = sliced.bounds().unwrap().vertices(0);
        assert_eq!(lat, &[12.0, 13.0, 14.0, 15.0]);
    }

    #[test]
    fn rejects_wrong_point_count() {
        assert!(CurvilinearGrid::new(2, 2, vec![0.0; 3], vec![0.0; 4]).is_err());
    }
}
