//! Unstructured grids and per-cell vertex bounds.

use super::description::GridDescription;
use crate::error::{MetgridError, Result};
use std::ops::Range;

/// Vertex coordinates of every cell, `nvertex` per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellBounds {
    nvertex: usize,
    lat: Vec<f64>,
    lon: Vec<f64>,
}

impl CellBounds {
    /// Create bounds for `cells` cells with `nvertex` vertices each.
    pub fn new(nvertex: usize, cells: usize, lat: Vec<f64>, lon: Vec<f64>) -> Result<Self> {
        let expected = nvertex * cells;
        if nvertex == 0 || lat.len() != expected || lon.len() != expected {
            return Err(MetgridError::shape_mismatch(
                &[cells, nvertex],
                &[lat.len(), lon.len()],
            ));
        }
        Ok(Self { nvertex, lat, lon })
    }

    /// Vertices per cell.
    pub fn nvertex(&self) -> usize {
        self.nvertex
    }

    /// Number of cells.
    pub fn cells(&self) -> usize {
        self.lat.len() / self.nvertex
    }

    /// Vertex latitudes and longitudes of `cell`.
    pub fn vertices(&self, cell: usize) -> (&[f64], &[f64]) {
        let span = cell * self.nvertex..(cell + 1) * self.nvertex;
        (&self.lat[span.clone()], &self.lon[span])
    }

    /// Flat vertex latitudes.
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Flat vertex longitudes.
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Bounds of the given cells, in order.
    pub fn select(&self, cells: &[usize]) -> Self {
        let mut lat = Vec::with_capacity(cells.len() * self.nvertex);
        let mut lon = Vec::with_capacity(cells.len() * self.nvertex);
        for &cell in cells {
            let (cell_lat, cell_lon) = self.vertices(cell);
            lat.extend_from_slice(cell_lat);
            lon.extend_from_slice(cell_lon);
        }
        Self {
            nvertex: self.nvertex,
            lat,
            lon,
        }
    }
}

/// A grid of cells with individual centre coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct UnstructuredGrid {
    lat: Vec<f64>,
    lon: Vec<f64>,
    bounds: Option<CellBounds>,
}

impl UnstructuredGrid {
    /// Create a grid from cell centre latitudes and longitudes in degrees.
    pub fn new(lat: Vec<f64>, lon: Vec<f64>) -> Result<Self> {
        if lat.len() != lon.len() {
            return Err(MetgridError::shape_mismatch(&[lat.len()], &[lon.len()]));
        }
        Ok(Self {
            lat,
            lon,
            bounds: None,
        })
    }

    /// Assemble from parts whose lengths are already consistent.
    pub(crate) fn from_parts(lat: Vec<f64>, lon: Vec<f64>, bounds: Option<CellBounds>) -> Self {
        Self { lat, lon, bounds }
    }

    /// Attach vertex bounds; they must cover every cell.
    pub fn with_bounds(mut self, bounds: CellBounds) -> Result<Self> {
        if bounds.cells() != self.lat.len() {
            return Err(MetgridError::shape_mismatch(&[self.lat.len()], &[bounds.cells()]));
        }
        self.bounds = Some(bounds);
        Ok(self)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.lat.len()
    }

    /// Whether the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    /// Vertex bounds, if known.
    pub fn bounds(&self) -> Option<&CellBounds> {
        self.bounds.as_ref()
    }

    /// Cell centre latitudes.
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// Cell centre longitudes.
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Latitude and longitude of `cell`.
    pub fn lat_lon(&self, cell: usize) -> (f64, f64) {
        (self.lat[cell], self.lon[cell])
    }

    /// Cells in `range`.
    pub fn slice(&self, range: Range<usize>) -> UnstructuredGrid {
        let cells: Vec<usize> = range.collect();
        self.select(&cells)
    }

    /// The given cells, in order.
    pub fn select(&self, cells: &[usize]) -> UnstructuredGrid {
        Self::from_parts(
            cells.iter().map(|&c| self.lat[c]).collect(),
            cells.iter().map(|&c| self.lon[c]).collect(),
            self.bounds.as_ref().map(|b| b.select(cells)),
        )
    }

    /// Grid description in griddes form.
    pub fn describe(&self) -> GridDescription {
        let mut desc = GridDescription::new();
        desc.insert("gridtype", "unstructured");
        desc.insert("gridsize", self.len());
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
