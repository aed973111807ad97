//! Grid geometries and the CDO grid description parser.
//!
//! [`Grid`] is a closed set of five kinds. Structured kinds cover the last
//! two dimensions of an array (`y`, `x`), the unstructured kind covers the
//! last one. Slicing a regular lon/lat or Gaussian grid keeps its kind;
//! slicing anything else yields an [`UnstructuredGrid`].

pub mod axis;
mod builder;
mod curvilinear;
pub mod description;
mod gaussian;
mod lonlat;
mod projected;
mod unstructured;

pub use axis::{AngleUnit, Axis, EvenAxis};
pub use builder::GridBuilder;
pub use curvilinear::{CurvilinearGrid, DEFAULT_NVERTEX};
pub use description::{GridDescription, GridValue};
pub use gaussian::GaussianGrid;
pub use lonlat::LatLonGrid;
pub use projected::ProjectionGrid;
pub use unstructured::{CellBounds, UnstructuredGrid};

use crate::error::{MetgridError, ParseError, Result};
use crate::projection::EARTH_RADIUS;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// The five grid kinds, named as in griddes `gridtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridKind {
    /// Regular longitude/latitude.
    LatLon,
    /// Gaussian (or otherwise listed) latitudes.
    Gaussian,
    /// Regular in projected space.
    Projection,
    /// 2-D index space with per-point coordinates.
    Curvilinear,
    /// 1-D list of cells.
    Unstructured,
}

impl GridKind {
    /// The griddes `gridtype` value.
    pub fn as_str(self) -> &'static str {
        match self {
            GridKind::LatLon => "lonlat",
            GridKind::Gaussian => "gaussian",
            GridKind::Projection => "projection",
            GridKind::Curvilinear => "curvilinear",
            GridKind::Unstructured => "unstructured",
        }
    }

    /// Number of array dimensions the grid covers.
    pub fn len_coords(self) -> usize {
        match self {
            GridKind::Unstructured => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GridKind {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lonlat" | "latlon" => Ok(GridKind::LatLon),
            "gaussian" => Ok(GridKind::Gaussian),
            "projection" => Ok(GridKind::Projection),
            "curvilinear" => Ok(GridKind::Curvilinear),
            "unstructured" => Ok(GridKind::Unstructured),
            _ => Err(ParseError::UnknownGridType(s.to_string())),
        }
    }
}

/// A longitude/latitude box in degrees, CDO `sellonlatbox` style.
///
/// Bounds may be given in either order. Longitudes are compared as given,
/// without wrapping around the date line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLatBox {
    /// Western longitude.
    pub west: f64,
    /// Northern latitude.
    pub north: f64,
    /// Eastern longitude.
    pub east: f64,
    /// Southern latitude.
    pub south: f64,
}

impl LonLatBox {
    /// Create a box from its west, north, east and south edges.
    pub fn new(west: f64, north: f64, east: f64, south: f64) -> Self {
        Self {
            west,
            north,
            east,
            south,
        }
    }

    /// `(min, max)` latitude.
    pub fn lat_bounds(&self) -> (f64, f64) {
        (self.south.min(self.north), self.south.max(self.north))
    }

    /// `(min, max)` longitude.
    pub fn lon_bounds(&self) -> (f64, f64) {
        (self.west.min(self.east), self.west.max(self.east))
    }

    /// Whether the point lies in the box, edges included.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let (south, north) = self.lat_bounds();
        let (west, east) = self.lon_bounds();
        lat >= south && lat <= north && lon >= west && lon <= east
    }
}

impl fmt::Display for LonLatBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[west {}, north {}, east {}, south {}]",
            self.west, self.north, self.east, self.south
        )
    }
}

/// How a coordinate selection maps onto the grid dimensions of an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridSelection {
    /// One index range per grid dimension; the array keeps its layout.
    Ranges(Vec<Range<usize>>),
    /// Flat (row-major) point indices; grid dimensions collapse into one.
    Points(Vec<usize>),
}

/// A grid of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Grid {
    /// Regular longitude/latitude.
    LatLon(LatLonGrid),
    /// Gaussian latitudes.
    Gaussian(GaussianGrid),
    /// Regular in projected space.
    Projection(ProjectionGrid),
    /// Per-point coordinates on a 2-D index space.
    Curvilinear(CurvilinearGrid),
    /// 1-D list of cells.
    Unstructured(UnstructuredGrid),
}

impl Grid {
    /// Parse griddes text.
    pub fn from_griddes(text: &str) -> Result<Self> {
        GridBuilder::from_text(text).build()
    }

    /// The kind of this grid.
    pub fn kind(&self) -> GridKind {
        match self {
            Grid::LatLon(_) => GridKind::LatLon,
            Grid::Gaussian(_) => GridKind::Gaussian,
            Grid::Projection(_) => GridKind::Projection,
            Grid::Curvilinear(_) => GridKind::Curvilinear,
            Grid::Unstructured(_) => GridKind::Unstructured,
        }
    }

    /// Number of array dimensions the grid covers.
    pub fn len_coords(&self) -> usize {
        self.kind().len_coords()
    }

    /// Sizes of the covered dimensions, `[ysize, xsize]` or `[ncells]`.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Grid::LatLon(g) => g.shape().to_vec(),
            Grid::Gaussian(g) => g.shape().to_vec(),
            Grid::Projection(g) => g.shape().to_vec(),
            Grid::Curvilinear(g) => g.shape().to_vec(),
            Grid::Unstructured(g) => vec![g.len()],
        }
    }

    /// Total number of points.
    pub fn size(&self) -> usize {
        self.shape().iter().product()
    }

    /// Conventional names of the covered dimensions.
    pub fn coord_names(&self) -> &'static [&'static str] {
        match self {
            Grid::LatLon(_) | Grid::Gaussian(_) => &["lat", "lon"],
            Grid::Projection(_) | Grid::Curvilinear(_) => &["y", "x"],
            Grid::Unstructured(_) => &["ncells"],
        }
    }

    /// Check that the trailing dimensions of `array_shape` match the grid.
    pub fn check_shape(&self, array_shape: &[usize]) -> Result<()> {
        let shape = self.shape();
        let matches = array_shape.len() >= shape.len()
            && array_shape[array_shape.len() - shape.len()..] == shape[..];
        if matches {
            Ok(())
        } else {
            Err(MetgridError::shape_mismatch(&shape, array_shape))
        }
    }

    /// Raw grid coordinates `(y, x)` at `index`.
    ///
    /// These are the values of the description: axis values for regular
    /// grids (projected metres for projection grids), per-point latitude and
    /// longitude for curvilinear and unstructured grids.
    pub fn coordinate(&self, index: &[usize]) -> Result<(f64, f64)> {
        self.check_index(index)?;
        Ok(match self {
            Grid::LatLon(g) => g.coordinate(index[0], index[1]),
            Grid::Gaussian(g) => g.coordinate(index[0], index[1]),
            Grid::Projection(g) => g.coordinate(index[0], index[1]),
            Grid::Curvilinear(g) => g.lat_lon(index[0], index[1]),
            Grid::Unstructured(g) => g.lat_lon(index[0]),
        })
    }

    /// Latitude and longitude in degrees at `index`.
    pub fn lat_lon(&self, index: &[usize]) -> Result<(f64, f64)> {
        self.check_index(index)?;
        Ok(self.lat_lon_flat(self.ravel(index)))
    }

    /// Latitudes and longitudes of every point in row-major order.
    pub fn lat_lon_values(&self) -> (Vec<f64>, Vec<f64>) {
        (0..self.size()).map(|k| self.lat_lon_flat(k)).unzip()
    }

    /// Sub-grid covering one index range per grid dimension.
    pub fn slice(&self, ranges: &[Range<usize>]) -> Result<Grid> {
        let shape = self.shape();
        if ranges.len() != shape.len() {
            return Err(MetgridError::InvalidSelection(format!(
                "{} grid needs {} ranges, got {}",
                self.kind(),
                shape.len(),
                ranges.len()
            )));
        }
        for (range, &len) in ranges.iter().zip(&shape) {
            if range.start >= range.end || range.end > len {
                return Err(MetgridError::InvalidSelection(format!(
                    "range {range:?} is empty or outside 0..{len}"
                )));
            }
        }

        Ok(match self {
            Grid::LatLon(g) => Grid::LatLon(g.slice(ranges[0].clone(), ranges[1].clone())),
            Grid::Gaussian(g) => Grid::Gaussian(g.slice(ranges[0].clone(), ranges[1].clone())),
            Grid::Projection(g) => Grid::Unstructured(g.slice(ranges[0].clone(), ranges[1].clone())),
            Grid::Curvilinear(g) => Grid::Unstructured(g.slice(ranges[0].clone(), ranges[1].clone())),
            Grid::Unstructured(g) => Grid::Unstructured(g.slice(ranges[0].clone())),
        })
    }

    /// Points of the grid inside `bbox`.
    ///
    /// Regular lon/lat and Gaussian grids are cut to the axis ranges inside
    /// the box and keep their kind. Other grids keep the points inside the
    /// box as an unstructured grid.
    pub fn select_lonlat_box(&self, bbox: &LonLatBox) -> Result<(Grid, GridSelection)> {
        let empty = || MetgridError::EmptySelection(bbox.to_string());
        let ranges = match self {
            Grid::LatLon(g) => Some(g.box_ranges(bbox).ok_or_else(empty)?),
            Grid::Gaussian(g) => Some(g.box_ranges(bbox).ok_or_else(empty)?),
            _ => None,
        };
        if let Some((y, x)) = ranges {
            let ranges = vec![y, x];
            return Ok((self.slice(&ranges)?, GridSelection::Ranges(ranges)));
        }

        let points: Vec<usize> = (0..self.size())
            .filter(|&k| {
                let (lat, lon) = self.lat_lon_flat(k);
                bbox.contains(lat, lon)
            })
            .collect();
        if points.is_empty() {
            return Err(empty());
        }
        Ok((self.select_points(&points), GridSelection::Points(points)))
    }

    /// Index of the grid point closest to `(lat, lon)` on the sphere.
    pub fn nearest_point(&self, lat: f64, lon: f64) -> Result<Vec<usize>> {
        let mut best: Option<(usize, f64)> = None;
        for k in 0..self.size() {
            let (plat, plon) = self.lat_lon_flat(k);
            let distance = haversine(lat, lon, plat, plon);
            if best.map_or(!distance.is_nan(), |(_, d)| distance < d) {
                best = Some((k, distance));
            }
        }
        best.map(|(k, _)| self.unravel(k))
            .ok_or_else(|| MetgridError::EmptySelection(format!("no grid point near ({lat}, {lon})")))
    }

    /// Grid description in griddes form.
    pub fn describe(&self) -> GridDescription {
        match self {
            Grid::LatLon(g) => g.describe(),
            Grid::Gaussian(g) => g.describe(),
            Grid::Projection(g) => g.describe(),
            Grid::Curvilinear(g) => g.describe(),
            Grid::Unstructured(g) => g.describe(),
        }
    }

    /// Points at the given flat indices, as an unstructured grid.
    pub(crate) fn select_points(&self, points: &[usize]) -> Grid {
        let selected = match self {
            Grid::Projection(g) => g.select(points),
            Grid::Curvilinear(g) => g.select(points),
            Grid::Unstructured(g) => g.select(points),
            Grid::LatLon(_) | Grid::Gaussian(_) => {
                let (lat, lon) = points.iter().map(|&k| self.lat_lon_flat(k)).unzip();
                UnstructuredGrid::from_parts(lat, lon, None)
            }
        };
        Grid::Unstructured(selected)
    }

    /// Multi-index of flat point `k`.
    pub(crate) fn unravel(&self, k: usize) -> Vec<usize> {
        match self.shape().as_slice() {
            [_, nx] => vec![k / nx, k % nx],
            _ => vec![k],
        }
    }

    fn ravel(&self, index: &[usize]) -> usize {
        match (self.shape().as_slice(), index) {
            ([_, nx], [j, i]) => j * nx + i,
            _ => index[0],
        }
    }

    fn lat_lon_flat(&self, k: usize) -> (f64, f64) {
        let nx = self.shape().last().copied().unwrap_or(1);
        let (j, i) = (k / nx, k % nx);
        match self {
            Grid::LatLon(g) => g.lat_lon(j, i),
            Grid::Gaussian(g) => g.lat_lon(j, i),
            Grid::Projection(g) => g.lat_lon(j, i),
            Grid::Curvilinear(g) => g.lat_lon(j, i),
            Grid::Unstructured(g) => g.lat_lon(k),
        }
    }

    fn check_index(&self, index: &[usize]) -> Result<()> {
        let shape = self.shape();
        if index.len() != shape.len() || index.iter().zip(&shape).any(|(i, n)| i >= n) {
            return Err(MetgridError::InvalidSelection(format!(
                "index {index:?} outside grid shape {shape:?}"
            )));
        }
        Ok(())
    }
}

impl FromStr for Grid {
    type Err = MetgridError;

    fn from_str(s: &str) -> Result<Self> {
        Grid::from_griddes(s)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .coord_names()
            .iter()
            .zip(self.shape())
            .map(|(name, len)| format!("{name}={len}"))
            .collect();
        write!(f, "{} grid ({}, {} points)", self.kind(), dims.join(", "), self.size())
    }
}

impl From<LatLonGrid> for Grid {
    fn from(grid: LatLonGrid) -> Self {
        Grid::LatLon(grid)
    }
}

impl From<GaussianGrid> for Grid {
    fn from(grid: GaussianGrid) -> Self {
        Grid::Gaussian(grid)
    }
}

impl From<ProjectionGrid> for Grid {
    fn from(grid: ProjectionGrid) -> Self {
        Grid::Projection(grid)
    }
}

impl From<CurvilinearGrid> for Grid {
    fn from(grid: CurvilinearGrid) -> Self {
        Grid::Curvilinear(grid)
    }
}

impl From<UnstructuredGrid> for Grid {
    fn from(grid: UnstructuredGrid) -> Self {
        Grid::Unstructured(grid)
    }
}

/// Row-major flat indices of the block `y` x `x` in a grid `xsize` wide.
pub(crate) fn flat_indices(xsize: usize, y: &Range<usize>, x: &Range<usize>) -> Vec<usize> {
    y.clone()
        .flat_map(|j| x.clone().map(move |i| j * xsize + i))
        .collect()
}

/// Great-circle distance in metres.
fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = phi2 - phi1;
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::Projection;

    fn lonlat() -> Grid {
        LatLonGrid::new(EvenAxis::new(30.0, 0.5, 81), EvenAxis::new(-20.0, 0.5, 121)).into()
    }

    fn projection() -> Grid {
        let projection = Projection::from_proj4("+proj=lcc +lat_0=63 +lon_0=15 +lat_1=63 +lat_2=63 +R=6.371e+06")
            .unwrap();
        ProjectionGrid::new(
            EvenAxis::new(-1129322.0, 2500.0, 949),
            EvenAxis::new(-922442.2, 2500.0, 739),
            projection,
        )
        .into()
    }

    fn curvilinear() -> Grid {
        CurvilinearGrid::new(
            2,
            3,
            vec![50.0, 50.5, 51.0, 51.0, 51.5, 52.0],
            vec![5.0, 6.0, 7.0, 5.5, 6.5, 7.5],
        )
        .unwrap()
        .into()
    }

    fn gaussian() -> Grid {
        GaussianGrid::new(
            Axis::Values(vec![52.5, 17.5, -17.5, -52.5]),
            Axis::Even(EvenAxis::new(0.0, 45.0, 8)),
        )
        .into()
    }

    fn unstructured() -> Grid {
        UnstructuredGrid::new(vec![10.0, 20.0, 30.0], vec![0.0, 1.0, 2.0])
            .unwrap()
            .into()
    }

    fn all() -> Vec<Grid> {
        vec![lonlat(), gaussian(), projection(), curvilinear(), unstructured()]
    }

    #[test]
    fn kind_round_trips_through_str() {
        for grid in all() {
            let kind = grid.kind();
            assert_eq!(kind.as_str().parse::<GridKind>().unwrap(), kind);
        }
        assert_eq!(
            "hexagonal".parse::<GridKind>(),
            Err(ParseError::UnknownGridType("hexagonal".to_string()))
        );
    }

    #[test]
    fn lonlat_origin_and_size() {
        let grid = lonlat();
        assert_eq!(grid.coordinate(&[0, 0]).unwrap(), (30.0, -20.0));
        assert_eq!(grid.size(), 81 * 121);
        assert_eq!(grid.len_coords(), 2);
    }

    #[test]
    fn lonlat_slice_keeps_kind() {
        let sliced = lonlat().slice(&[5..10, 0..121]).unwrap();
        assert_eq!(sliced.kind(), GridKind::LatLon);
        assert_eq!(sliced.shape(), vec![5, 121]);
        assert_eq!(sliced.coordinate(&[0, 0]).unwrap(), (32.5, -20.0));
    }

    #[test]
    fn gaussian_slice_keeps_kind() {
        let sliced = gaussian().slice(&[0..2, 0..8]).unwrap();
        assert_eq!(sliced.kind(), GridKind::Gaussian);
    }

    #[test]
    fn projection_and_curvilinear_slices_degrade() {
        let grid = projection();
        let sliced = grid.slice(&[0..2, 0..3]).unwrap();
        assert_eq!(sliced.kind(), GridKind::Unstructured);
        assert_eq!(sliced.size(), 6);
        assert_eq!(sliced.lat_lon(&[4]).unwrap(), grid.lat_lon(&[1, 1]).unwrap());

        let grid = curvilinear();
        let full = grid.slice(&[0..2, 0..3]).unwrap();
        assert_eq!(full.kind(), GridKind::Unstructured);
        assert_eq!(full.lat_lon_values(), grid.lat_lon_values());
    }

    #[test]
    fn unstructured_slice_stays_unstructured() {
        let sliced = unstructured().slice(&[1..3]).unwrap();
        assert_eq!(sliced.kind(), GridKind::Unstructured);
        assert_eq!(sliced.coordinate(&[0]).unwrap(), (20.0, 1.0));
    }

    #[test]
    fn invalid_slices_are_rejected() {
        let grid = lonlat();
        for ranges in [vec![0..1], vec![0..0, 0..1], vec![0..82, 0..1], vec![0..1, 0..1, 0..1]] {
            assert!(matches!(grid.slice(&ranges), Err(MetgridError::InvalidSelection(_))));
        }
    }

    #[test]
    fn check_shape_uses_trailing_dims() {
        for grid in all() {
            let mut shape = vec![4, 2];
            shape.extend(grid.shape());
            assert!(grid.check_shape(&shape).is_ok());

            *shape.last_mut().unwrap() += 1;
            assert!(matches!(grid.check_shape(&shape), Err(MetgridError::ShapeMismatch { .. })));
            assert!(grid.check_shape(&[]).is_err());
        }
    }

    #[test]
    fn coordinate_out_of_bounds() {
        assert!(lonlat().coordinate(&[81, 0]).is_err());
        assert!(unstructured().lat_lon(&[0, 0]).is_err());
    }

    #[test]
    fn lonlat_box_on_regular_grid_keeps_kind() {
        let bbox = LonLatBox::new(-10.0, 40.0, 0.0, 35.0);
        let (grid, selection) = lonlat().select_lonlat_box(&bbox).unwrap();
        assert_eq!(grid.kind(), GridKind::LatLon);
        assert_eq!(selection, GridSelection::Ranges(vec![10..21, 20..41]));
        assert_eq!(grid.coordinate(&[0, 0]).unwrap(), (35.0, -10.0));
    }

    #[test]
    fn lonlat_box_on_curvilinear_grid_masks_points() {
        let bbox = LonLatBox::new(5.5, 51.6, 7.0, 50.4);
        let (grid, selection) = curvilinear().select_lonlat_box(&bbox).unwrap();
        assert_eq!(grid.kind(), GridKind::Unstructured);
        assert_eq!(selection, GridSelection::Points(vec![1, 2, 3, 4]));
    }

    #[test]
    fn empty_lonlat_box() {
        let bbox = LonLatBox::new(100.0, -60.0, 110.0, -70.0);
        assert!(matches!(
            lonlat().select_lonlat_box(&bbox),
            Err(MetgridError::EmptySelection(_))
        ));
    }

    #[test]
    fn nearest_point_on_lonlat() {
        assert_eq!(lonlat().nearest_point(35.2, -9.9).unwrap(), vec![10, 20]);
        assert_eq!(unstructured().nearest_point(19.0, 1.2).unwrap(), vec![1]);
    }

    #[test]
    fn nearest_point_on_projection_matches_inverse() {
        let grid = projection();
        let (lat, lon) = grid.lat_lon(&[400, 300]).unwrap();
        assert_eq!(grid.nearest_point(lat, lon).unwrap(), vec![400, 300]);
    }

    #[test]
    fn nearest_point_on_empty_grid() {
        let empty: Grid = UnstructuredGrid::new(vec![], vec![]).unwrap().into();
        assert!(matches!(
            empty.nearest_point(50.0, 10.0),
            Err(MetgridError::EmptySelection(_))
        ));
    }

    #[test]
    fn haversine_quarter_circle() {
        let d = haversine(0.0, 0.0, 0.0, 90.0);
        assert!((d - EARTH_RADIUS * std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn display_names_kind_and_dims() {
        assert_eq!(
            projection().to_string(),
            "projection grid (y=949, x=739, 701311 points)"
        );
    }
}
