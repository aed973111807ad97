//! Arrays bound to a grid.

use super::series::{Provenance, SeriesAccessor, TimeSeries};
use crate::data::Message;
use crate::error::{MetgridError, Result};
use crate::grid::{flat_indices, Grid, GridKind, GridSelection, LonLatBox};
use chrono::NaiveDateTime;
use ndarray::{ArrayD, ArrayViewMutD, Axis as ArrayAxis, IxDyn, Slice};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
struct GridBinding {
    grid: Arc<Grid>,
    stale: bool,
}

/// An n-dimensional array whose trailing dimensions are described by a grid.
///
/// The accessor owns the array. Value edits through [`values_mut`] keep the
/// grid; anything that may change the array's structure ([`transform`],
/// [`replace_data`]) marks the grid binding stale, and grid-dependent
/// operations then fail until [`set_grid`] is called again.
///
/// [`values_mut`]: SpatialAccessor::values_mut
/// [`transform`]: SpatialAccessor::transform
/// [`replace_data`]: SpatialAccessor::replace_data
/// [`set_grid`]: SpatialAccessor::set_grid
#[derive(Debug, Clone)]
pub struct SpatialAccessor {
    name: String,
    dims: Vec<String>,
    data: ArrayD<f64>,
    binding: Option<GridBinding>,
}

impl SpatialAccessor {
    /// Wrap `data`; `dims` names every dimension, outermost first.
    pub fn new(name: impl Into<String>, dims: Vec<String>, data: ArrayD<f64>) -> Result<Self> {
        check_dims(&dims, &data)?;
        Ok(Self {
            name: name.into(),
            dims,
            data,
            binding: None,
        })
    }

    /// Wrap a handler message, binding its grid if it has one.
    pub fn from_message(message: Message) -> Result<Self> {
        let mut accessor = Self::new(message.name, message.dims, message.data)?;
        if let Some(grid) = message.grid {
            accessor.set_grid(grid)?;
        }
        Ok(accessor)
    }

    /// Variable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimension names.
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    /// The array.
    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    /// Mutable view of the values; the shape cannot change through it.
    pub fn values_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.data.view_mut()
    }

    /// Unwrap the array.
    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    /// Bind `grid` after checking it against the trailing dimensions.
    pub fn set_grid(&mut self, grid: impl Into<Arc<Grid>>) -> Result<()> {
        let grid = grid.into();
        grid.check_shape(self.data.shape())?;
        debug!(variable = %self.name, grid = %grid, "grid bound");
        self.binding = Some(GridBinding { grid, stale: false });
        Ok(())
    }

    /// The bound grid.
    pub fn grid(&self) -> Result<&Arc<Grid>> {
        match &self.binding {
            None => Err(MetgridError::GridNotSet),
            Some(binding) if binding.stale => Err(MetgridError::StaleBinding),
            Some(binding) => Ok(&binding.grid),
        }
    }

    /// Whether a grid is bound but no longer trusted.
    pub fn is_stale(&self) -> bool {
        self.binding.as_ref().is_some_and(|binding| binding.stale)
    }

    /// Apply a structural transform to the array.
    ///
    /// Dimension names are kept when the number of dimensions is unchanged
    /// and replaced with `dim_0`, `dim_1`, ... otherwise.
    pub fn transform<F>(&mut self, f: F)
    where
        F: FnOnce(ArrayD<f64>) -> ArrayD<f64>,
    {
        let data = std::mem::take(&mut self.data);
        self.data = f(data);
        if self.data.ndim() != self.dims.len() {
            self.dims = (0..self.data.ndim()).map(|i| format!("dim_{i}")).collect();
        }
        self.mark_stale();
    }

    /// Replace the array and its dimension names.
    pub fn replace_data(&mut self, dims: Vec<String>, data: ArrayD<f64>) -> Result<()> {
        check_dims(&dims, &data)?;
        self.dims = dims;
        self.data = data;
        self.mark_stale();
        Ok(())
    }

    /// Slice the grid dimensions by index ranges.
    ///
    /// Leading dimensions are kept whole. When the grid degrades to an
    /// unstructured one its two dimensions collapse into `ncells`.
    pub fn slice(&self, ranges: &[Range<usize>]) -> Result<SpatialAccessor> {
        let grid = self.grid()?;
        let sliced = grid.slice(ranges)?;
        let selection = if sliced.len_coords() == grid.len_coords() {
            GridSelection::Ranges(ranges.to_vec())
        } else {
            GridSelection::Points(flat_indices(grid.shape()[1], &ranges[0], &ranges[1]))
        };
        self.selected(sliced, &selection)
    }

    /// Keep the grid points inside `bbox`.
    pub fn select_lonlat_box(&self, bbox: &LonLatBox) -> Result<SpatialAccessor> {
        let (grid, selection) = self.grid()?.select_lonlat_box(bbox)?;
        self.selected(grid, &selection)
    }

    /// Index of the grid point nearest to `(lat, lon)`.
    pub fn nearest_point(&self, lat: f64, lon: f64) -> Result<Vec<usize>> {
        self.grid()?.nearest_point(lat, lon)
    }

    /// Values of the leading dimensions at one grid point.
    pub fn values_at(&self, index: &[usize]) -> Result<ArrayD<f64>> {
        let grid = self.grid()?;
        // bounds check
        grid.coordinate(index)?;
        let offset = self.data.ndim() - grid.len_coords();
        let mut point = self.data.view();
        for (k, &i) in index.iter().enumerate().rev() {
            point = point.index_axis_move(ArrayAxis(offset + k), i);
        }
        Ok(point.to_owned())
    }

    /// Time series at the grid point nearest to `lonlat`.
    ///
    /// The first leading dimension is time and must match `times`; further
    /// leading dimensions become columns `name_0`, `name_1`, ...
    pub fn to_series(&self, lonlat: (f64, f64), times: &[NaiveDateTime]) -> Result<SeriesAccessor> {
        let (lon, lat) = lonlat;
        let index = self.nearest_point(lat, lon)?;
        let (point_lat, point_lon) = self.grid()?.lat_lon(&index)?;
        let values = self.values_at(&index)?;

        let ntimes = values.shape().first().copied().unwrap_or(1);
        if ntimes != times.len() {
            return Err(MetgridError::shape_mismatch(&[times.len()], values.shape()));
        }
        let ncols = values.len() / ntimes.max(1);
        let table = values
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((ntimes, ncols))
            .map_err(|_| MetgridError::shape_mismatch(&[ntimes, ncols], values.shape()))?;

        let mut series = TimeSeries::new(times.to_vec());
        for (k, column) in table.columns().into_iter().enumerate() {
            let name = if ncols == 1 {
                self.name.clone()
            } else {
                format!("{}_{k}", self.name)
            };
            series = series.with_column(name, column.to_vec())?;
        }

        debug!(variable = %self.name, ?index, "extracted grid point series");
        Ok(SeriesAccessor::new(series).with_provenance(Provenance::GridPoint {
            lat: point_lat,
            lon: point_lon,
        }))
    }

    fn mark_stale(&mut self) {
        if let Some(binding) = &mut self.binding {
            binding.stale = true;
        }
    }

    /// New accessor holding the selected part of the array, bound to `grid`.
    fn selected(&self, grid: Grid, selection: &GridSelection) -> Result<SpatialAccessor> {
        let len_coords = self.grid()?.len_coords();
        let offset = self.data.ndim() - len_coords;
        let mut dims = self.dims[..offset].to_vec();

        let data = match selection {
            GridSelection::Ranges(ranges) => {
                let mut data = self.data.view();
                for (k, range) in ranges.iter().enumerate() {
                    data.slice_axis_inplace(ArrayAxis(offset + k), Slice::from(range.clone()));
                }
                dims.extend_from_slice(&self.dims[offset..]);
                data.to_owned()
            }
            GridSelection::Points(points) => {
                let mut shape = self.data.shape()[..offset].to_vec();
                shape.push(self.data.shape()[offset..].iter().product());
                let flat = self
                    .data
                    .as_standard_layout()
                    .into_owned()
                    .into_shape_with_order(IxDyn(&shape))
                    .map_err(|_| MetgridError::shape_mismatch(&shape, self.data.shape()))?;
                dims.push(match grid.kind() {
                    GridKind::Unstructured if len_coords == 1 => self.dims[offset].clone(),
                    _ => "ncells".to_string(),
                });
                flat.select(ArrayAxis(offset), points)
            }
        };

        let mut accessor = Self::new(self.name.clone(), dims, data)?;
        accessor.set_grid(grid)?;
        Ok(accessor)
    }
}

impl fmt::Display for SpatialAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .dims
            .iter()
            .zip(self.data.shape())
            .map(|(name, len)| format!("{name}: {len}"))
            .collect();
        write!(f, "{} ({})", self.name, dims.join(", "))?;
        match &self.binding {
            None => write!(f, ", no grid"),
            Some(binding) if binding.stale => write!(f, ", stale {}", binding.grid),
            Some(binding) => write!(f, ", {}", binding.grid),
        }
    }
}

fn check_dims(dims: &[String], data: &ArrayD<f64>) -> Result<()> {
    if dims.len() != data.ndim() {
        return Err(MetgridError::shape_mismatch(&[data.ndim()], &[dims.len()]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CurvilinearGrid, EvenAxis, GridBuilder, LatLonGrid, UnstructuredGrid};
    use chrono::NaiveDate;
    use ndarray::Array;

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn lonlat_grid() -> Grid {
        LatLonGrid::new(EvenAxis::new(50.0, 1.0, 3), EvenAxis::new(5.0, 1.0, 4)).into()
    }

    /// `time x lat x lon` with value `100 t + 10 j + i`.
    fn field() -> SpatialAccessor {
        let data = Array::from_shape_fn(IxDyn(&[2, 3, 4]), |ix| {
            (100 * ix[0] + 10 * ix[1] + ix[2]) as f64
        });
        let mut accessor = SpatialAccessor::new("t2m", dims(&["time", "lat", "lon"]), data).unwrap();
        accessor.set_grid(lonlat_grid()).unwrap();
        accessor
    }

    fn curvilinear_field() -> SpatialAccessor {
        let grid = CurvilinearGrid::new(
            2,
            3,
            vec![50.0, 50.5, 51.0, 51.0, 51.5, 52.0],
            vec![5.0, 6.0, 7.0, 5.5, 6.5, 7.5],
        )
        .unwrap();
        let data = Array::from_shape_fn(IxDyn(&[2, 2, 3]), |ix| (100 * ix[0] + 10 * ix[1] + ix[2]) as f64);
        let mut accessor = SpatialAccessor::new("t2m", dims(&["time", "y", "x"]), data).unwrap();
        accessor.set_grid(Grid::from(grid)).unwrap();
        accessor
    }

    #[test]
    fn set_grid_checks_trailing_dims() {
        let data = ArrayD::zeros(IxDyn(&[2, 4, 3]));
        let mut accessor = SpatialAccessor::new("t2m", dims(&["time", "lat", "lon"]), data).unwrap();
        assert!(matches!(
            accessor.set_grid(lonlat_grid()),
            Err(MetgridError::ShapeMismatch { .. })
        ));

        let data = ArrayD::zeros(IxDyn(&[12]));
        let mut accessor = SpatialAccessor::new("t2m", dims(&["ncells"]), data).unwrap();
        assert!(accessor.set_grid(lonlat_grid()).is_err());
    }

    #[test]
    fn dims_must_name_every_axis() {
        let data = ArrayD::zeros(IxDyn(&[2, 3]));
        assert!(SpatialAccessor::new("t2m", dims(&["lat"]), data).is_err());
    }

    #[test]
    fn grid_operations_need_a_grid() {
        let data = ArrayD::zeros(IxDyn(&[3, 4]));
        let accessor = SpatialAccessor::new("t2m", dims(&["lat", "lon"]), data).unwrap();
        assert!(matches!(accessor.slice(&[0..1, 0..1]), Err(MetgridError::GridNotSet)));
    }

    #[test]
    fn structural_transform_makes_binding_stale() {
        let mut accessor = field();
        accessor.transform(|data| data.permuted_axes(IxDyn(&[0, 2, 1])));
        assert!(accessor.is_stale());
        assert!(matches!(accessor.slice(&[0..1, 0..1]), Err(MetgridError::StaleBinding)));
        assert!(matches!(accessor.nearest_point(50.0, 5.0), Err(MetgridError::StaleBinding)));

        accessor.transform(|data| data.permuted_axes(IxDyn(&[0, 2, 1])));
        accessor.set_grid(lonlat_grid()).unwrap();
        assert!(accessor.slice(&[0..1, 0..1]).is_ok());
    }

    #[test]
    fn replace_data_makes_binding_stale() {
        let mut accessor = field();
        accessor
            .replace_data(dims(&["lat", "lon"]), ArrayD::zeros(IxDyn(&[3, 4])))
            .unwrap();
        assert!(matches!(accessor.grid(), Err(MetgridError::StaleBinding)));
    }

    #[test]
    fn value_edits_keep_binding() {
        let mut accessor = field();
        accessor.values_mut().fill(1.0);
        assert!(!accessor.is_stale());
        assert!(accessor.grid().is_ok());
    }

    #[test]
    fn slice_cuts_trailing_dims() {
        let sliced = field().slice(&[1..3, 2..4]).unwrap();
        assert_eq!(sliced.data().shape(), &[2, 2, 2]);
        assert_eq!(sliced.dims(), &dims(&["time", "lat", "lon"])[..]);
        assert_eq!(sliced.data()[[1, 0, 1]], 113.0);
        let grid = sliced.grid().unwrap();
        assert_eq!(grid.kind(), GridKind::LatLon);
        assert_eq!(grid.coordinate(&[0, 0]).unwrap(), (51.0, 7.0));
    }

    #[test]
    fn degrading_slice_collapses_grid_dims() {
        let sliced = curvilinear_field().slice(&[0..2, 1..3]).unwrap();
        assert_eq!(sliced.dims(), &dims(&["time", "ncells"])[..]);
        assert_eq!(sliced.data().shape(), &[2, 4]);
        assert_eq!(sliced.data()[[1, 2]], 111.0);
        assert_eq!(sliced.grid().unwrap().kind(), GridKind::Unstructured);
    }

    #[test]
    fn lonlat_box_on_curvilinear_field() {
        let bbox = LonLatBox::new(5.5, 51.6, 7.0, 50.4);
        let selected = curvilinear_field().select_lonlat_box(&bbox).unwrap();
        assert_eq!(selected.data().shape(), &[2, 4]);
        let first_step: Vec<f64> = selected.data().index_axis(ArrayAxis(0), 0).iter().copied().collect();
        assert_eq!(first_step, vec![1.0, 2.0, 10.0, 11.0]);
    }

    #[test]
    fn lonlat_box_on_unstructured_field_keeps_dim_name() {
        let grid = UnstructuredGrid::new(vec![10.0, 20.0, 30.0], vec![0.0, 1.0, 2.0]).unwrap();
        let data = ArrayD::from_shape_vec(IxDyn(&[3]), vec![1.0, 2.0, 3.0]).unwrap();
        let mut accessor = SpatialAccessor::new("pr", dims(&["cell"]), data).unwrap();
        accessor.set_grid(Grid::from(grid)).unwrap();
        let selected = accessor.select_lonlat_box(&LonLatBox::new(0.5, 35.0, 2.5, 15.0)).unwrap();
        assert_eq!(selected.dims(), &dims(&["cell"])[..]);
        assert_eq!(selected.data().as_slice().unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn to_series_reads_nearest_point() {
        let times: Vec<NaiveDateTime> = (0..2)
            .map(|h| {
                NaiveDate::from_ymd_opt(2024, 1, 1)
                    .and_then(|d| d.and_hms_opt(h, 0, 0))
                    .unwrap()
            })
            .collect();
        let series = field().to_series((7.1, 51.2), &times).unwrap();
        assert_eq!(series.series().column("t2m").unwrap(), &[12.0, 112.0]);
        assert_eq!(series.provenance(), Provenance::GridPoint { lat: 51.0, lon: 7.0 });
        assert_eq!(series.lonlat(), Some((7.0, 51.0)));

        assert!(field().to_series((7.1, 51.2), &times[..1]).is_err());
    }

    #[test]
    fn from_message_binds_parsed_grid() {
        let grid = GridBuilder::from_text(
            "gridtype = lonlat\nxsize = 4\nysize = 3\nxfirst = 5\nxinc = 1\nyfirst = 50\nyinc = 1",
        )
        .build()
        .unwrap();
        let message = Message {
            name: "t2m".to_string(),
            dims: dims(&["lat", "lon"]),
            data: ArrayD::zeros(IxDyn(&[3, 4])),
            attributes: Default::default(),
            grid: Some(grid),
        };
        let accessor = SpatialAccessor::from_message(message).unwrap();
        assert_eq!(accessor.grid().unwrap().kind(), GridKind::LatLon);
    }
}
