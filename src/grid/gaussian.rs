//! Gaussian grids: regular longitudes with explicitly listed latitudes.

use super::axis::{Axis, AngleUnit};
use super::description::GridDescription;
use super::LonLatBox;
use std::ops::Range;

/// A grid whose axes may be explicit value lists.
///
/// Usually the latitudes are the (unevenly spaced) Gaussian latitudes and
/// the longitudes are evenly spaced, but either axis may be either kind.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianGrid {
    y: Axis,
    x: Axis,
    yunits: AngleUnit,
    xunits: AngleUnit,
}

impl GaussianGrid {
    /// Create a grid from its latitude and longitude axes in degrees.
    pub fn new(y: Axis, x: Axis) -> Self {
        Self {
            y,
            x,
            yunits: AngleUnit::Degrees,
            xunits: AngleUnit::Degrees,
        }
    }

    /// Set the units the axis values are given in.
    pub fn with_units(mut self, yunits: AngleUnit, xunits: AngleUnit) -> Self {
        self.yunits = yunits;
        self.xunits = xunits;
        self
    }

    /// Latitude axis.
    pub fn y(&self) -> &Axis {
        &self.y
    }

    /// Longitude axis.
    pub fn x(&self) -> &Axis {
        &self.x
    }

    /// `[ysize, xsize]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.y.len(), self.x.len()]
    }

    /// Raw axis values at `(j, i)`.
    pub fn coordinate(&self, j: usize, i: usize) -> (f64, f64) {
        (self.y.value(j), self.x.value(i))
    }

    /// Latitude and longitude in degrees at `(j, i)`.
    pub fn lat_lon(&self, j: usize, i: usize) -> (f64, f64) {
        (
            self.yunits.to_degrees(self.y.value(j)),
            self.xunits.to_degrees(self.x.value(i)),
        )
    }

    /// Sub-grid covering the given index ranges.
    pub fn slice(&self, y: Range<usize>, x: Range<usize>) -> GaussianGrid {
        Self {
            y: self.y.slice(y),
            x: self.x.slice(x),
            yunits: self.yunits,
            xunits: self.xunits,
        }
    }

    pub(crate) fn box_ranges(&self, bbox: &LonLatBox) -> Option<(Range<usize>, Range<usize>)> {
        let (south, north) = bbox.lat_bounds();
        let (west, east) = bbox.lon_bounds();
        let y = super::axis::index_range_within(
            self.y.len(),
            |j| self.yunits.to_degrees(self.y.value(j)),
            south,
            north,
        )?;
        let x = super::axis::index_range_within(
            self.x.len(),
            |i| self.xunits.to_degrees(self.x.value(i)),
            west,
            east,
        )?;
        Some((y, x))
    }

    /// Grid description in griddes form.
    pub fn describe(&self) -> GridDescription {
        let mut desc = GridDescription::new();
        desc.insert("gridtype", "gaussian");
        desc.insert("gridsize", self.y.len() * self.x.len());
        desc.insert("xsize", self.x.len());
        desc.insert("ysize", self.y.len());
        desc.insert("xname", "lon");
        desc.insert("xunits", self.xunits.to_string());
        desc.insert("yname", "lat");
        desc.insert("yunits", self.yunits.to_string());
        describe_axis(&mut desc, "x", &self.x);
        describe_axis(&mut desc, "y", &self.y);
        desc
    }
}

fn describe_axis(desc: &mut GridDescription, dim: &str, axis: &Axis) {
    match axis {
        Axis::Even(even) => {
            desc.insert(format!("{dim}first"), even.first());
            desc.insert(format!("{dim}inc"), even.inc());
        }
        Axis::Values(values) => desc.insert(format!("{dim}vals"), values.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::axis::EvenAxis;
    use super::*;

    fn n2() -> GaussianGrid {
        GaussianGrid::new(
            Axis::Values(vec![52.5, 17.5, -17.5, -52.5]),
            Axis::Even(EvenAxis::new(0.0, 45.0, 8)),
        )
    }

    #[test]
    fn coordinates_come_from_values_list() {
        let grid = n2();
        assert_eq!(grid.shape(), [4, 8]);
        assert_eq!(grid.coordinate(0, 0), (52.5, 0.0));
        assert_eq!(grid.lat_lon(2, 3), (-17.5, 135.0));
    }

    #[test]
    fn slice_keeps_values_list() {
        let sliced = n2().slice(1..3, 2..4);
        assert_eq!(sliced.y(), &Axis::Values(vec![17.5, -17.5]));
        assert_eq!(sliced.x(), &Axis::Even(EvenAxis::new(90.0, 45.0, 2)));
    }

    #[test]
    fn describe_uses_vals_for_listed_axes() {
        let desc = n2().describe();
        assert!(desc.contains("yvals"));
        assert!(!desc.contains("yfirst"));
        assert!(desc.contains("xfirst"));
        assert!(desc.contains("xinc"));
    }
}
