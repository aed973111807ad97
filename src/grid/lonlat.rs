//! Regular latitude/longitude grids.

use super::axis::{index_range_within, AngleUnit, EvenAxis};
use super::description::GridDescription;
use super::LonLatBox;
use std::ops::Range;

/// A grid with evenly spaced latitudes (y) and longitudes (x).
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    y: EvenAxis,
    x: EvenAxis,
    yunits: AngleUnit,
    xunits: AngleUnit,
}

impl LatLonGrid {
    /// Create a grid from its latitude and longitude axes in degrees.
    pub fn new(y: EvenAxis, x: EvenAxis) -> Self {
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
    pub fn y(&self) -> &EvenAxis {
        &self.y
    }

    /// Longitude axis.
    pub fn x(&self) -> &EvenAxis {
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
    pub fn slice(&self, y: Range<usize>, x: Range<usize>) -> LatLonGrid {
        Self {
            y: self.y.slice(y),
            x: self.x.slice(x),
            ..self.clone()
        }
    }

    pub(crate) fn box_ranges(&self, bbox: &LonLatBox) -> Option<(Range<usize>, Range<usize>)> {
        let (south, north) = bbox.lat_bounds();
        let (west, east) = bbox.lon_bounds();
        let y = index_range_within(self.y.len(), |j| self.yunits.to_degrees(self.y.value(j)), south, north)?;
        let x = index_range_within(self.x.len(), |i| self.xunits.to_degrees(self.x.value(i)), west, east)?;
        Some((y, x))
    }

    /// Grid description in griddes form.
    pub fn describe(&self) -> GridDescription {
        let mut desc = GridDescription::new();
        desc.insert("gridtype", "lonlat");
        desc.insert("gridsize", self.y.len() * self.x.len());
        desc.insert("xsize", self.x.len());
        desc.insert("ysize", self.y.len());
        desc.insert("xname", "lon");
        desc.insert("xunits", self.xunits.to_string());
        desc.insert("yname", "lat");
        desc.insert("yunits", self.yunits.to_string());
        desc.insert("xfirst", self.x.first());
        desc.insert("xinc", self.x.inc());
        desc.insert("yfirst", self.y.first());
        desc.insert("yinc", self.y.inc());
        desc
    }
}
