//! One-dimensional grid axes.

use crate::error::{ParseError, Result};
use std::fmt;
use std::ops::Range;

/// Relative tolerance used when deciding whether a step divides a span.
const DIVIDES_TOLERANCE: f64 = 1e-9;

/// An evenly spaced axis described by its first value, increment and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvenAxis {
    first: f64,
    inc: f64,
    size: usize,
}

impl EvenAxis {
    /// Create an axis from the griddes `first`, `inc` and `size` triple.
    pub fn new(first: f64, inc: f64, size: usize) -> Self {
        Self { first, inc, size }
    }

    /// Create an axis from a `(start, end, step)` triple.
    ///
    /// `end` is part of the axis only if `step` divides `end - start`
    /// (within a relative tolerance of 1e-9). Otherwise the axis stops at the
    /// last value that does not pass `end`.
    pub fn from_bounds(start: f64, end: f64, step: f64) -> Result<Self> {
        if step == 0.0 || !step.is_finite() {
            return Err(ParseError::invalid_value("inc", "step must be finite and non-zero").into());
        }
        let span = end - start;
        if span != 0.0 && span.signum() != step.signum() {
            return Err(ParseError::invalid_value(
                "inc",
                format!("step {step} does not lead from {start} to {end}"),
            )
            .into());
        }

        let steps = span / step;
        let rounded = steps.round();
        let whole = if (steps - rounded).abs() <= DIVIDES_TOLERANCE * rounded.abs().max(1.0) {
            rounded
        } else {
            steps.floor()
        };

        Ok(Self::new(start, step, whole as usize + 1))
    }

    /// First coordinate value.
    pub fn first(&self) -> f64 {
        self.first
    }

    /// Increment between neighbouring values.
    pub fn inc(&self) -> f64 {
        self.inc
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the axis has no values.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Value at `index`.
    pub fn value(&self, index: usize) -> f64 {
        self.first + index as f64 * self.inc
    }

    /// Last value, if any.
    pub fn last(&self) -> Option<f64> {
        self.size.checked_sub(1).map(|i| self.value(i))
    }

    /// All values.
    pub fn values(&self) -> Vec<f64> {
        (0..self.size).map(|i| self.value(i)).collect()
    }

    /// Sub-axis covering `range`; the caller checks the bounds.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self::new(self.value(range.start), self.inc, range.len())
    }
}

/// A grid axis that is either evenly spaced or an explicit list of values.
#[derive(Debug, Clone, PartialEq)]
pub enum Axis {
    /// Evenly spaced values.
    Even(EvenAxis),
    /// Explicit values, e.g. Gaussian latitudes.
    Values(Vec<f64>),
}

impl Axis {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Axis::Even(axis) => axis.len(),
            Axis::Values(values) => values.len(),
        }
    }

    /// Whether the axis has no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index`; the caller checks the bounds.
    pub fn value(&self, index: usize) -> f64 {
        match self {
            Axis::Even(axis) => axis.value(index),
            Axis::Values(values) => values[index],
        }
    }

    /// All values.
    pub fn values(&self) -> Vec<f64> {
        match self {
            Axis::Even(axis) => axis.values(),
            Axis::Values(values) => values.clone(),
        }
    }

    /// Sub-axis covering `range`, keeping the axis flavour.
    pub fn slice(&self, range: Range<usize>) -> Self {
        match self {
            Axis::Even(axis) => Axis::Even(axis.slice(range)),
            Axis::Values(values) => Axis::Values(values[range].to_vec()),
        }
    }

    /// Index range of the values lying within `[lo, hi]`.
    ///
    /// Axes are monotonic, so the matching values are contiguous.
    pub(crate) fn range_within(&self, lo: f64, hi: f64) -> Option<Range<usize>> {
        index_range_within(self.len(), |i| self.value(i), lo, hi)
    }
}

/// Index range of the values `value(0..len)` lying within `[lo, hi]`,
/// assuming the values are monotonic.
pub(crate) fn index_range_within(
    len: usize,
    value: impl Fn(usize) -> f64,
    lo: f64,
    hi: f64,
) -> Option<Range<usize>> {
    let mut matching = (0..len).filter(|&i| {
        let v = value(i);
        v >= lo && v <= hi
    });
    let start = matching.next()?;
    let end = matching.last().unwrap_or(start) + 1;
    Some(start..end)
}

impl From<EvenAxis> for Axis {
    fn from(axis: EvenAxis) -> Self {
        Axis::Even(axis)
    }
}

/// Angular unit of geographic axis values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnit {
    /// Degrees.
    #[default]
    Degrees,
    /// Radians.
    Radians,
}

impl AngleUnit {
    /// Interpret a griddes `xunits`/`yunits` value.
    pub fn parse(units: &str) -> Option<Self> {
        let units = units.to_lowercase();
        if units.contains("rad") {
            Some(AngleUnit::Radians)
        } else if units.contains("deg") {
            Some(AngleUnit::Degrees)
        } else {
            None
        }
    }

    /// Convert a value in this unit to degrees.
    pub fn to_degrees(self, value: f64) -> f64 {
        match self {
            AngleUnit::Degrees => value,
            AngleUnit::Radians => value.to_degrees(),
        }
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AngleUnit::Degrees => write!(f, "degrees"),
            AngleUnit::Radians => write!(f, "radians"),
        }
    }
}
