//! Accessors: wrappers that bind grid or location metadata to data.
//!
//! [`SpatialAccessor`] holds an n-dimensional array plus the grid of its
//! trailing dimensions. [`SeriesAccessor`] holds a time series plus the
//! location it belongs to.

mod series;
mod spatial;

pub use series::{Provenance, SeriesAccessor, TimeSeries};
pub use spatial::SpatialAccessor;
