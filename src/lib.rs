//! Metgrid - grid metadata for meteorological data.
//!
//! Metgrid parses CDO grid descriptions into typed grids, binds grids to
//! in-memory arrays through accessors, and reads variables from NetCDF files.
//!
//! # Features
//!
//! - Regular lon/lat, Gaussian, projected, curvilinear and unstructured grids
//! - CDO `griddes` parsing and rendering
//! - Slicing with one-way degeneration to unstructured grids
//! - Lon/lat box selection and nearest grid point lookup
//! - Time series extraction and merging
//! - NetCDF reading with CF unpacking
//!
//! # Example
//!
//! ```ignore
//! use metgrid::{Grid, GridKind};
//!
//! let grid: Grid = std::fs::read_to_string("llc.griddes")?.parse()?;
//! assert_eq!(grid.kind(), GridKind::Projection);
//!
//! // Slicing a projected grid leaves only the point coordinates.
//! let cut = grid.slice(&[0..10, 0..10])?;
//! assert_eq!(cut.kind(), GridKind::Unstructured);
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod accessor;
pub mod data;
pub mod error;
pub mod grid;
pub mod projection;

pub use accessor::{Provenance, SeriesAccessor, SpatialAccessor, TimeSeries};
pub use data::{FileHandler, Message, NetCdfHandler};
pub use error::{MetgridError, ParseError, Result};
pub use grid::{Grid, GridBuilder, GridDescription, GridKind, LonLatBox};
pub use projection::Projection;
