//! File handlers.
//!
//! A handler reads one file and emits [`Message`]s, one per variable, that
//! carry the values together with dimension names, attributes and the grid
//! of the trailing dimensions when the file describes one.

mod handler;
mod netcdf_handler;

pub use handler::{FileHandler, Message};
pub use netcdf_handler::{NetCdfHandler, DEFAULT_FILL_VALUE};
