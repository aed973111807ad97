//! Error types for metgrid.
//!
//! This module provides a unified error handling approach using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for metgrid operations.
pub type Result<T> = std::result::Result<T, MetgridError>;

/// Problems found while decoding a grid description.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A key required by the selected grid type is absent.
    #[error("missing key `{key}` for gridtype `{gridtype}`")]
    MissingKey {
        /// Name of the missing key.
        key: String,
        /// Grid type that requires it.
        gridtype: String,
    },

    /// The `gridtype` value has no matching grid.
    #[error("unknown gridtype `{0}`")]
    UnknownGridType(String),

    /// A key is present but its value cannot be used.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// Name of the offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ParseError {
    /// Create a MissingKey error.
    pub fn missing_key(key: impl Into<String>, gridtype: impl Into<String>) -> Self {
        Self::MissingKey {
            key: key.into(),
            gridtype: gridtype.into(),
        }
    }

    /// Create an InvalidValue error.
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur in metgrid.
#[derive(Debug, Error)]
pub enum MetgridError {
    /// Malformed or incomplete grid description.
    #[error("grid description error: {0}")]
    Parse(#[from] ParseError),

    /// Grid shape does not match the trailing dimensions of an array.
    #[error("shape mismatch: grid expects trailing dims {expected:?}, array has {found:?}")]
    ShapeMismatch {
        /// Shape declared by the grid.
        expected: Vec<usize>,
        /// Shape of the array.
        found: Vec<usize>,
    },

    /// The array was structurally changed after the grid was attached.
    #[error("grid binding is stale: the array was restructured, set the grid again")]
    StaleBinding,

    /// A grid-dependent operation was requested without a grid.
    #[error("no grid is attached to this array")]
    GridNotSet,

    /// Index ranges or indices outside the grid.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// A coordinate selection matched no grid point.
    #[error("selection {0} contains no grid points")]
    EmptySelection(String),

    /// Projection definition could not be interpreted.
    #[error("projection error: {0}")]
    Projection(String),

    /// Failed to open a file.
    #[error("Failed to open file: {path}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read NetCDF file.
    #[error("NetCDF error: {0}")]
    NetCDF(String),

    /// Requested variable is not in the file.
    #[error("Variable not found: {name}")]
    VariableNotFound { name: String },
}

impl MetgridError {
    /// Create a FileOpen error.
    pub fn file_open(path: PathBuf, source: std::io::Error) -> Self {
        Self::FileOpen { path, source }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(expected: &[usize], found: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// Create a VariableNotFound error.
    pub fn variable_not_found(name: impl Into<String>) -> Self {
        Self::VariableNotFound { name: name.into() }
    }
}

impl From<netcdf::Error> for MetgridError {
    fn from(err: netcdf::Error) -> Self {
        Self::NetCDF(err.to_string())
    }
}
