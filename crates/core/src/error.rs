//! Error types for Zonalite

use thiserror::Error;

/// Main error type for Zonalite operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed stat descriptor. The message prefix is stable so callers
    /// can match on it.
    #[error("Invalid stat descriptor. {0}")]
    InvalidDescriptor(String),

    #[error("Unknown raster {raster} in stat {stat}")]
    UnknownRaster { raster: String, stat: String },

    #[error("Unknown stat: {0}")]
    UnknownStat(String),

    #[error("No weights provided for weighted stat: {0}")]
    MissingWeights(String),

    #[error("Value and weight rasters must have a single band or the same number of bands")]
    IncompatibleBands,

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Field {0} not found")]
    MissingField(String),

    #[error("Field {field} does not have type {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },

    #[error("Inconsistent array lengths.")]
    InconsistentArrayLengths,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Zonalite operations
pub type Result<T> = std::result::Result<T, Error>;
