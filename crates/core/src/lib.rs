//! # Zonalite Core
//!
//! Core types and contracts for the Zonalite zonal statistics engine.
//!
//! This crate provides:
//! - `Grid` / `Bounds`: regular grid geometry and extents
//! - `Raster<T>`: a raster window generic over the closed pixel-type set
//! - `RasterVariant` / `PixelType`: runtime pixel-type dispatch
//! - `Feature` / `FieldValue`: vector features with typed fields
//! - `RasterSource` / `FeatureSource`: the narrow input contracts the
//!   engine consumes, with in-memory implementations

pub mod bounds;
pub mod error;
pub mod feature;
pub mod grid;
pub mod raster;
pub mod source;

pub use bounds::Bounds;
pub use error::{Error, Result};
pub use feature::{Feature, FieldType, FieldValue};
pub use grid::Grid;
pub use raster::{PixelType, Raster, RasterElement, RasterVariant};
pub use source::{FeatureSource, MemoryFeatureSource, MemoryRasterSource, RasterSource};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bounds::Bounds;
    pub use crate::error::{Error, Result};
    pub use crate::feature::{Feature, FieldType, FieldValue};
    pub use crate::grid::Grid;
    pub use crate::raster::{PixelType, Raster, RasterElement, RasterVariant};
    pub use crate::source::{
        FeatureSource, MemoryFeatureSource, MemoryRasterSource, RasterSource,
    };
}
