//! # Zonalite Engine
//!
//! Exact-coverage zonal statistics: given rasters of numeric cell values
//! and a set of polygon features, computes per-feature summary statistics
//! weighted by the exact fraction of each cell that lies inside each
//! polygon. Coverage fractions are computed analytically from the polygon
//! edges, never by supersampling.
//!
//! ## Components
//!
//! - **coverage**: per-cell coverage fractions for a polygon on a grid
//! - **stats**: coverage-weighted statistics accumulators over the closed
//!   pixel-type set
//! - **descriptor** / **operation**: the stat descriptor language and the
//!   operation catalog it instantiates
//! - **registry**: per-feature accumulator lookup and lifecycle
//! - **processor** / **output**: the per-feature pipeline and the writer
//!   contract
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use geo_types::{polygon, Geometry};
//! use zonalite_core::{Feature, Grid, MemoryFeatureSource, MemoryRasterSource, Raster, RasterSource};
//! use zonalite_engine::operation::prepare_operations;
//! use zonalite_engine::output::MemoryWriter;
//! use zonalite_engine::processor::FeatureSequentialProcessor;
//!
//! let grid = Grid::new(0.0, 0.0, 3.0, 3.0, 1.0, 1.0)?;
//! let raster = Raster::from_vec(grid, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])?;
//! let pop: Arc<dyn RasterSource> = Arc::new(MemoryRasterSource::new("pop", raster));
//!
//! let mut processor = FeatureSequentialProcessor::new();
//! processor.add_operations(prepare_operations(
//!     &["mean".to_string(), "count".to_string()],
//!     &[pop],
//!     &[],
//! )?);
//!
//! let feature = Feature::new(Geometry::Polygon(polygon![
//!     (x: 0.5, y: 0.5),
//!     (x: 2.5, y: 0.5),
//!     (x: 2.5, y: 2.5),
//!     (x: 0.5, y: 2.5),
//!     (x: 0.5, y: 0.5),
//! ]));
//!
//! let mut source = MemoryFeatureSource::new(vec![feature]);
//! let mut writer = MemoryWriter::new();
//! processor.process(&mut source, &mut writer)?;
//!
//! let mean = writer.features()[0].get_double("mean")?;
//! assert!((mean - 5.0).abs() < 1e-10);
//! # Ok::<(), zonalite_core::Error>(())
//! ```

pub mod coverage;
pub mod descriptor;
pub mod operation;
pub mod output;
pub mod processor;
pub mod registry;
pub mod stats;

pub use coverage::coverage_fraction;
pub use descriptor::{parse_stat_descriptor, StatDescriptor};
pub use operation::{prepare_operations, Operation, Stat};
pub use output::{MemoryWriter, OutputWriter};
pub use processor::FeatureSequentialProcessor;
pub use registry::StatsRegistry;
pub use stats::{RasterStats, RasterStatsVariant};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::coverage::coverage_fraction;
    pub use crate::descriptor::{parse_stat_descriptor, StatDescriptor};
    pub use crate::operation::{prepare_operations, Operation, Stat};
    pub use crate::output::{MemoryWriter, OutputWriter};
    pub use crate::processor::FeatureSequentialProcessor;
    pub use crate::registry::StatsRegistry;
    pub use crate::stats::{RasterStats, RasterStatsVariant};
    pub use zonalite_core::prelude::*;
}
