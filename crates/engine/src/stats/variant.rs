//! Runtime dispatch over per-pixel-type accumulators

use crate::stats::RasterStats;
use zonalite_core::{Error, PixelType, Raster, RasterVariant, Result};

/// A [`RasterStats`] accumulator of any supported pixel type.
///
/// The tag is matched once per window; per-cell accumulation runs in the
/// monomorphized arm.
#[derive(Debug, Clone)]
pub enum RasterStatsVariant {
    I8(RasterStats<i8>),
    I16(RasterStats<i16>),
    I32(RasterStats<i32>),
    I64(RasterStats<i64>),
    F32(RasterStats<f32>),
    F64(RasterStats<f64>),
}

/// Dispatch on a [`RasterStatsVariant`], binding the typed accumulator in
/// each arm.
#[macro_export]
macro_rules! with_stats {
    ($variant:expr, $s:ident => $body:expr) => {
        match $variant {
            $crate::stats::RasterStatsVariant::I8($s) => $body,
            $crate::stats::RasterStatsVariant::I16($s) => $body,
            $crate::stats::RasterStatsVariant::I32($s) => $body,
            $crate::stats::RasterStatsVariant::I64($s) => $body,
            $crate::stats::RasterStatsVariant::F32($s) => $body,
            $crate::stats::RasterStatsVariant::F64($s) => $body,
        }
    };
}

impl RasterStatsVariant {
    /// Create an empty accumulator for the given pixel type
    pub fn new_empty(pixel_type: PixelType, store_values: bool) -> Self {
        match pixel_type {
            PixelType::I8 => RasterStatsVariant::I8(RasterStats::new(store_values)),
            PixelType::I16 => RasterStatsVariant::I16(RasterStats::new(store_values)),
            PixelType::I32 => RasterStatsVariant::I32(RasterStats::new(store_values)),
            PixelType::I64 => RasterStatsVariant::I64(RasterStats::new(store_values)),
            PixelType::F32 => RasterStatsVariant::F32(RasterStats::new(store_values)),
            PixelType::F64 => RasterStatsVariant::F64(RasterStats::new(store_values)),
        }
    }

    /// Pixel type this accumulator was created for
    pub fn pixel_type(&self) -> PixelType {
        match self {
            RasterStatsVariant::I8(_) => PixelType::I8,
            RasterStatsVariant::I16(_) => PixelType::I16,
            RasterStatsVariant::I32(_) => PixelType::I32,
            RasterStatsVariant::I64(_) => PixelType::I64,
            RasterStatsVariant::F32(_) => PixelType::F32,
            RasterStatsVariant::F64(_) => PixelType::F64,
        }
    }

    /// Ingest a coverage window with a values window of matching pixel type
    pub fn process(&mut self, coverage: &Raster<f32>, values: &RasterVariant) -> Result<()> {
        match (self, values) {
            (RasterStatsVariant::I8(s), RasterVariant::I8(v)) => s.process(coverage, v),
            (RasterStatsVariant::I16(s), RasterVariant::I16(v)) => s.process(coverage, v),
            (RasterStatsVariant::I32(s), RasterVariant::I32(v)) => s.process(coverage, v),
            (RasterStatsVariant::I64(s), RasterVariant::I64(v)) => s.process(coverage, v),
            (RasterStatsVariant::F32(s), RasterVariant::F32(v)) => s.process(coverage, v),
            (RasterStatsVariant::F64(s), RasterVariant::F64(v)) => s.process(coverage, v),
            _ => Err(Error::Other(
                "pixel type mismatch between accumulator and values raster".into(),
            )),
        }
    }

    /// Ingest a coverage window with values and external weights
    pub fn process_weighted(
        &mut self,
        coverage: &Raster<f32>,
        values: &RasterVariant,
        weights: &Raster<f64>,
    ) -> Result<()> {
        match (self, values) {
            (RasterStatsVariant::I8(s), RasterVariant::I8(v)) => {
                s.process_weighted(coverage, v, weights)
            }
            (RasterStatsVariant::I16(s), RasterVariant::I16(v)) => {
                s.process_weighted(coverage, v, weights)
            }
            (RasterStatsVariant::I32(s), RasterVariant::I32(v)) => {
                s.process_weighted(coverage, v, weights)
            }
            (RasterStatsVariant::I64(s), RasterVariant::I64(v)) => {
                s.process_weighted(coverage, v, weights)
            }
            (RasterStatsVariant::F32(s), RasterVariant::F32(v)) => {
                s.process_weighted(coverage, v, weights)
            }
            (RasterStatsVariant::F64(s), RasterVariant::F64(v)) => {
                s.process_weighted(coverage, v, weights)
            }
            _ => Err(Error::Other(
                "pixel type mismatch between accumulator and values raster".into(),
            )),
        }
    }
}
