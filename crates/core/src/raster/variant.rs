//! Runtime pixel-type dispatch

use crate::error::Result;
use crate::grid::Grid;
use crate::raster::{Raster, RasterElement};
use ndarray::Array2;

/// The closed set of supported pixel types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl PixelType {
    /// Whether this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, PixelType::F32 | PixelType::F64)
    }
}

/// A raster window of any supported pixel type.
///
/// The tag is matched once per window; per-cell access happens inside the
/// monomorphized arm, never through dynamic dispatch.
#[derive(Debug, Clone)]
pub enum RasterVariant {
    I8(Raster<i8>),
    I16(Raster<i16>),
    I32(Raster<i32>),
    I64(Raster<i64>),
    F32(Raster<f32>),
    F64(Raster<f64>),
}

/// Dispatch on a [`RasterVariant`], binding the typed raster in each arm.
#[macro_export]
macro_rules! with_raster {
    ($variant:expr, $r:ident => $body:expr) => {
        match $variant {
            $crate::raster::RasterVariant::I8($r) => $body,
            $crate::raster::RasterVariant::I16($r) => $body,
            $crate::raster::RasterVariant::I32($r) => $body,
            $crate::raster::RasterVariant::I64($r) => $body,
            $crate::raster::RasterVariant::F32($r) => $body,
            $crate::raster::RasterVariant::F64($r) => $body,
        }
    };
}

impl RasterVariant {
    /// Runtime pixel type of the contained raster
    pub fn pixel_type(&self) -> PixelType {
        match self {
            RasterVariant::I8(_) => PixelType::I8,
            RasterVariant::I16(_) => PixelType::I16,
            RasterVariant::I32(_) => PixelType::I32,
            RasterVariant::I64(_) => PixelType::I64,
            RasterVariant::F32(_) => PixelType::F32,
            RasterVariant::F64(_) => PixelType::F64,
        }
    }

    /// The grid covered by the contained window
    pub fn grid(&self) -> &Grid {
        with_raster!(self, r => r.grid())
    }

    pub fn is_empty(&self) -> bool {
        with_raster!(self, r => r.is_empty())
    }

    /// No-data sentinel widened to f64
    pub fn nodata(&self) -> Option<f64> {
        with_raster!(self, r => r.nodata().map(|v| v.to_f64()))
    }

    /// Extract an aligned subwindow, preserving the pixel type
    pub fn window(&self, sub: &Grid) -> Result<RasterVariant> {
        Ok(with_raster!(self, r => r.window(sub)?.into()))
    }

    /// Widen to an f64 raster, mapping no-data cells to NaN.
    ///
    /// Used for weight windows, where values of any pixel type feed f64
    /// accumulators.
    pub fn to_f64(&self) -> Raster<f64> {
        with_raster!(self, r => {
            let data: Array2<f64> = r.view().map(|v| {
                if v.is_nodata(r.nodata()) {
                    f64::NAN
                } else {
                    v.to_f64()
                }
            });

            // Shapes match by construction
            Raster::from_array(*r.grid(), data).unwrap_or_else(|_| Raster::empty())
        })
    }
}

macro_rules! impl_variant_from {
    ($t:ty, $arm:ident) => {
        impl From<Raster<$t>> for RasterVariant {
            fn from(r: Raster<$t>) -> Self {
                RasterVariant::$arm(r)
            }
        }
    };
}

impl_variant_from!(i8, I8);
impl_variant_from!(i16, I16);
impl_variant_from!(i32, I32);
impl_variant_from!(i64, I64);
impl_variant_from!(f32, F32);
impl_variant_from!(f64, F64);
