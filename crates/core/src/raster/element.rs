//! Raster element trait for generic cell values

use crate::feature::FieldValue;
use crate::raster::PixelType;
use num_traits::{NumCast, Zero};
use std::fmt::{Debug, Display};

/// Trait for types that can be stored in a raster cell.
///
/// Implemented exactly for the closed pixel-type set
/// `{i8, i16, i32, i64, f32, f64}`; runtime dispatch over that set goes
/// through [`PixelType`](crate::raster::PixelType) and
/// [`RasterVariant`](crate::raster::RasterVariant).
pub trait RasterElement:
    Copy + Clone + Debug + Display + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Runtime tag for this pixel type
    const PIXEL_TYPE: PixelType;

    /// Check if this value represents no-data.
    ///
    /// NaN is always no-data for floating point types. Sentinel comparison
    /// is exact: a nodata sentinel must match bit-for-bit.
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> f64;

    /// Convert a single value into an output field value
    fn field_value(self) -> FieldValue;

    /// Convert a slice of values into an output array field value
    fn field_array(values: &[Self]) -> FieldValue;
}

macro_rules! impl_raster_element_int {
    ($t:ty, $pt:expr, $scalar:expr, $array:expr) => {
        impl RasterElement for $t {
            const PIXEL_TYPE: PixelType = $pt;

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                match nodata {
                    Some(nd) => *self == nd,
                    None => false,
                }
            }

            fn is_float() -> bool {
                false
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn field_value(self) -> FieldValue {
                $scalar(self)
            }

            fn field_array(values: &[Self]) -> FieldValue {
                $array(values)
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty, $pt:expr) => {
        impl RasterElement for $t {
            const PIXEL_TYPE: PixelType = $pt;

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => *self == nd,
                    None => false,
                }
            }

            fn is_float() -> bool {
                true
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn field_value(self) -> FieldValue {
                FieldValue::Double(self as f64)
            }

            fn field_array(values: &[Self]) -> FieldValue {
                FieldValue::DoubleArray(values.iter().map(|v| *v as f64).collect())
            }
        }
    };
}

impl_raster_element_int!(
    i8,
    PixelType::I8,
    |v| FieldValue::Int(v as i32),
    |vs: &[i8]| FieldValue::IntArray(vs.iter().map(|v| *v as i32).collect())
);
impl_raster_element_int!(
    i16,
    PixelType::I16,
    |v| FieldValue::Int(v as i32),
    |vs: &[i16]| FieldValue::IntArray(vs.iter().map(|v| *v as i32).collect())
);
impl_raster_element_int!(
    i32,
    PixelType::I32,
    FieldValue::Int,
    |vs: &[i32]| FieldValue::IntArray(vs.to_vec())
);
impl_raster_element_int!(
    i64,
    PixelType::I64,
    FieldValue::Int64,
    |vs: &[i64]| FieldValue::Int64Array(vs.to_vec())
);
impl_raster_element_float!(f32, PixelType::F32);
impl_raster_element_float!(f64, PixelType::F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodata_semantics() {
        assert!(5i32.is_nodata(Some(5)));
        assert!(!5i32.is_nodata(Some(6)));
        assert!(!5i32.is_nodata(None));

        assert!(f64::NAN.is_nodata(None));
        assert!((-999.0f32).is_nodata(Some(-999.0)));
        assert!(!1.5f64.is_nodata(Some(-999.0)));
    }

    #[test]
    fn test_field_conversion() {
        assert_eq!(7i16.field_value(), FieldValue::Int(7));
        assert_eq!(7i64.field_value(), FieldValue::Int64(7));
        assert_eq!(0.5f32.field_value(), FieldValue::Double(0.5));

        assert_eq!(
            <i8 as RasterElement>::field_array(&[1, 2]),
            FieldValue::IntArray(vec![1, 2])
        );
    }
}
