//! Narrow contracts for raster and feature inputs
//!
//! The engine consumes rasters and features exclusively through these
//! traits. File-format backends live outside this workspace; the in-memory
//! implementations here back the test suite and embedding callers.

use crate::bounds::Bounds;
use crate::error::Result;
use crate::feature::Feature;
use crate::grid::Grid;
use crate::raster::{PixelType, Raster, RasterElement, RasterVariant};

/// A named, read-only source of raster windows.
///
/// The pixel type is fixed per source and discoverable before any window is
/// read, either through [`RasterSource::pixel_type`] or by inspecting the
/// zero-cell raster from [`RasterSource::read_empty`].
pub trait RasterSource {
    /// Name used in stat descriptors and generated field names
    fn name(&self) -> &str;

    /// The full grid of the source
    fn grid(&self) -> &Grid;

    /// Pixel type of every window this source produces
    fn pixel_type(&self) -> PixelType;

    /// Read the minimal aligned window covering `bounds`, clipped to the
    /// source extent
    fn read_window(&self, bounds: &Bounds) -> Result<RasterVariant>;

    /// A zero-cell raster carrying the source's pixel type and no-data
    /// sentinel
    fn read_empty(&self) -> RasterVariant;

    /// No-data sentinel widened to f64
    fn nodata(&self) -> Option<f64> {
        self.read_empty().nodata()
    }
}

/// A source of input features
pub trait FeatureSource {
    /// Iterate over the features of the source
    fn features(&mut self) -> Box<dyn Iterator<Item = Result<Feature>> + '_>;
}

/// A raster held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryRasterSource<T: RasterElement> {
    name: String,
    raster: Raster<T>,
}

impl<T: RasterElement> MemoryRasterSource<T> {
    pub fn new(name: impl Into<String>, raster: Raster<T>) -> Self {
        Self {
            name: name.into(),
            raster,
        }
    }

    pub fn raster(&self) -> &Raster<T> {
        &self.raster
    }
}

impl<T: RasterElement> RasterSource for MemoryRasterSource<T>
where
    RasterVariant: From<Raster<T>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn grid(&self) -> &Grid {
        self.raster.grid()
    }

    fn pixel_type(&self) -> PixelType {
        T::PIXEL_TYPE
    }

    fn read_window(&self, bounds: &Bounds) -> Result<RasterVariant> {
        let sub = self.raster.grid().shrink_to_fit(bounds);
        Ok(self.raster.window(&sub)?.into())
    }

    fn read_empty(&self) -> RasterVariant {
        let mut empty: Raster<T> = Raster::empty();
        empty.set_nodata(self.raster.nodata());
        empty.into()
    }
}

/// A feature collection held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFeatureSource {
    features: Vec<Feature>,
}

impl MemoryFeatureSource {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FeatureSource for MemoryFeatureSource {
    fn features(&mut self) -> Box<dyn Iterator<Item = Result<Feature>> + '_> {
        Box::new(self.features.iter().cloned().map(Ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_raster_source() {
        let grid = Grid::new(0.0, 0.0, 3.0, 3.0, 1.0, 1.0).unwrap();
        let data: Vec<i32> = (1..=9).collect();
        let mut raster = Raster::from_vec(grid, data).unwrap();
        raster.set_nodata(Some(-1));

        let src = MemoryRasterSource::new("values", raster);
        assert_eq!(src.name(), "values");
        assert_eq!(src.pixel_type(), PixelType::I32);
        assert_eq!(src.nodata(), Some(-1.0));

        let w = src.read_window(&Bounds::new(0.5, 0.5, 1.5, 1.5)).unwrap();
        assert_eq!(w.grid().rows(), 2);
        assert_eq!(w.grid().cols(), 2);

        let empty = src.read_empty();
        assert!(empty.is_empty());
        assert_eq!(empty.pixel_type(), PixelType::I32);
    }

    #[test]
    fn test_window_outside_extent_is_empty() {
        let grid = Grid::new(0.0, 0.0, 3.0, 3.0, 1.0, 1.0).unwrap();
        let src = MemoryRasterSource::new("v", Raster::<f32>::new(grid));

        let w = src
            .read_window(&Bounds::new(10.0, 10.0, 12.0, 12.0))
            .unwrap();
        assert!(w.is_empty());
    }

    #[test]
    fn test_memory_feature_source() {
        let mut src = MemoryFeatureSource::default();
        src.push(Feature::empty());
        src.push(Feature::empty());

        let count = src.features().count();
        assert_eq!(count, 2);
    }
}
