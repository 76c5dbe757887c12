//! Raster data structures and runtime pixel-type dispatch

mod element;
mod variant;
mod window;

pub use element::RasterElement;
pub use variant::{PixelType, RasterVariant};
pub use window::Raster;
