//! Raster windows: a grid plus cell values

use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::raster::RasterElement;
use ndarray::{Array2, ArrayView2};

/// A rectangular window of raster values.
///
/// `Raster<T>` couples an `Array2<T>` with the [`Grid`] describing its
/// georeferenced extent, plus an optional no-data sentinel. Windows read
/// from a larger raster carry the subgrid they cover, so windows taken from
/// aligned sources can be intersected cell-for-cell.
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    grid: Grid,
    data: Array2<T>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a raster filled with zeros over `grid`
    pub fn new(grid: Grid) -> Self {
        Self {
            data: Array2::zeros((grid.rows(), grid.cols())),
            grid,
            nodata: None,
        }
    }

    /// Create a raster filled with a specific value
    pub fn filled(grid: Grid, value: T) -> Self {
        Self {
            data: Array2::from_elem((grid.rows(), grid.cols()), value),
            grid,
            nodata: None,
        }
    }

    /// Create a raster from row-major data
    pub fn from_vec(grid: Grid, data: Vec<T>) -> Result<Self> {
        if data.len() != grid.size() {
            return Err(Error::InvalidDimensions {
                width: grid.cols(),
                height: grid.rows(),
            });
        }

        let array = Array2::from_shape_vec((grid.rows(), grid.cols()), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            grid,
            data: array,
            nodata: None,
        })
    }

    /// Create a raster from an ndarray
    pub fn from_array(grid: Grid, data: Array2<T>) -> Result<Self> {
        if data.dim() != (grid.rows(), grid.cols()) {
            return Err(Error::InvalidDimensions {
                width: data.ncols(),
                height: data.nrows(),
            });
        }

        Ok(Self {
            grid,
            data,
            nodata: None,
        })
    }

    /// A raster with no cells
    pub fn empty() -> Self {
        Self::new(Grid::empty())
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Whether the raster has no cells
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The grid covered by this window
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Builder-style no-data assignment
    pub fn with_nodata(mut self, nodata: T) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Defined value at (row, col): `None` for out-of-window cells and for
    /// no-data (including NaN in floating-point rasters)
    pub fn value(&self, row: usize, col: usize) -> Option<T> {
        let v = *self.data.get((row, col))?;
        if v.is_nodata(self.nodata) {
            None
        } else {
            Some(v)
        }
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Extract the window covering `sub`, which must be aligned with and
    /// contained in this raster's grid
    pub fn window(&self, sub: &Grid) -> Result<Raster<T>> {
        if sub.is_empty() {
            let mut out = Raster::new(Grid::empty());
            out.nodata = self.nodata;
            return Ok(out);
        }

        let (r0, c0) = self.grid.offsets_of(sub)?;
        let data = self
            .data
            .slice(ndarray::s![r0..r0 + sub.rows(), c0..c0 + sub.cols()])
            .to_owned();

        Ok(Self {
            grid: *sub,
            data,
            nodata: self.nodata,
        })
    }
}
