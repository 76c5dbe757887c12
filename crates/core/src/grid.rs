//! Regular grid geometry

use crate::bounds::Bounds;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Relative tolerance used when checking that two grids are aligned
const ALIGN_TOL: f64 = 1e-6;

/// An axis-aligned regular grid.
///
/// Cells are addressed by `(row, col)` with row 0 at the top (maximum y).
/// Cell `(r, c)` occupies
/// `[xmin + c*dx, xmin + (c+1)*dx] x [ymax - (r+1)*dy, ymax - r*dy]`.
///
/// Points lying exactly on a cell boundary are attributed to a single cell:
/// top and left edges are inclusive, bottom and right edges belong to the
/// neighboring cell (except along the grid border, where the outermost cell
/// keeps its outer edge).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
    dx: f64,
    dy: f64,
}

impl Grid {
    /// Create a grid from its extent and cell sizes.
    ///
    /// Requires `dx, dy > 0` and a non-inverted extent.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64, dx: f64, dy: f64) -> Result<Self> {
        if !(dx > 0.0) || !(dy > 0.0) {
            return Err(Error::InvalidParameter {
                name: "cell size",
                value: format!("{dx}x{dy}"),
                reason: "cell sizes must be positive".into(),
            });
        }
        if xmax < xmin || ymax < ymin {
            return Err(Error::InvalidParameter {
                name: "extent",
                value: format!("({xmin}, {ymin}, {xmax}, {ymax})"),
                reason: "extent is inverted".into(),
            });
        }

        Ok(Self {
            xmin,
            ymin,
            xmax,
            ymax,
            dx,
            dy,
        })
    }

    /// A grid with no cells
    pub fn empty() -> Self {
        Self {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 0.0,
            ymax: 0.0,
            dx: 1.0,
            dy: 1.0,
        }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        ((self.ymax - self.ymin) / self.dy).round() as usize
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        ((self.xmax - self.xmin) / self.dx).round() as usize
    }

    /// Total number of cells
    pub fn size(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Whether the grid contains no cells
    pub fn is_empty(&self) -> bool {
        self.rows() == 0 || self.cols() == 0
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    /// Area of a single cell
    pub fn cell_area(&self) -> f64 {
        self.dx * self.dy
    }

    /// The grid extent
    pub fn extent(&self) -> Bounds {
        Bounds::new(self.xmin, self.ymin, self.xmax, self.ymax)
    }

    /// Extent of cell `(row, col)`
    pub fn cell(&self, row: usize, col: usize) -> Bounds {
        Bounds::new(
            self.xmin + col as f64 * self.dx,
            self.ymax - (row + 1) as f64 * self.dy,
            self.xmin + (col + 1) as f64 * self.dx,
            self.ymax - row as f64 * self.dy,
        )
    }

    /// X coordinate of the center of column `col`
    pub fn x_for_col(&self, col: usize) -> f64 {
        self.xmin + (col as f64 + 0.5) * self.dx
    }

    /// Y coordinate of the center of row `row`
    pub fn y_for_row(&self, row: usize) -> f64 {
        self.ymax - (row as f64 + 0.5) * self.dy
    }

    /// Column containing `x`
    pub fn col_for_x(&self, x: f64) -> Result<usize> {
        let off = (x - self.xmin) / self.dx;
        let cols = self.cols();

        if !(0.0..=cols as f64).contains(&off) {
            return Err(Error::GridMismatch(format!("x {x} is outside the grid")));
        }

        // The right border of the grid belongs to the last column.
        Ok((off.floor() as usize).min(cols.saturating_sub(1)))
    }

    /// Row containing `y`
    pub fn row_for_y(&self, y: f64) -> Result<usize> {
        let off = (self.ymax - y) / self.dy;
        let rows = self.rows();

        if !(0.0..=rows as f64).contains(&off) {
            return Err(Error::GridMismatch(format!("y {y} is outside the grid")));
        }

        Ok((off.floor() as usize).min(rows.saturating_sub(1)))
    }

    /// Scalar id of the cell containing `(x, y)`, in row-major order
    pub fn cell_id(&self, x: f64, y: f64) -> Result<i64> {
        let row = self.row_for_y(y)?;
        let col = self.col_for_x(x)?;
        Ok((row * self.cols() + col) as i64)
    }

    /// The minimal subgrid covering every cell that intersects `bounds`,
    /// clipped to this grid's extent. Empty if there is no overlap.
    pub fn shrink_to_fit(&self, bounds: &Bounds) -> Grid {
        if self.is_empty() || bounds.is_empty() {
            return Grid::empty();
        }

        let ix = self.extent().intersection(bounds);
        if ix.is_empty() {
            return Grid::empty();
        }

        let cols = self.cols() as i64;
        let rows = self.rows() as i64;

        let c0 = (((ix.xmin - self.xmin) / self.dx).floor() as i64).clamp(0, cols - 1);
        let c1 = ((((ix.xmax - self.xmin) / self.dx).ceil() as i64) - 1).clamp(0, cols - 1);
        let r0 = (((self.ymax - ix.ymax) / self.dy).floor() as i64).clamp(0, rows - 1);
        let r1 = ((((self.ymax - ix.ymin) / self.dy).ceil() as i64) - 1).clamp(0, rows - 1);

        if c1 < c0 || r1 < r0 {
            return Grid::empty();
        }

        Grid {
            xmin: self.xmin + c0 as f64 * self.dx,
            ymin: self.ymax - (r1 + 1) as f64 * self.dy,
            xmax: self.xmin + (c1 + 1) as f64 * self.dx,
            ymax: self.ymax - r0 as f64 * self.dy,
            dx: self.dx,
            dy: self.dy,
        }
    }

    /// Whether `other` shares this grid's cell size and cell boundaries
    pub fn compatible_with(&self, other: &Grid) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }

        let same_size = (self.dx - other.dx).abs() <= ALIGN_TOL * self.dx
            && (self.dy - other.dy).abs() <= ALIGN_TOL * self.dy;
        if !same_size {
            return false;
        }

        let col_shift = (other.xmin - self.xmin) / self.dx;
        let row_shift = (self.ymax - other.ymax) / self.dy;

        (col_shift - col_shift.round()).abs() <= ALIGN_TOL
            && (row_shift - row_shift.round()).abs() <= ALIGN_TOL
    }

    /// Row and column of `sub`'s top-left cell within this grid
    pub fn offsets_of(&self, sub: &Grid) -> Result<(usize, usize)> {
        if !self.compatible_with(sub) {
            return Err(Error::GridMismatch(
                "subgrid is not aligned with parent grid".into(),
            ));
        }

        let row_off = ((self.ymax - sub.ymax) / self.dy).round();
        let col_off = ((sub.xmin - self.xmin) / self.dx).round();

        if row_off < 0.0
            || col_off < 0.0
            || row_off as usize + sub.rows() > self.rows()
            || col_off as usize + sub.cols() > self.cols()
        {
            return Err(Error::GridMismatch(
                "subgrid extends outside parent grid".into(),
            ));
        }

        Ok((row_off as usize, col_off as usize))
    }

    /// Intersection of two aligned grids; empty when they do not overlap
    pub fn intersection(&self, other: &Grid) -> Result<Grid> {
        if !self.compatible_with(other) {
            return Err(Error::GridMismatch(
                "grids have different cell sizes or origins".into(),
            ));
        }

        if self.is_empty() || other.is_empty() {
            return Ok(Grid::empty());
        }

        Ok(self.shrink_to_fit(&other.extent().intersection(&self.extent())))
    }

    /// Split the grid into horizontal bands of at most `max_cells` cells.
    ///
    /// Each band is a full-width run of consecutive rows, so results over
    /// bands compose exactly.
    pub fn stripes(&self, max_cells: usize) -> Vec<Grid> {
        if self.is_empty() {
            return Vec::new();
        }

        let rows = self.rows();
        let cols = self.cols();
        let rows_per = (max_cells / cols).clamp(1, rows);

        (0..rows)
            .step_by(rows_per)
            .map(|r0| {
                let r1 = (r0 + rows_per).min(rows);
                Grid {
                    xmin: self.xmin,
                    ymin: self.ymax - r1 as f64 * self.dy,
                    xmax: self.xmax,
                    ymax: self.ymax - r0 as f64 * self.dy,
                    dx: self.dx,
                    dy: self.dy,
                }
            })
            .collect()
    }
}
