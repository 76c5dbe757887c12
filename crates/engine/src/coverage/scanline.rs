//! Signed-area accumulation of ring edges over a cell window
//!
//! Each directed ring edge is split at grid row and column boundaries. An
//! in-cell piece contributes two terms, derived from Green's theorem
//! (`area = closed integral of x dy`):
//!
//! - the exact trapezoid area between the piece and the left edge of its
//!   cell, added to that cell, and
//! - a "cover" term equal to the piece's signed height, which stands for a
//!   full-width contribution to every cell left of it in the same row.
//!
//! Cover terms are resolved by a single right-to-left pass per row. The
//! result is the exact signed area of the ring within each cell: interior
//! cells come out at exactly one cell area, untouched cells at zero.
//! Rows are independent, so evaluating a window in horizontal stripes
//! composes exactly.

use geo_types::Coord;
use ndarray::Array2;
use std::cmp::Ordering;
use zonalite_core::Grid;

pub(crate) struct AreaAccumulator {
    grid: Grid,
    area: Array2<f64>,
    cover: Array2<f64>,
}

impl AreaAccumulator {
    pub fn new(grid: Grid) -> Self {
        let shape = (grid.rows(), grid.cols());
        Self {
            grid,
            area: Array2::zeros(shape),
            cover: Array2::zeros(shape),
        }
    }

    /// Accumulate one ring with the given sign (+1 adds area, -1 removes).
    ///
    /// The ring is treated as implicitly closed; the sign must already
    /// account for the ring's winding direction.
    pub fn add_ring(&mut self, coords: &[Coord<f64>], sign: f64) {
        if coords.len() < 3 {
            return;
        }

        for i in 0..coords.len() {
            let p = coords[i];
            let q = coords[(i + 1) % coords.len()];
            self.add_edge(p.x, p.y, q.x, q.y, sign);
        }
    }

    fn add_edge(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, sign: f64) {
        if y0 == y1 {
            // Horizontal edges carry no x dy contribution
            return;
        }

        // Upward edges count positive; the caller's sign composes on top.
        let s = if y1 > y0 { sign } else { -sign };

        let (ya, xa, yb, xb) = if y1 > y0 {
            (y0, x0, y1, x1)
        } else {
            (y1, x1, y0, x0)
        };

        let ext = self.grid.extent();
        let ylo = ya.max(ext.ymin);
        let yhi = yb.min(ext.ymax);
        if yhi <= ylo {
            return;
        }

        let slope = (xb - xa) / (yb - ya);
        let x_at = |y: f64| xa + (y - ya) * slope;

        let rows = self.grid.rows() as i64;
        let dy = self.grid.dy();
        let r_first = (((ext.ymax - yhi) / dy).floor() as i64).clamp(0, rows - 1);
        let r_last = (((ext.ymax - ylo) / dy).floor() as i64).clamp(0, rows - 1);

        for r in r_first..=r_last {
            let band_top = ext.ymax - r as f64 * dy;
            let band_bot = band_top - dy;

            let sy0 = ylo.max(band_bot);
            let sy1 = yhi.min(band_top);
            if sy1 <= sy0 {
                continue;
            }

            self.add_band_segment(r as usize, sy0, x_at(sy0), sy1, x_at(sy1), s);
        }
    }

    /// One segment within a single row band, `y0 < y1`. Splits at the
    /// window's x borders so every remaining piece is linear after
    /// clamping; parts beyond a border collapse onto it, which preserves
    /// per-cell areas (a crossing right of the window covers full cells, a
    /// crossing left of it covers none).
    fn add_band_segment(&mut self, row: usize, y0: f64, x0: f64, y1: f64, x1: f64, s: f64) {
        let ext = self.grid.extent();

        if x0 == x1 {
            let x = x0.clamp(ext.xmin, ext.xmax);
            self.add_piece(row, y0, x, y1, x, s);
            return;
        }

        let mut ts = [0.0, 1.0, 0.0, 1.0];
        let mut n = 2;
        for border in [ext.xmin, ext.xmax] {
            let t = (border - x0) / (x1 - x0);
            if t > 0.0 && t < 1.0 {
                ts[n] = t;
                n += 1;
            }
        }
        let ts = &mut ts[..n];
        ts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        for w in ts.windows(2) {
            let (ta, tb) = (w[0], w[1]);
            if tb <= ta {
                continue;
            }

            let ya = y0 + ta * (y1 - y0);
            let yb = y0 + tb * (y1 - y0);
            let xa = (x0 + ta * (x1 - x0)).clamp(ext.xmin, ext.xmax);
            let xb = (x0 + tb * (x1 - x0)).clamp(ext.xmin, ext.xmax);

            self.add_piece(row, ya, xa, yb, xb, s);
        }
    }

    /// One in-window piece; walks the columns its x range crosses
    fn add_piece(&mut self, row: usize, ya: f64, xa: f64, yb: f64, xb: f64, s: f64) {
        let ext = self.grid.extent();
        let dx = self.grid.dx();
        let cols = self.grid.cols() as i64;

        let col_of = |x: f64| (((x - ext.xmin) / dx).floor() as i64).clamp(0, cols - 1) as usize;

        let ca = col_of(xa);
        let cb = col_of(xb);

        if ca == cb {
            self.emit(row, ca, ya, xa, yb, xb, s);
            return;
        }

        let mut y_prev = ya;
        let mut x_prev = xa;

        if xb > xa {
            for c in ca..cb {
                let xbnd = ext.xmin + (c as f64 + 1.0) * dx;
                let t = (xbnd - xa) / (xb - xa);
                let ybnd = ya + t * (yb - ya);
                self.emit(row, c, y_prev, x_prev, ybnd, xbnd, s);
                y_prev = ybnd;
                x_prev = xbnd;
            }
        } else {
            for c in ((cb + 1)..=ca).rev() {
                let xbnd = ext.xmin + c as f64 * dx;
                let t = (xbnd - xa) / (xb - xa);
                let ybnd = ya + t * (yb - ya);
                self.emit(row, c, y_prev, x_prev, ybnd, xbnd, s);
                y_prev = ybnd;
                x_prev = xbnd;
            }
        }

        self.emit(row, cb, y_prev, x_prev, yb, xb, s);
    }

    fn emit(&mut self, row: usize, col: usize, ya: f64, xa: f64, yb: f64, xb: f64, s: f64) {
        let h = yb - ya;
        if h <= 0.0 {
            return;
        }

        let cell_left = self.grid.extent().xmin + col as f64 * self.grid.dx();
        let xbar = 0.5 * (xa + xb);

        self.area[[row, col]] += s * h * (xbar - cell_left);
        self.cover[[row, col]] += s * h;
    }

    /// Resolve cover terms and return the signed area per cell
    pub fn into_areas(mut self) -> Array2<f64> {
        let dx = self.grid.dx();

        for r in 0..self.grid.rows() {
            let mut acc = 0.0;
            for c in (0..self.grid.cols()).rev() {
                let resolved = self.area[[r, c]] + dx * acc;
                acc += self.cover[[r, c]];
                self.area[[r, c]] = resolved;
            }
        }

        self.area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ring(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    fn window() -> Grid {
        Grid::new(0.0, 0.0, 3.0, 3.0, 1.0, 1.0).unwrap()
    }

    #[test]
    fn test_full_cell_square() {
        let mut acc = AreaAccumulator::new(window());
        // CCW unit square over cell (1, 1)
        acc.add_ring(
            &ring(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)]),
            1.0,
        );

        let areas = acc.into_areas();
        for r in 0..3 {
            for c in 0..3 {
                let expected = if (r, c) == (1, 1) { 1.0 } else { 0.0 };
                assert_relative_eq!(areas[[r, c]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_offset_square_fractions() {
        let mut acc = AreaAccumulator::new(window());
        // 2x2 square centered on the grid: quarter corners, half edges
        acc.add_ring(
            &ring(&[(0.5, 0.5), (2.5, 0.5), (2.5, 2.5), (0.5, 2.5), (0.5, 0.5)]),
            1.0,
        );

        let areas = acc.into_areas();
        assert_relative_eq!(areas[[0, 0]], 0.25, epsilon = 1e-12);
        assert_relative_eq!(areas[[0, 1]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(areas[[0, 2]], 0.25, epsilon = 1e-12);
        assert_relative_eq!(areas[[1, 0]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(areas[[1, 1]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(areas[[2, 2]], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_clockwise_ring_is_negative() {
        let mut acc = AreaAccumulator::new(window());
        acc.add_ring(
            &ring(&[(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0), (1.0, 1.0)]),
            1.0,
        );

        let areas = acc.into_areas();
        assert_relative_eq!(areas[[1, 1]], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_triangle_area_sums() {
        let mut acc = AreaAccumulator::new(window());
        acc.add_ring(&ring(&[(0.0, 0.0), (3.0, 0.0), (0.0, 3.0), (0.0, 0.0)]), 1.0);

        let areas = acc.into_areas();
        let total: f64 = areas.iter().sum();
        assert_relative_eq!(total, 4.5, epsilon = 1e-12);

        // Diagonal cells are half covered
        assert_relative_eq!(areas[[0, 0]], 0.5, epsilon = 1e-12);
        assert_relative_eq!(areas[[2, 2]], 0.5, epsilon = 1e-12);
        // Lower-left corner is fully inside
        assert_relative_eq!(areas[[2, 0]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_polygon_larger_than_window() {
        let mut acc = AreaAccumulator::new(window());
        acc.add_ring(
            &ring(&[
                (-10.0, -10.0),
                (10.0, -10.0),
                (10.0, 10.0),
                (-10.0, 10.0),
                (-10.0, -10.0),
            ]),
            1.0,
        );

        let areas = acc.into_areas();
        for v in areas.iter() {
            assert_relative_eq!(*v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unclosed_ring_is_closed_implicitly() {
        let mut acc = AreaAccumulator::new(window());
        acc.add_ring(&ring(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0)]), 1.0);

        let areas = acc.into_areas();
        assert_relative_eq!(areas[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_ring_is_ignored() {
        let mut acc = AreaAccumulator::new(window());
        acc.add_ring(&ring(&[(1.0, 1.0), (2.0, 2.0)]), 1.0);

        let areas = acc.into_areas();
        assert!(areas.iter().all(|v| *v == 0.0));
    }
}
