//! Coverage-weighted statistics accumulators
//!
//! `RasterStats<T>` ingests `(coverage, value[, weight])` cell triples and
//! exposes the derived statistic catalog. Ingestion is additive: feeding
//! the same cells through one `process` call or any partition of calls
//! yields identical results up to floating-point rounding, which is what
//! allows large windows to be streamed in stripes.

mod variant;

pub use variant::RasterStatsVariant;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use zonalite_core::{Error, Grid, Raster, RasterElement, Result};

/// Neumaier-compensated summation.
///
/// Coverage fractions are f32 and may be accumulated over millions of
/// cells; compensation keeps the running sums stable.
#[derive(Debug, Clone, Copy, Default)]
struct CompensatedSum {
    sum: f64,
    correction: f64,
}

impl CompensatedSum {
    fn add(&mut self, v: f64) {
        let t = self.sum + v;
        if self.sum.abs() >= v.abs() {
            self.correction += (self.sum - t) + v;
        } else {
            self.correction += (v - t) + self.sum;
        }
        self.sum = t;
    }

    fn value(&self) -> f64 {
        self.sum + self.correction
    }
}

/// Total-ordering wrapper for frequency-table keys.
///
/// NaN values are filtered out as no-data before insertion, so the
/// underlying partial order is total in practice.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FreqKey<T: RasterElement>(T);

impl<T: RasterElement> Eq for FreqKey<T> {}

impl<T: RasterElement> PartialOrd for FreqKey<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: RasterElement> Ord for FreqKey<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Per-cell storage for stats that need the raw observations
#[derive(Debug, Clone)]
struct CellStorage<T> {
    coverage: Vec<f64>,
    values: Vec<T>,
    weights: Vec<f64>,
    center_x: Vec<f64>,
    center_y: Vec<f64>,
}

impl<T> Default for CellStorage<T> {
    fn default() -> Self {
        Self {
            coverage: Vec::new(),
            values: Vec::new(),
            weights: Vec::new(),
            center_x: Vec::new(),
            center_y: Vec::new(),
        }
    }
}

/// Online accumulator of coverage-weighted statistics for pixel type `T`.
#[derive(Debug, Clone)]
pub struct RasterStats<T: RasterElement> {
    count_weight: CompensatedSum,
    sum_wv: CompensatedSum,
    sum_wv2: CompensatedSum,

    // Weighted variants: coverage times external weight
    sum_w: CompensatedSum,
    sum_ww: CompensatedSum,
    sum_wwv: CompensatedSum,
    sum_wwv2: CompensatedSum,

    min_val: Option<T>,
    max_val: Option<T>,

    freq: BTreeMap<FreqKey<T>, f64>,
    weighted_freq: BTreeMap<FreqKey<T>, f64>,

    storage: Option<CellStorage<T>>,

    any_defined: bool,
    any_weighted_defined: bool,
}

impl<T: RasterElement> Default for RasterStats<T> {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<T: RasterElement> RasterStats<T> {
    /// Create an empty accumulator. `store_values` enables the per-cell
    /// storage needed by quantile, median and the array-returning stats;
    /// runs without those stats incur no storage allocation.
    pub fn new(store_values: bool) -> Self {
        Self {
            count_weight: CompensatedSum::default(),
            sum_wv: CompensatedSum::default(),
            sum_wv2: CompensatedSum::default(),
            sum_w: CompensatedSum::default(),
            sum_ww: CompensatedSum::default(),
            sum_wwv: CompensatedSum::default(),
            sum_wwv2: CompensatedSum::default(),
            min_val: None,
            max_val: None,
            freq: BTreeMap::new(),
            weighted_freq: BTreeMap::new(),
            storage: store_values.then(CellStorage::default),
            any_defined: false,
            any_weighted_defined: false,
        }
    }

    /// Ingest a coverage window and the matching values window.
    ///
    /// Cells are taken from the intersection of the two windows. Cells
    /// with zero coverage or a no-data value are skipped.
    pub fn process(&mut self, coverage: &Raster<f32>, values: &Raster<T>) -> Result<()> {
        self.process_cells(coverage, values, None)
    }

    /// Ingest a coverage window with values and external weights.
    ///
    /// A cell whose weight is no-data still counts toward the unweighted
    /// statistics but is excluded from the weighted sums.
    pub fn process_weighted(
        &mut self,
        coverage: &Raster<f32>,
        values: &Raster<T>,
        weights: &Raster<f64>,
    ) -> Result<()> {
        self.process_cells(coverage, values, Some(weights))
    }

    fn process_cells(
        &mut self,
        coverage: &Raster<f32>,
        values: &Raster<T>,
        weights: Option<&Raster<f64>>,
    ) -> Result<()> {
        let ix = coverage.grid().intersection(values.grid())?;
        if ix.is_empty() {
            return Ok(());
        }

        let (cov_r0, cov_c0) = coverage.grid().offsets_of(&ix)?;
        let (val_r0, val_c0) = values.grid().offsets_of(&ix)?;
        let weight_offsets = match weights {
            Some(w) => Some(signed_offsets(w.grid(), &ix)?),
            None => None,
        };

        for r in 0..ix.rows() {
            for c in 0..ix.cols() {
                let f = coverage.get(cov_r0 + r, cov_c0 + c)? as f64;
                if f <= 0.0 {
                    continue;
                }

                let Some(v) = values.value(val_r0 + r, val_c0 + c) else {
                    continue;
                };
                let vf = v.to_f64();

                self.any_defined = true;
                self.count_weight.add(f);
                self.sum_wv.add(f * vf);
                self.sum_wv2.add(f * vf * vf);

                if self.min_val.is_none() || Some(v) < self.min_val {
                    self.min_val = Some(v);
                }
                if self.max_val.is_none() || Some(v) > self.max_val {
                    self.max_val = Some(v);
                }

                *self.freq.entry(FreqKey(v)).or_insert(0.0) += f;

                let mut stored_weight = 1.0;
                if let Some(w) = weights {
                    stored_weight = f64::NAN;
                    if let Some((wr0, wc0)) = weight_offsets {
                        let wr = wr0 + r as i64;
                        let wc = wc0 + c as i64;
                        if wr >= 0 && wc >= 0 {
                            if let Some(wv) = w.value(wr as usize, wc as usize) {
                                self.any_weighted_defined = true;
                                self.sum_w.add(f);
                                self.sum_ww.add(f * wv);
                                self.sum_wwv.add(f * wv * vf);
                                self.sum_wwv2.add(f * wv * vf * vf);
                                *self.weighted_freq.entry(FreqKey(v)).or_insert(0.0) += f * wv;
                                stored_weight = wv;
                            }
                        }
                    }
                }

                if let Some(storage) = &mut self.storage {
                    storage.coverage.push(f);
                    storage.values.push(v);
                    storage.weights.push(stored_weight);
                    storage.center_x.push(ix.x_for_col(c));
                    storage.center_y.push(ix.y_for_row(r));
                }
            }
        }

        Ok(())
    }

    /// Whether any cell with a defined value has been ingested
    pub fn is_empty(&self) -> bool {
        !self.any_defined
    }

    /// Sum of coverage fractions of included cells
    pub fn count(&self) -> f64 {
        self.count_weight.value()
    }

    /// Coverage-weighted sum of values
    pub fn sum(&self) -> f64 {
        self.sum_wv.value()
    }

    /// Coverage-weighted mean; NaN for an empty accumulator
    pub fn mean(&self) -> f64 {
        self.sum() / self.count()
    }

    /// Minimum included value
    pub fn min(&self) -> Option<T> {
        self.min_val
    }

    /// Maximum included value
    pub fn max(&self) -> Option<T> {
        self.max_val
    }

    /// Population variance; NaN for an empty accumulator
    pub fn variance(&self) -> f64 {
        if !self.any_defined {
            return f64::NAN;
        }

        let cw = self.count();
        let mean = self.mean();
        (self.sum_wv2.value() / cw - mean * mean).max(0.0)
    }

    /// Population standard deviation; NaN for an empty accumulator
    pub fn stdev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Standard deviation over mean; NaN for an empty accumulator
    pub fn coefficient_of_variation(&self) -> f64 {
        self.stdev() / self.mean()
    }

    /// Sum of values weighted by coverage and external weight
    pub fn weighted_sum(&self) -> f64 {
        self.sum_wwv.value()
    }

    /// Weighted mean; NaN when no cell had a defined weight
    pub fn weighted_mean(&self) -> f64 {
        self.weighted_sum() / self.sum_ww.value()
    }

    /// Weighted population variance; NaN when no cell had a defined weight
    pub fn weighted_variance(&self) -> f64 {
        if !self.any_weighted_defined {
            return f64::NAN;
        }

        let ww = self.sum_ww.value();
        let mean = self.weighted_mean();
        (self.sum_wwv2.value() / ww - mean * mean).max(0.0)
    }

    /// Weighted population standard deviation
    pub fn weighted_stdev(&self) -> f64 {
        self.weighted_variance().sqrt()
    }

    /// The most frequent value by coverage; ties break to the largest value
    pub fn mode(&self) -> Option<T> {
        let mut best: Option<(T, f64)> = None;
        for (k, &count) in &self.freq {
            match best {
                Some((_, c)) if count < c => {}
                _ => best = Some((k.0, count)),
            }
        }
        best.map(|(v, _)| v)
    }

    /// The least frequent value by coverage; ties break to the smallest value
    pub fn minority(&self) -> Option<T> {
        let mut best: Option<(T, f64)> = None;
        for (k, &count) in &self.freq {
            match best {
                Some((_, c)) if count >= c => {}
                _ => best = Some((k.0, count)),
            }
        }
        best.map(|(v, _)| v)
    }

    /// Number of distinct included values
    pub fn variety(&self) -> usize {
        self.freq.len()
    }

    /// Fraction of the covered area occupied by `value`
    pub fn frac(&self, value: T) -> f64 {
        self.freq
            .get(&FreqKey(value))
            .map(|f| f / self.count())
            .unwrap_or(0.0)
    }

    /// Weighted fraction of the covered area occupied by `value`
    pub fn weighted_frac(&self, value: T) -> f64 {
        self.weighted_freq
            .get(&FreqKey(value))
            .map(|f| f / self.sum_ww.value())
            .unwrap_or(0.0)
    }

    /// Distinct included values, ascending
    pub fn observed_values(&self) -> impl Iterator<Item = T> + '_ {
        self.freq.keys().map(|k| k.0)
    }

    /// Coverage-weighted quantile with linear interpolation.
    ///
    /// Sorted samples are placed at cumulative-midpoint positions
    /// normalized to [0, 1]; for unit coverage this reduces to the usual
    /// `q * (n - 1)` fractional indexing. `quantile(0)` is the minimum and
    /// `quantile(1)` the maximum for any coverage.
    pub fn quantile(&self, q: f64) -> Result<Option<f64>> {
        if !(0.0..=1.0).contains(&q) {
            return Err(Error::InvalidParameter {
                name: "q",
                value: q.to_string(),
                reason: "quantile must be in [0, 1]".into(),
            });
        }

        let storage = self.storage.as_ref().ok_or_else(|| {
            Error::Other("quantile requires an accumulator with stored values".into())
        })?;

        let n = storage.values.len();
        if n == 0 {
            return Ok(None);
        }
        if n == 1 {
            return Ok(Some(storage.values[0].to_f64()));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            storage.values[a]
                .partial_cmp(&storage.values[b])
                .unwrap_or(Ordering::Equal)
        });

        let mut positions = Vec::with_capacity(n);
        let mut cum = 0.0;
        for &i in &order {
            let w = storage.coverage[i];
            positions.push(cum + 0.5 * w);
            cum += w;
        }

        let lo = positions[0];
        let hi = positions[n - 1];
        if hi <= lo {
            return Ok(Some(storage.values[order[0]].to_f64()));
        }

        let target = lo + q * (hi - lo);
        let j = positions.partition_point(|&p| p < target);
        if j == 0 {
            return Ok(Some(storage.values[order[0]].to_f64()));
        }
        if j >= n {
            return Ok(Some(storage.values[order[n - 1]].to_f64()));
        }

        let (p0, p1) = (positions[j - 1], positions[j]);
        let (v0, v1) = (
            storage.values[order[j - 1]].to_f64(),
            storage.values[order[j]].to_f64(),
        );
        let t = (target - p0) / (p1 - p0);
        Ok(Some(v0 + t * (v1 - v0)))
    }

    /// Coverage-weighted median
    pub fn median(&self) -> Result<Option<f64>> {
        self.quantile(0.5)
    }

    /// Stored coverage fractions; empty unless the accumulator stores cells
    pub fn cell_coverage(&self) -> &[f64] {
        self.storage.as_ref().map_or(&[], |s| &s.coverage)
    }

    /// Stored cell values; empty unless the accumulator stores cells
    pub fn cell_values(&self) -> &[T] {
        self.storage.as_ref().map_or(&[], |s| &s.values)
    }

    /// Stored cell weights (NaN where the weight was no-data, 1.0 for
    /// unweighted ingestion); empty unless the accumulator stores cells
    pub fn cell_weights(&self) -> &[f64] {
        self.storage.as_ref().map_or(&[], |s| &s.weights)
    }

    /// Stored cell center x coordinates
    pub fn cell_center_x(&self) -> &[f64] {
        self.storage.as_ref().map_or(&[], |s| &s.center_x)
    }

    /// Stored cell center y coordinates
    pub fn cell_center_y(&self) -> &[f64] {
        self.storage.as_ref().map_or(&[], |s| &s.center_y)
    }
}

/// Row/col offsets of `sub`'s origin within `grid`, allowed to be negative
/// or extend past the grid (cells outside simply have no value there)
fn signed_offsets(grid: &Grid, sub: &Grid) -> Result<(i64, i64)> {
    if !grid.compatible_with(sub) {
        return Err(Error::GridMismatch(
            "weight raster is not aligned with the processing window".into(),
        ));
    }

    let row_off = ((grid.extent().ymax - sub.extent().ymax) / grid.dy()).round() as i64;
    let col_off = ((sub.extent().xmin - grid.extent().xmin) / grid.dx()).round() as i64;
    Ok((row_off, col_off))
}
