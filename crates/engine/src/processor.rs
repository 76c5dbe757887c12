//! Sequential per-feature processing

use crate::coverage::coverage_fraction;
use crate::operation::Operation;
use crate::output::OutputWriter;
use crate::registry::StatsRegistry;
use tracing::{debug, warn};
use zonalite_core::{Bounds, Error, Feature, FeatureSource, FieldType, FieldValue, Result};

const DEFAULT_MAX_CELLS_IN_MEMORY: usize = 1_000_000;

/// Applies a set of operations to every feature of a source and writes one
/// result feature per input feature.
///
/// Each feature runs through a straight-line pipeline: coverage windows are
/// computed per operation grid, fed into the registry's accumulators, and
/// the results emitted before the feature's accumulators are flushed.
/// Windows larger than the `max_cells_in_memory` budget are evaluated in
/// horizontal stripes, which the additive accumulator contract makes exact.
pub struct FeatureSequentialProcessor {
    operations: Vec<Operation>,
    registry: StatsRegistry,
    include_cols: Vec<String>,
    include_geometry: bool,
    unnest: bool,
    skip_invalid: bool,
    max_cells_in_memory: usize,
    skipped: Vec<(u64, String)>,
}

impl Default for FeatureSequentialProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureSequentialProcessor {
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
            registry: StatsRegistry::new(),
            include_cols: Vec::new(),
            include_geometry: false,
            unnest: false,
            skip_invalid: false,
            max_cells_in_memory: DEFAULT_MAX_CELLS_IN_MEMORY,
            skipped: Vec::new(),
        }
    }

    pub fn add_operation(&mut self, op: Operation) {
        self.operations.push(op);
    }

    pub fn add_operations(&mut self, ops: impl IntoIterator<Item = Operation>) {
        self.operations.extend(ops);
    }

    /// Copy a column from the input features into the output
    pub fn include_col(&mut self, name: impl Into<String>) {
        self.include_cols.push(name.into());
    }

    /// Carry input geometries into the output
    pub fn include_geometry(&mut self) {
        self.include_geometry = true;
    }

    /// Cap the number of cells a single coverage window may hold
    pub fn set_max_cells_in_memory(&mut self, n: usize) {
        self.max_cells_in_memory = n.max(1);
    }

    /// Split features with equal-length array outputs into one feature per
    /// array index
    pub fn set_unnest(&mut self, unnest: bool) {
        self.unnest = unnest;
    }

    /// Record geometry errors and continue with the next feature instead of
    /// aborting the run
    pub fn set_skip_invalid(&mut self, skip: bool) {
        self.skip_invalid = skip;
    }

    /// Features skipped due to geometry errors, with the recorded message
    pub fn skipped(&self) -> &[(u64, String)] {
        &self.skipped
    }

    /// Process every feature of `source`, writing results to `writer`
    pub fn process(
        &mut self,
        source: &mut dyn FeatureSource,
        writer: &mut dyn OutputWriter,
    ) -> Result<()> {
        for col in &self.include_cols {
            writer.add_column(col);
        }
        if self.include_geometry {
            writer.add_geometry();
        }
        for op in &self.operations {
            writer.add_operation(op);
        }

        debug!(operations = self.operations.len(), "processing features");

        let mut feature_id: u64 = 0;
        let mut features = source.features();
        while let Some(feature) = features.next() {
            let f_in = feature?;

            match self.accumulate_feature(feature_id, &f_in) {
                Ok(()) => self.write_result(feature_id, &f_in, writer)?,
                Err(Error::InvalidGeometry(message)) if self.skip_invalid => {
                    warn!(feature = feature_id, %message, "skipping invalid feature");
                    self.skipped.push((feature_id, message));
                }
                Err(e) => return Err(e),
            }

            self.registry.flush_feature(feature_id);
            feature_id += 1;
        }
        drop(features);

        writer.finish()
    }

    /// Feed every operation's coverage and raster windows for one feature
    /// into the registry
    fn accumulate_feature(&mut self, feature_id: u64, f_in: &Feature) -> Result<()> {
        let Some(geom) = f_in.geometry() else {
            // Featureless geometry still emits empty-accumulator defaults
            return Ok(());
        };

        let bounds = Bounds::from_geometry(geom)
            .ok_or_else(|| Error::InvalidGeometry("empty geometry".into()))?;

        for op in &self.operations {
            let window = op.grid().shrink_to_fit(&bounds);
            if window.is_empty() {
                continue;
            }

            for stripe in window.stripes(self.max_cells_in_memory) {
                let coverage = coverage_fraction(geom, &stripe)?;
                if coverage.is_empty() {
                    continue;
                }

                let read_bounds = coverage.grid().extent();
                let values = op.values().read_window(&read_bounds)?;
                if values.is_empty() {
                    continue;
                }

                let weights = match op.weights() {
                    Some(w) => Some(w.read_window(&read_bounds)?.to_f64()),
                    None => None,
                };

                self.registry
                    .update_stats(feature_id, op, &coverage, &values, weights.as_ref())?;
            }
        }

        Ok(())
    }

    fn write_result(
        &self,
        feature_id: u64,
        f_in: &Feature,
        writer: &mut dyn OutputWriter,
    ) -> Result<()> {
        if self.unnest {
            return self.write_result_unnested(feature_id, f_in, writer);
        }

        let mut f_out = writer.create_feature();
        self.copy_passthrough(f_in, &mut f_out)?;
        for op in &self.operations {
            op.set_result(&self.registry, feature_id, &mut f_out)?;
        }

        writer.write(f_out)
    }

    /// Emit one feature per array index, repeating scalar fields. All
    /// array outputs longer than one element must agree on their length.
    fn write_result_unnested(
        &self,
        feature_id: u64,
        f_in: &Feature,
        writer: &mut dyn OutputWriter,
    ) -> Result<()> {
        let mut temp = Feature::empty();
        for op in &self.operations {
            op.set_result(&self.registry, feature_id, &mut temp)?;
        }

        let mut n = 1usize;
        for (_, value) in temp.fields() {
            if is_array(value) && value.len() != 1 {
                if n == 1 {
                    n = value.len();
                } else if n != value.len() {
                    return Err(Error::InconsistentArrayLengths);
                }
            }
        }

        for i in 0..n {
            let mut f_out = writer.create_feature();
            self.copy_passthrough(f_in, &mut f_out)?;

            for (name, value) in temp.fields() {
                let element = if is_array(value) && value.len() != 1 {
                    value.element(i)
                } else {
                    value.element(0)
                };
                if let Some(v) = element {
                    f_out.set(name.as_str(), v);
                }
            }

            writer.write(f_out)?;
        }

        Ok(())
    }

    fn copy_passthrough(&self, f_in: &Feature, f_out: &mut Feature) -> Result<()> {
        if self.include_geometry {
            f_out.set_geometry(f_in.geometry().cloned());
        }

        for col in &self.include_cols {
            let value = f_in
                .get(col)
                .cloned()
                .ok_or_else(|| Error::MissingField(col.clone()))?;
            f_out.set(col.as_str(), value);
        }

        Ok(())
    }
}

fn is_array(value: &FieldValue) -> bool {
    matches!(
        value.field_type(),
        FieldType::IntArray | FieldType::Int64Array | FieldType::DoubleArray
    )
}
