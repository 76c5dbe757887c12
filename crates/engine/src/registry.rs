//! Per-feature accumulator registry

use crate::operation::Operation;
use crate::stats::RasterStatsVariant;
use std::collections::HashMap;
use zonalite_core::{Raster, RasterVariant, Result};

/// Holds the accumulators for every `(feature, operation)` pair in flight.
///
/// Features are identified by a stable index assigned at ingestion, and
/// operations by their [`key`](Operation::key). Entries are created lazily
/// on the first window a feature receives and removed by
/// [`flush_feature`](StatsRegistry::flush_feature) once the feature's
/// results have been emitted.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    feature_stats: HashMap<u64, HashMap<String, RasterStatsVariant>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the accumulator for `(feature_id, op)` and feed it
    /// one coverage/values window pair, with optional weights.
    ///
    /// The accumulator's pixel type is taken from the values window on
    /// first creation.
    pub fn update_stats(
        &mut self,
        feature_id: u64,
        op: &Operation,
        coverage: &Raster<f32>,
        values: &RasterVariant,
        weights: Option<&Raster<f64>>,
    ) -> Result<()> {
        let store_values = op.requires_stored_values();
        let stats = self
            .feature_stats
            .entry(feature_id)
            .or_default()
            .entry(op.key().to_string())
            .or_insert_with(|| RasterStatsVariant::new_empty(values.pixel_type(), store_values));

        match weights {
            Some(w) => stats.process_weighted(coverage, values, w),
            None => stats.process(coverage, values),
        }
    }

    /// The accumulator for `(feature_id, key)`, if one was created
    pub fn get(&self, feature_id: u64, key: &str) -> Option<&RasterStatsVariant> {
        self.feature_stats.get(&feature_id)?.get(key)
    }

    /// Whether an accumulator exists for `(feature_id, op)`; never creates
    pub fn contains(&self, feature_id: u64, op: &Operation) -> bool {
        self.get(feature_id, op.key()).is_some()
    }

    /// Drop all accumulators belonging to a feature
    pub fn flush_feature(&mut self, feature_id: u64) {
        self.feature_stats.remove(&feature_id);
    }
}
