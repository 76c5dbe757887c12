//! Operations: a stat applied to a value raster and optional weight raster

use crate::descriptor::{parse_stat_descriptor, StatDescriptor};
use crate::registry::StatsRegistry;
use crate::stats::RasterStatsVariant;
use crate::with_stats;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use zonalite_core::{
    with_raster, Error, Feature, FieldValue, Grid, RasterElement, RasterSource, Result,
};

/// The stat catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Stdev,
    Variance,
    CoefficientOfVariation,
    WeightedSum,
    WeightedMean,
    WeightedStdev,
    WeightedVariance,
    /// `mode` and its alias `majority`
    Mode,
    Minority,
    Variety,
    Frac,
    WeightedFrac,
    Quantile,
    Median,
    Coverage,
    Values,
    Weights,
    CenterX,
    CenterY,
    CellId,
}

impl Stat {
    /// Parse a stat identifier; unknown names are rejected before any
    /// feature is processed
    pub fn parse(name: &str) -> Result<Stat> {
        Ok(match name {
            "count" => Stat::Count,
            "sum" => Stat::Sum,
            "mean" => Stat::Mean,
            "min" => Stat::Min,
            "max" => Stat::Max,
            "stdev" => Stat::Stdev,
            "variance" => Stat::Variance,
            "coefficient_of_variation" => Stat::CoefficientOfVariation,
            "weighted_sum" => Stat::WeightedSum,
            "weighted_mean" => Stat::WeightedMean,
            "weighted_stdev" => Stat::WeightedStdev,
            "weighted_variance" => Stat::WeightedVariance,
            "mode" | "majority" => Stat::Mode,
            "minority" => Stat::Minority,
            "variety" => Stat::Variety,
            "frac" => Stat::Frac,
            "weighted_frac" => Stat::WeightedFrac,
            "quantile" => Stat::Quantile,
            "median" => Stat::Median,
            "coverage" => Stat::Coverage,
            "values" => Stat::Values,
            "weights" => Stat::Weights,
            "center_x" => Stat::CenterX,
            "center_y" => Stat::CenterY,
            "cell_id" => Stat::CellId,
            _ => return Err(Error::UnknownStat(name.to_string())),
        })
    }

    /// Whether accumulators for this stat must keep per-cell storage
    pub fn requires_stored_values(&self) -> bool {
        matches!(
            self,
            Stat::Quantile
                | Stat::Median
                | Stat::Coverage
                | Stat::Values
                | Stat::Weights
                | Stat::CenterX
                | Stat::CenterY
                | Stat::CellId
        )
    }

    /// Whether this stat needs a weight raster
    pub fn requires_weights(&self) -> bool {
        matches!(
            self,
            Stat::WeightedSum
                | Stat::WeightedMean
                | Stat::WeightedStdev
                | Stat::WeightedVariance
                | Stat::WeightedFrac
                | Stat::Weights
        )
    }
}

/// An instantiated stat: the stat, its output field name(s), the rasters it
/// reads, and its frozen keyword arguments.
#[derive(Clone)]
pub struct Operation {
    stat: Stat,
    /// The stat identifier as the user wrote it (aliases preserved)
    stat_name: String,
    /// Base output field name
    name: String,
    values: Arc<dyn RasterSource>,
    weights: Option<Arc<dyn RasterSource>>,
    args: BTreeMap<String, String>,
    quantiles: Vec<f64>,
    field_names: Vec<String>,
    key: String,
}

impl Operation {
    pub fn new(
        stat_name: &str,
        name: String,
        values: Arc<dyn RasterSource>,
        weights: Option<Arc<dyn RasterSource>>,
        args: BTreeMap<String, String>,
    ) -> Result<Operation> {
        let stat = Stat::parse(stat_name)?;

        if (stat.requires_weights() || stat_name.starts_with("weighted")) && weights.is_none() {
            return Err(Error::MissingWeights(stat_name.to_string()));
        }

        let quantiles = parse_stat_args(stat, stat_name, &args)?;

        let field_names = if stat == Stat::Quantile {
            quantiles.iter().map(|q| quantile_field_name(*q)).collect()
        } else {
            vec![name.clone()]
        };

        let mut key = format!("{stat_name}|{}", values.name());
        if let Some(w) = &weights {
            key.push('|');
            key.push_str(w.name());
        }
        for (k, v) in &args {
            key.push('|');
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }

        Ok(Operation {
            stat,
            stat_name: stat_name.to_string(),
            name,
            values,
            weights,
            args,
            quantiles,
            field_names,
            key,
        })
    }

    pub fn stat(&self) -> Stat {
        self.stat
    }

    /// Base output field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All field names this operation assigns.
    ///
    /// `frac` and `weighted_frac` generate one field per observed value and
    /// are not covered here.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn values(&self) -> &Arc<dyn RasterSource> {
        &self.values
    }

    pub fn weights(&self) -> Option<&Arc<dyn RasterSource>> {
        self.weights.as_ref()
    }

    pub fn weighted(&self) -> bool {
        self.weights.is_some()
    }

    /// Grid over which this operation evaluates coverage
    pub fn grid(&self) -> &Grid {
        self.values.grid()
    }

    pub fn requires_stored_values(&self) -> bool {
        self.stat.requires_stored_values()
    }

    /// Registry key identifying this operation's accumulator:
    /// `(stat, values, weights, args)`
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value substituted for missing min/max/mode/minority/median/quantile
    /// results: the values raster's no-data sentinel if set, NaN otherwise
    fn missing_value(&self) -> FieldValue {
        with_raster!(&self.values.read_empty(), r => r.nodata().map(RasterElement::field_value))
            .unwrap_or(FieldValue::Double(f64::NAN))
    }

    /// Look up this operation's accumulator for `feature_id` and write the
    /// result field(s) into `f_out`.
    ///
    /// Features that never touched the raster use an empty accumulator of
    /// the correct pixel type, so they still emit defined defaults.
    pub fn set_result(
        &self,
        registry: &StatsRegistry,
        feature_id: u64,
        f_out: &mut Feature,
    ) -> Result<()> {
        let empty;
        let stats = match registry.get(feature_id, self.key()) {
            Some(s) => s,
            None => {
                empty = RasterStatsVariant::new_empty(
                    self.values.pixel_type(),
                    self.requires_stored_values(),
                );
                &empty
            }
        };

        self.set_result_from(stats, f_out)
    }

    fn set_result_from(&self, stats: &RasterStatsVariant, f_out: &mut Feature) -> Result<()> {
        let field = self.field_names[0].as_str();

        match self.stat {
            Stat::Count => with_stats!(stats, s => f_out.set(field, s.count())),
            Stat::Sum => with_stats!(stats, s => f_out.set(field, s.sum())),
            Stat::Mean => with_stats!(stats, s => f_out.set(field, s.mean())),
            Stat::Stdev => with_stats!(stats, s => f_out.set(field, s.stdev())),
            Stat::Variance => with_stats!(stats, s => f_out.set(field, s.variance())),
            Stat::CoefficientOfVariation => {
                with_stats!(stats, s => f_out.set(field, s.coefficient_of_variation()))
            }
            Stat::WeightedSum => with_stats!(stats, s => f_out.set(field, s.weighted_sum())),
            Stat::WeightedMean => with_stats!(stats, s => f_out.set(field, s.weighted_mean())),
            Stat::WeightedStdev => with_stats!(stats, s => f_out.set(field, s.weighted_stdev())),
            Stat::WeightedVariance => {
                with_stats!(stats, s => f_out.set(field, s.weighted_variance()))
            }
            Stat::Min => with_stats!(stats, s => {
                let value = s
                    .min()
                    .map(RasterElement::field_value)
                    .unwrap_or_else(|| self.missing_value());
                f_out.set(field, value);
            }),
            Stat::Max => with_stats!(stats, s => {
                let value = s
                    .max()
                    .map(RasterElement::field_value)
                    .unwrap_or_else(|| self.missing_value());
                f_out.set(field, value);
            }),
            Stat::Mode => with_stats!(stats, s => {
                let value = s
                    .mode()
                    .map(RasterElement::field_value)
                    .unwrap_or_else(|| self.missing_value());
                f_out.set(field, value);
            }),
            Stat::Minority => with_stats!(stats, s => {
                let value = s
                    .minority()
                    .map(RasterElement::field_value)
                    .unwrap_or_else(|| self.missing_value());
                f_out.set(field, value);
            }),
            Stat::Variety => with_stats!(stats, s => f_out.set(field, s.variety() as i64)),
            Stat::Median => with_stats!(stats, s => {
                match s.median()? {
                    Some(v) => f_out.set(field, v),
                    None => f_out.set(field, self.missing_value()),
                }
            }),
            Stat::Quantile => with_stats!(stats, s => {
                for (i, q) in self.quantiles.iter().enumerate() {
                    match s.quantile(*q)? {
                        Some(v) => f_out.set(self.field_names[i].as_str(), v),
                        None => f_out.set(self.field_names[i].as_str(), self.missing_value()),
                    }
                }
            }),
            Stat::Frac => with_stats!(stats, s => {
                for v in s.observed_values() {
                    f_out.set(format!("frac_{v}"), s.frac(v));
                }
            }),
            Stat::WeightedFrac => with_stats!(stats, s => {
                for v in s.observed_values() {
                    f_out.set(format!("weighted_frac_{v}"), s.weighted_frac(v));
                }
            }),
            Stat::Coverage => {
                with_stats!(stats, s => f_out.set(field, s.cell_coverage().to_vec()))
            }
            Stat::Values => {
                with_stats!(stats, s => f_out.set(field, RasterElement::field_array(s.cell_values())))
            }
            Stat::Weights => {
                with_stats!(stats, s => f_out.set(field, s.cell_weights().to_vec()))
            }
            Stat::CenterX => {
                with_stats!(stats, s => f_out.set(field, s.cell_center_x().to_vec()))
            }
            Stat::CenterY => {
                with_stats!(stats, s => f_out.set(field, s.cell_center_y().to_vec()))
            }
            Stat::CellId => with_stats!(stats, s => {
                let xs = s.cell_center_x();
                let ys = s.cell_center_y();
                let mut ids = Vec::with_capacity(xs.len());
                for (x, y) in xs.iter().zip(ys) {
                    ids.push(self.values.grid().cell_id(*x, *y)?);
                }
                f_out.set(field, ids);
            }),
        }

        Ok(())
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("stat", &self.stat_name)
            .field("name", &self.name)
            .field("values", &self.values.name())
            .field("weights", &self.weights.as_ref().map(|w| w.name().to_string()))
            .field("args", &self.args)
            .finish()
    }
}

/// Validate keyword arguments for a stat and extract quantile positions
fn parse_stat_args(
    stat: Stat,
    stat_name: &str,
    args: &BTreeMap<String, String>,
) -> Result<Vec<f64>> {
    if stat != Stat::Quantile {
        if let Some(key) = args.keys().next() {
            return Err(Error::InvalidDescriptor(format!(
                "Unexpected argument {key} for stat {stat_name}."
            )));
        }
        return Ok(Vec::new());
    }

    let list = args
        .get("q")
        .ok_or_else(|| Error::InvalidDescriptor("Missing q argument for quantile.".into()))?;
    if let Some(key) = args.keys().find(|k| k.as_str() != "q") {
        return Err(Error::InvalidDescriptor(format!(
            "Unexpected argument {key} for stat {stat_name}."
        )));
    }

    let mut quantiles = Vec::new();
    for piece in list.split(',') {
        let q: f64 = piece.trim().parse().map_err(|_| {
            Error::InvalidDescriptor(format!("Invalid quantile value: {piece}."))
        })?;
        if !(0.0..=1.0).contains(&q) {
            return Err(Error::InvalidDescriptor(format!(
                "Quantile {q} is not in [0, 1]."
            )));
        }
        quantiles.push(q);
    }

    Ok(quantiles)
}

fn quantile_field_name(q: f64) -> String {
    format!("q_{}", (100.0 * q).floor() as i32)
}

/// Synthesized field name for implicit operations
fn make_name(
    values: &dyn RasterSource,
    weights: Option<&dyn RasterSource>,
    stat: &str,
    full_names: bool,
) -> Result<String> {
    if !full_names {
        return Ok(stat.to_string());
    }

    if stat.starts_with("weighted") {
        let w = weights.ok_or_else(|| Error::MissingWeights(stat.to_string()))?;
        return Ok(format!("{}_{}_{}", values.name(), w.name(), stat));
    }

    Ok(format!("{}_{}", values.name(), stat))
}

/// Instantiate the operations described by `descriptors` against the given
/// value and weight rasters.
///
/// Descriptors that name no raster pair every value raster with the weight
/// raster of the same index (shorter lists recycle); descriptors that name
/// rasters are resolved against the value set, with weight lookups checking
/// the weight set first.
pub fn prepare_operations(
    descriptors: &[String],
    values: &[Arc<dyn RasterSource>],
    weights: &[Arc<dyn RasterSource>],
) -> Result<Vec<Operation>> {
    let mut ops = Vec::new();

    for descriptor in descriptors {
        let sd = parse_stat_descriptor(descriptor)?;
        if sd.values.is_none() && sd.weights.is_none() {
            prepare_operations_implicit(&mut ops, &sd, values, weights)?;
        } else {
            prepare_operations_explicit(&mut ops, &sd, values, weights)?;
        }
    }

    Ok(ops)
}

fn prepare_operations_implicit(
    ops: &mut Vec<Operation>,
    sd: &StatDescriptor,
    values: &[Arc<dyn RasterSource>],
    weights: &[Arc<dyn RasterSource>],
) -> Result<()> {
    if values.is_empty() {
        return Err(Error::Other("no value rasters provided".into()));
    }

    let full_names = values.len() > 1 || weights.len() > 1;

    if values.len() > 1 && weights.len() > 1 && values.len() != weights.len() {
        return Err(Error::IncompatibleBands);
    }

    for i in 0..values.len() {
        let v = &values[i % values.len()];
        let w = if weights.is_empty() {
            None
        } else {
            Some(weights[i % weights.len()].clone())
        };

        let name = match (&sd.name, full_names) {
            (Some(name), false) => name.clone(),
            _ => make_name(v.as_ref(), w.as_deref(), &sd.stat, full_names)?,
        };

        ops.push(Operation::new(
            &sd.stat,
            name,
            v.clone(),
            w,
            sd.args.clone(),
        )?);
    }

    Ok(())
}

fn prepare_operations_explicit(
    ops: &mut Vec<Operation>,
    sd: &StatDescriptor,
    values: &[Arc<dyn RasterSource>],
    weights: &[Arc<dyn RasterSource>],
) -> Result<()> {
    let values_map: HashMap<&str, &Arc<dyn RasterSource>> =
        values.iter().map(|r| (r.name(), r)).collect();
    let mut weights_map = values_map.clone();
    for r in weights {
        weights_map.insert(r.name(), r);
    }

    let values_name = sd.values.as_deref().unwrap_or_default();
    let v = values_map
        .get(values_name)
        .ok_or_else(|| Error::UnknownRaster {
            raster: values_name.to_string(),
            stat: sd.stat.clone(),
        })?;

    let w = match sd.weights.as_deref() {
        Some(weights_name) => Some(
            weights_map
                .get(weights_name)
                .ok_or_else(|| Error::UnknownRaster {
                    raster: weights_name.to_string(),
                    stat: sd.stat.clone(),
                })?,
        ),
        None => None,
    };

    let name = sd
        .name
        .clone()
        .unwrap_or_else(|| format!("{}_{}", v.name(), sd.stat));

    ops.push(Operation::new(
        &sd.stat,
        name,
        Arc::clone(*v),
        w.map(|w| Arc::clone(*w)),
        sd.args.clone(),
    )?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonalite_core::{Grid, MemoryRasterSource, Raster};

    fn source(name: &str) -> Arc<dyn RasterSource> {
        let grid = Grid::new(0.0, 0.0, 3.0, 3.0, 1.0, 1.0).unwrap();
        Arc::new(MemoryRasterSource::new(name, Raster::<f64>::new(grid)))
    }

    fn descriptors(specs: &[&str]) -> Vec<String> {
        specs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unknown_stat_rejected() {
        assert!(matches!(
            Stat::parse("bogus"),
            Err(Error::UnknownStat(_))
        ));
        assert_eq!(Stat::parse("majority").unwrap(), Stat::Mode);
    }

    #[test]
    fn test_storage_and_weight_requirements() {
        assert!(Stat::Quantile.requires_stored_values());
        assert!(Stat::Median.requires_stored_values());
        assert!(Stat::CellId.requires_stored_values());
        assert!(!Stat::Mean.requires_stored_values());

        assert!(Stat::WeightedMean.requires_weights());
        assert!(Stat::Weights.requires_weights());
        assert!(!Stat::Mean.requires_weights());
    }

    #[test]
    fn test_weighted_stat_without_weights() {
        let ops = prepare_operations(
            &descriptors(&["weighted_mean"]),
            &[source("pop")],
            &[],
        );
        assert!(matches!(ops, Err(Error::MissingWeights(_))));
    }

    #[test]
    fn test_single_raster_field_name() {
        let ops =
            prepare_operations(&descriptors(&["mean"]), &[source("pop")], &[]).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name(), "mean");
    }

    #[test]
    fn test_implicit_recycling_names() {
        let values = vec![source("v_0"), source("v_1"), source("v_2")];
        let weights = vec![source("w_0")];

        let ops =
            prepare_operations(&descriptors(&["weighted_mean"]), &values, &weights).unwrap();

        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].name(), "v_0_w_0_weighted_mean");
        assert_eq!(ops[1].name(), "v_1_w_0_weighted_mean");
        assert_eq!(ops[2].name(), "v_2_w_0_weighted_mean");
        assert_eq!(ops[1].values().name(), "v_1");
        assert_eq!(ops[1].weights().unwrap().name(), "w_0");
    }

    #[test]
    fn test_implicit_unweighted_multiband_names() {
        let values = vec![source("a"), source("b")];
        let ops = prepare_operations(&descriptors(&["sum"]), &values, &[]).unwrap();

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name(), "a_sum");
        assert_eq!(ops[1].name(), "b_sum");
    }

    #[test]
    fn test_incompatible_band_counts() {
        let values = vec![source("a"), source("b"), source("c")];
        let weights = vec![source("x"), source("y")];

        assert!(matches!(
            prepare_operations(&descriptors(&["weighted_sum"]), &values, &weights),
            Err(Error::IncompatibleBands)
        ));
    }

    #[test]
    fn test_explicit_lookup() {
        let values = vec![source("pop"), source("income")];
        let weights = vec![source("area")];

        let ops = prepare_operations(
            &descriptors(&["weighted_mean(income, area)"]),
            &values,
            &weights,
        )
        .unwrap();

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name(), "income_weighted_mean");
        assert_eq!(ops[0].values().name(), "income");
        assert_eq!(ops[0].weights().unwrap().name(), "area");
    }

    #[test]
    fn test_explicit_weights_fall_back_to_values() {
        let values = vec![source("pop"), source("area")];

        let ops = prepare_operations(
            &descriptors(&["weighted_sum(pop, area)"]),
            &values,
            &[],
        )
        .unwrap();
        assert_eq!(ops[0].weights().unwrap().name(), "area");
    }

    #[test]
    fn test_explicit_unknown_raster() {
        assert!(matches!(
            prepare_operations(&descriptors(&["mean(missing)"]), &[source("pop")], &[]),
            Err(Error::UnknownRaster { .. })
        ));
    }

    #[test]
    fn test_explicit_custom_name() {
        let ops = prepare_operations(
            &descriptors(&["population=sum(pop)"]),
            &[source("pop")],
            &[],
        )
        .unwrap();
        assert_eq!(ops[0].name(), "population");
    }

    #[test]
    fn test_quantile_field_names() {
        let ops = prepare_operations(
            &descriptors(&["quantile(pop, q=0.25,0.5,0.75)"]),
            &[source("pop")],
            &[],
        )
        .unwrap();

        assert_eq!(ops[0].field_names(), &["q_25", "q_50", "q_75"]);
        assert!(ops[0].requires_stored_values());
    }

    #[test]
    fn test_quantile_argument_validation() {
        let err = prepare_operations(&descriptors(&["quantile(pop)"]), &[source("pop")], &[]);
        assert!(matches!(err, Err(Error::InvalidDescriptor(_))));

        let err = prepare_operations(
            &descriptors(&["quantile(pop, q=1.5)"]),
            &[source("pop")],
            &[],
        );
        assert!(matches!(err, Err(Error::InvalidDescriptor(_))));

        let err = prepare_operations(
            &descriptors(&["mean(pop, q=0.5)"]),
            &[source("pop")],
            &[],
        );
        assert!(matches!(err, Err(Error::InvalidDescriptor(_))));
    }

    #[test]
    fn test_operation_keys_distinguish_stats() {
        let values = vec![source("pop")];
        let ops = prepare_operations(&descriptors(&["mean", "sum"]), &values, &[]).unwrap();
        assert_ne!(ops[0].key(), ops[1].key());
    }
}
