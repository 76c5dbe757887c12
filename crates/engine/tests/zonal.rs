//! End-to-end zonal statistics scenarios over in-memory sources

use approx::assert_relative_eq;
use geo_types::{polygon, Geometry};
use std::sync::Arc;
use zonalite_core::{
    Feature, FieldValue, Grid, MemoryFeatureSource, MemoryRasterSource, Raster, RasterElement,
    RasterSource,
};
use zonalite_engine::operation::prepare_operations;
use zonalite_engine::output::MemoryWriter;
use zonalite_engine::processor::FeatureSequentialProcessor;

/// 3x3 grid of unit cells with origin (0, 0), values 1..9 row-major from
/// the top-left
fn grid_3x3() -> Grid {
    Grid::new(0.0, 0.0, 3.0, 3.0, 1.0, 1.0).unwrap()
}

fn values_1_to_9(name: &str) -> Arc<dyn RasterSource> {
    let data: Vec<f64> = (1..=9).map(f64::from).collect();
    Arc::new(MemoryRasterSource::new(
        name,
        Raster::from_vec(grid_3x3(), data).unwrap(),
    ))
}

fn int_source<T>(name: &str, grid: Grid, data: Vec<T>, nodata: Option<T>) -> Arc<dyn RasterSource>
where
    T: RasterElement,
    zonalite_core::RasterVariant: From<Raster<T>>,
{
    let mut raster = Raster::from_vec(grid, data).unwrap();
    raster.set_nodata(nodata);
    Arc::new(MemoryRasterSource::new(name, raster))
}

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Feature {
    Feature::new(Geometry::Polygon(polygon![
        (x: x0, y: y0),
        (x: x1, y: y0),
        (x: x1, y: y1),
        (x: x0, y: y1),
        (x: x0, y: y0),
    ]))
}

fn run(
    descriptors: &[&str],
    values: &[Arc<dyn RasterSource>],
    weights: &[Arc<dyn RasterSource>],
    features: Vec<Feature>,
) -> Vec<Feature> {
    let descriptors: Vec<String> = descriptors.iter().map(|s| s.to_string()).collect();
    let mut processor = FeatureSequentialProcessor::new();
    processor.add_operations(prepare_operations(&descriptors, values, weights).unwrap());

    let mut source = MemoryFeatureSource::new(features);
    let mut writer = MemoryWriter::new();
    processor.process(&mut source, &mut writer).unwrap();
    writer.into_features()
}

#[test]
fn single_cell_polygon() {
    let out = run(
        &["count", "sum", "mean", "min", "max", "mode", "variety"],
        &[values_1_to_9("v")],
        &[],
        vec![square(1.0, 1.0, 2.0, 2.0)],
    );

    let f = &out[0];
    assert_relative_eq!(f.get_double("count").unwrap(), 1.0);
    assert_relative_eq!(f.get_double("sum").unwrap(), 5.0);
    assert_relative_eq!(f.get_double("mean").unwrap(), 5.0);
    assert_relative_eq!(f.get_double("min").unwrap(), 5.0);
    assert_relative_eq!(f.get_double("max").unwrap(), 5.0);
    assert_relative_eq!(f.get_double("mode").unwrap(), 5.0);
    assert_eq!(f.get_int64("variety").unwrap(), 1);
}

#[test]
fn half_cell_polygon() {
    // Covers the left half of cell (2, 0), value 7
    let out = run(
        &["count", "sum", "mean"],
        &[values_1_to_9("v")],
        &[],
        vec![square(0.0, 0.0, 0.5, 1.0)],
    );

    let f = &out[0];
    assert_relative_eq!(f.get_double("count").unwrap(), 0.5, epsilon = 1e-9);
    assert_relative_eq!(f.get_double("sum").unwrap(), 3.5, epsilon = 1e-9);
    assert_relative_eq!(f.get_double("mean").unwrap(), 7.0, epsilon = 1e-9);
}

#[test]
fn weighted_mean_with_nodata() {
    let grid = Grid::new(0.0, 0.0, 3.0, 1.0, 1.0, 1.0).unwrap();
    let mut values = Raster::from_vec(grid, vec![1.0f64, 2.0, -999.0]).unwrap();
    values.set_nodata(Some(-999.0));
    let values: Arc<dyn RasterSource> = Arc::new(MemoryRasterSource::new("v", values));
    let weights: Arc<dyn RasterSource> = Arc::new(MemoryRasterSource::new(
        "w",
        Raster::from_vec(grid, vec![2.0f64, 2.0, 2.0]).unwrap(),
    ));

    // Rectangle covering the bottom half of all three cells
    let out = run(
        &["mean", "weighted_mean"],
        &[values],
        &[weights],
        vec![square(0.0, 0.0, 3.0, 0.5)],
    );

    let f = &out[0];
    assert_relative_eq!(f.get_double("mean").unwrap(), 1.5, epsilon = 1e-9);
    assert_relative_eq!(f.get_double("weighted_mean").unwrap(), 1.5, epsilon = 1e-9);
}

#[test]
fn quantile_descriptor_fields() {
    let grid = Grid::new(0.0, 0.0, 5.0, 1.0, 1.0, 1.0).unwrap();
    let pop = int_source("pop", grid, vec![1i32, 2, 3, 4, 5], None);

    let out = run(
        &["quantile(pop, q=0.25,0.5,0.75)"],
        &[pop],
        &[],
        vec![square(0.0, 0.0, 5.0, 1.0)],
    );

    let f = &out[0];
    assert_relative_eq!(f.get_double("q_25").unwrap(), 2.0);
    assert_relative_eq!(f.get_double("q_50").unwrap(), 3.0);
    assert_relative_eq!(f.get_double("q_75").unwrap(), 4.0);
}

#[test]
fn implicit_recycling_field_names() {
    let sources: Vec<Arc<dyn RasterSource>> = (0..3)
        .map(|i| values_1_to_9(&format!("v_{i}")))
        .collect();
    let weights: Vec<Arc<dyn RasterSource>> = vec![values_1_to_9("w_0")];

    let out = run(
        &["weighted_mean"],
        &sources,
        &weights,
        vec![square(0.0, 0.0, 3.0, 3.0)],
    );

    let f = &out[0];
    for name in [
        "v_0_w_0_weighted_mean",
        "v_1_w_0_weighted_mean",
        "v_2_w_0_weighted_mean",
    ] {
        assert!(f.get(name).is_some(), "missing field {name}");
    }
}

#[test]
fn frac_on_integer_raster() {
    let grid = Grid::new(0.0, 0.0, 4.0, 1.0, 1.0, 1.0).unwrap();
    let landcov = int_source("landcov", grid, vec![10i32, 10, 20, 30], None);

    let out = run(
        &["frac", "mode"],
        &[landcov],
        &[],
        vec![square(0.0, 0.0, 4.0, 1.0)],
    );

    let f = &out[0];
    assert_relative_eq!(f.get_double("frac_10").unwrap(), 0.5);
    assert_relative_eq!(f.get_double("frac_20").unwrap(), 0.25);
    assert_relative_eq!(f.get_double("frac_30").unwrap(), 0.25);
    assert_eq!(f.get_int("mode").unwrap(), 10);
}

#[test]
fn mode_tie_breaks_to_largest() {
    let grid = Grid::new(0.0, 0.0, 4.0, 1.0, 1.0, 1.0).unwrap();
    let landcov = int_source("landcov", grid, vec![10i32, 10, 20, 20], None);

    let out = run(
        &["mode", "minority"],
        &[landcov],
        &[],
        vec![square(0.0, 0.0, 4.0, 1.0)],
    );

    assert_eq!(out[0].get_int("mode").unwrap(), 20);
    assert_eq!(out[0].get_int("minority").unwrap(), 10);
}

#[test]
fn polygon_outside_raster_emits_defaults() {
    let grid = Grid::new(0.0, 0.0, 3.0, 3.0, 1.0, 1.0).unwrap();
    let v = int_source("v", grid, vec![1i32; 9], Some(-1));

    let out = run(
        &["count", "sum", "mean", "min", "variety"],
        &[v],
        &[],
        vec![square(50.0, 50.0, 51.0, 51.0)],
    );

    let f = &out[0];
    assert_eq!(f.get_double("count").unwrap(), 0.0);
    assert_eq!(f.get_double("sum").unwrap(), 0.0);
    assert!(f.get_double("mean").unwrap().is_nan());
    // Missing min substitutes the raster's nodata sentinel
    assert_eq!(f.get("min"), Some(&FieldValue::Int(-1)));
    assert_eq!(f.get_int64("variety").unwrap(), 0);
}

#[test]
fn polygon_entirely_in_nodata_emits_defaults() {
    let grid = Grid::new(0.0, 0.0, 3.0, 3.0, 1.0, 1.0).unwrap();
    let v = int_source("v", grid, vec![-1i32; 9], Some(-1));

    let out = run(
        &["count", "mean"],
        &[v],
        &[],
        vec![square(0.5, 0.5, 2.5, 2.5)],
    );

    assert_eq!(out[0].get_double("count").unwrap(), 0.0);
    assert!(out[0].get_double("mean").unwrap().is_nan());
}

#[test]
fn quantile_extremes_match_min_max() {
    let grid = Grid::new(0.0, 0.0, 5.0, 1.0, 1.0, 1.0).unwrap();
    let pop = int_source("pop", grid, vec![3i32, 1, 4, 1, 5], None);

    let out = run(
        &["min", "max", "quantile(pop, q=0,1)", "median"],
        &[pop],
        &[],
        vec![square(0.0, 0.0, 5.0, 1.0)],
    );

    let f = &out[0];
    assert_relative_eq!(f.get_double("q_0").unwrap(), f.get_double("min").unwrap());
    assert_relative_eq!(f.get_double("q_100").unwrap(), f.get_double("max").unwrap());
    assert_relative_eq!(f.get_double("median").unwrap(), 3.0);
}

#[test]
fn weights_of_one_match_unweighted() {
    let ones: Arc<dyn RasterSource> = Arc::new(MemoryRasterSource::new(
        "ones",
        Raster::filled(grid_3x3(), 1.0f64),
    ));

    let out = run(
        &["mean", "stdev", "weighted_mean(v, ones)", "weighted_stdev(v, ones)"],
        &[values_1_to_9("v")],
        &[ones],
        vec![square(0.25, 0.4, 2.9, 2.6)],
    );

    let f = &out[0];
    assert_relative_eq!(
        f.get_double("v_weighted_mean").unwrap(),
        f.get_double("mean").unwrap(),
        epsilon = 1e-12
    );
    assert_relative_eq!(
        f.get_double("v_weighted_stdev").unwrap(),
        f.get_double("stdev").unwrap(),
        epsilon = 1e-12
    );
}

#[test]
fn cell_aligned_polygon_covers_exactly() {
    // Coverage of the union of cells (0..2, 0..2) is exactly 1 per cell
    let out = run(
        &["count", "coverage", "cell_id"],
        &[values_1_to_9("v")],
        &[],
        vec![square(0.0, 1.0, 2.0, 3.0)],
    );

    let f = &out[0];
    assert_eq!(f.get_double("count").unwrap(), 4.0);
    assert_eq!(
        f.get_double_array("coverage").unwrap(),
        &[1.0, 1.0, 1.0, 1.0]
    );
    // Top-left 2x2 block of the 3x3 grid, row-major ids
    assert_eq!(f.get_int64_array("cell_id").unwrap(), &[0, 1, 3, 4]);
}

#[test]
fn center_coordinates_of_covered_cells() {
    let out = run(
        &["center_x", "center_y"],
        &[values_1_to_9("v")],
        &[],
        vec![square(1.0, 1.0, 2.0, 2.0)],
    );

    let f = &out[0];
    assert_eq!(f.get_double_array("center_x").unwrap(), &[1.5]);
    assert_eq!(f.get_double_array("center_y").unwrap(), &[1.5]);
}

#[test]
fn multiple_features_processed_independently() {
    let out = run(
        &["sum"],
        &[values_1_to_9("v")],
        &[],
        vec![
            square(0.0, 2.0, 1.0, 3.0), // cell value 1
            square(2.0, 0.0, 3.0, 1.0), // cell value 9
            square(0.0, 0.0, 3.0, 3.0), // all cells
        ],
    );

    assert_eq!(out.len(), 3);
    assert_relative_eq!(out[0].get_double("sum").unwrap(), 1.0);
    assert_relative_eq!(out[1].get_double("sum").unwrap(), 9.0);
    assert_relative_eq!(out[2].get_double("sum").unwrap(), 45.0);
}

#[test]
fn unnest_emits_one_feature_per_cell() {
    let descriptors = vec![
        "coverage".to_string(),
        "values".to_string(),
        "cell_id".to_string(),
    ];
    let mut processor = FeatureSequentialProcessor::new();
    processor
        .add_operations(prepare_operations(&descriptors, &[values_1_to_9("v")], &[]).unwrap());
    processor.set_unnest(true);

    let mut source = MemoryFeatureSource::new(vec![square(0.0, 1.0, 2.0, 3.0)]);
    let mut writer = MemoryWriter::new();
    processor.process(&mut source, &mut writer).unwrap();

    let features = writer.features();
    assert_eq!(features.len(), 4);

    let ids: Vec<i64> = features
        .iter()
        .map(|f| f.get_int64("cell_id").unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 3, 4]);

    for f in features {
        assert_eq!(f.get_double("coverage").unwrap(), 1.0);
    }
}

#[test]
fn weighted_frac_uses_weight_mass() {
    let grid = Grid::new(0.0, 0.0, 2.0, 1.0, 1.0, 1.0).unwrap();
    let landcov = int_source("landcov", grid, vec![10i32, 20], None);
    let weights: Arc<dyn RasterSource> = Arc::new(MemoryRasterSource::new(
        "w",
        Raster::from_vec(grid, vec![3.0f64, 1.0]).unwrap(),
    ));

    let out = run(
        &["weighted_frac"],
        &[landcov],
        &[weights],
        vec![square(0.0, 0.0, 2.0, 1.0)],
    );

    let f = &out[0];
    assert_relative_eq!(f.get_double("weighted_frac_10").unwrap(), 0.75);
    assert_relative_eq!(f.get_double("weighted_frac_20").unwrap(), 0.25);
}
