//! Exact cell coverage of polygons on a grid
//!
//! For a polygon `P` and grid `G`, produces a `Raster<f32>` over the
//! minimal window of `G` containing every cell that `P` touches; the value
//! at `(r, c)` is the fraction of cell `(r, c)` covered by `P`, in [0, 1].
//! Fractions are computed analytically from the ring edges, never by
//! supersampling.

mod scanline;

use geo::Area;
use geo_types::{Coord, Geometry, Polygon};
use ndarray::Array2;
use scanline::AreaAccumulator;
use zonalite_core::{Bounds, Error, Grid, Raster, Result};

/// Fractions closer than this to 0 or 1 (relative to a full cell) are
/// snapped, absorbing floating-point drift in the edge accumulation
const COVERAGE_EPSILON: f64 = 1e-12;

/// Compute the coverage fractions of `geom` over `grid`.
///
/// Returns a raster over the minimal window of `grid` enclosing the
/// geometry, clipped to the grid extent. Polygons and multipolygons are
/// supported; exterior rings add area and interior rings remove it,
/// regardless of the winding direction they were supplied with.
///
/// A degenerate (zero-area) geometry yields an empty raster, as does a
/// geometry entirely outside the grid.
pub fn coverage_fraction(geom: &Geometry<f64>, grid: &Grid) -> Result<Raster<f32>> {
    let polygons: &[Polygon<f64>] = match geom {
        Geometry::Polygon(p) => std::slice::from_ref(p),
        Geometry::MultiPolygon(mp) => &mp.0,
        other => {
            return Err(Error::InvalidGeometry(format!(
                "unsupported geometry type for coverage: {}",
                geometry_type_name(other)
            )))
        }
    };

    validate_polygons(polygons)?;

    let bounds = Bounds::from_geometry(geom)
        .ok_or_else(|| Error::InvalidGeometry("empty geometry".into()))?;

    let area = match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        _ => unreachable!(),
    };
    if area == 0.0 {
        return Ok(Raster::empty());
    }

    let window = grid.shrink_to_fit(&bounds);
    if window.is_empty() {
        return Ok(Raster::new(window));
    }

    let mut acc = AreaAccumulator::new(window);
    for polygon in polygons {
        add_ring_oriented(&mut acc, &polygon.exterior().0, true);
        for interior in polygon.interiors() {
            add_ring_oriented(&mut acc, &interior.0, false);
        }
    }

    let cell_area = window.cell_area();
    let fractions: Array2<f32> = acc.into_areas().map(|a| {
        let f = a / cell_area;
        if f < COVERAGE_EPSILON {
            0.0
        } else if f > 1.0 - COVERAGE_EPSILON {
            1.0
        } else {
            f as f32
        }
    });

    Raster::from_array(window, fractions)
}

/// Accumulate a ring so that exterior rings contribute positive area and
/// interior rings negative area, independent of the stored winding
fn add_ring_oriented(acc: &mut AreaAccumulator, coords: &[Coord<f64>], exterior: bool) {
    let signed = ring_signed_area(coords);
    if signed == 0.0 {
        return;
    }

    let orientation = signed.signum();
    let sign = if exterior { orientation } else { -orientation };
    acc.add_ring(coords, sign);
}

/// Shoelace area of a ring, treated as implicitly closed
fn ring_signed_area(coords: &[Coord<f64>]) -> f64 {
    if coords.len() < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    for i in 0..coords.len() {
        let p = coords[i];
        let q = coords[(i + 1) % coords.len()];
        sum += p.x * q.y - q.x * p.y;
    }

    0.5 * sum
}

fn validate_polygons(polygons: &[Polygon<f64>]) -> Result<()> {
    for polygon in polygons {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            for c in &ring.0 {
                if !c.x.is_finite() || !c.y.is_finite() {
                    return Err(Error::InvalidGeometry(
                        "ring contains a non-finite coordinate".into(),
                    ));
                }
            }
        }
    }

    Ok(())
}

fn geometry_type_name(geom: &Geometry<f64>) -> &'static str {
    match geom {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
