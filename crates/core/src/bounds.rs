//! Inclusive axis-aligned extents

use geo::BoundingRect;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};

/// An inclusive axis-aligned extent.
///
/// The empty extent is represented distinctly (`Bounds::empty()`) and acts
/// as the identity for [`Bounds::expand_to_include`] and the absorbing
/// element for [`Bounds::intersection`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Bounds {
    /// Create a new extent from corner coordinates
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// The empty extent
    pub fn empty() -> Self {
        Self {
            xmin: f64::INFINITY,
            ymin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymax: f64::NEG_INFINITY,
        }
    }

    /// Extent of a geometry, or `None` for an empty geometry
    pub fn from_geometry(geom: &Geometry<f64>) -> Option<Self> {
        geom.bounding_rect()
            .map(|r| Self::new(r.min().x, r.min().y, r.max().x, r.max().y))
    }

    /// Whether the extent contains no points
    pub fn is_empty(&self) -> bool {
        self.xmin > self.xmax || self.ymin > self.ymax
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.xmax - self.xmin
        }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.ymax - self.ymin
        }
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Whether the point lies inside the extent (boundary inclusive)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// Whether two extents share at least a boundary point
    pub fn intersects(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }

    /// Intersection of two extents; empty if they do not overlap
    pub fn intersection(&self, other: &Bounds) -> Bounds {
        if !self.intersects(other) {
            return Bounds::empty();
        }

        Bounds::new(
            self.xmin.max(other.xmin),
            self.ymin.max(other.ymin),
            self.xmax.min(other.xmax),
            self.ymax.min(other.ymax),
        )
    }

    /// Grow the extent to include a point
    pub fn expand_to_include(&mut self, x: f64, y: f64) {
        self.xmin = self.xmin.min(x);
        self.ymin = self.ymin.min(y);
        self.xmax = self.xmax.max(x);
        self.ymax = self.ymax.max(y);
    }
}
