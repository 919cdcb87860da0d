//! Axis-aligned extents of rasters, in their own CRS or in degrees.

use serde::{Deserialize, Serialize};

/// Extent in the units of whatever CRS produced it (degrees or meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator
    /// or one with only non-finite points.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut bbox: Option<BoundingBox> = None;
        for (x, y) in points {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            bbox = Some(match bbox {
                Some(b) => BoundingBox {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
                None => BoundingBox::new(x, y, x, y),
            });
        }
        bbox
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Top-left corner `(min_x, max_y)`.
    pub fn top_left(&self) -> (f64, f64) {
        (self.min_x, self.max_y)
    }

    /// Bottom-right corner `(max_x, min_y)`.
    pub fn bottom_right(&self) -> (f64, f64) {
        (self.max_x, self.min_y)
    }

    /// `[min_x, min_y, max_x, max_y]`, the order used by TileJSON `bounds`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}
