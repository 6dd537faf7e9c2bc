use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::Vector2;

/// Zone id reported for a crossing point outside the target grid.
pub const ZONE_OUTSIDE: u8 = 0;

/// Number of rows and columns in the target grid.
pub const GRID_DIVISIONS: usize = 3;

/// Where a trajectory crosses the target grid.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[typeshare]
pub struct ZoneAssessment {
    /// Cell id in `1..=9`, row-major from the top-left, or `0` when outside the grid
    pub zone_id: u8,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
}

impl ZoneAssessment {
    /// Whether the crossing point is inside the grid.
    pub fn is_strike(&self) -> bool {
        self.zone_id != ZONE_OUTSIDE
    }
}

/// Bounds of the target grid within its reference plane.
///
/// The plane is perpendicular to the `x` axis at depth `plane_x`. In-plane
/// coordinates are `u = y` (lateral) and `v = z` (height). `left` is the minimum `u`
/// and `top` the maximum `v`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[typeshare]
pub struct GridBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Depth of the reference plane along `x`, in meters
    pub plane_x: f64,
}

impl Default for GridBounds {
    /// A 17 inch wide target between 0.5 m and 1.1 m, at the regulation pitching
    /// distance.
    fn default() -> Self {
        Self::centered(Vector2::new(0.0, 0.8), 0.4318, 0.6, 18.44)
    }
}

impl GridBounds {
    /// Create bounds of the given size centered at `center` (in `(u, v)`).
    pub fn centered(center: Vector2, width: f64, height: f64, plane_x: f64) -> Self {
        Self {
            left: center.x - width / 2.0,
            top: center.y + height / 2.0,
            width,
            height,
            plane_x,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top - self.height
    }

    pub fn cell_width(&self) -> f64 {
        self.width / GRID_DIVISIONS as f64
    }

    pub fn cell_height(&self) -> f64 {
        self.height / GRID_DIVISIONS as f64
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.left + self.width / 2.0, self.top - self.height / 2.0)
    }

    /// Whether `(u, v)` lies within the bounds, edges included.
    pub fn contains(&self, u: f64, v: f64) -> bool {
        u >= self.left && u <= self.right() && v <= self.top && v >= self.bottom()
    }

    /// Center of the cell with the given zone id, or `None` for ids outside `1..=9`.
    pub fn zone_center(&self, zone_id: u8) -> Option<Vector2> {
        if zone_id == ZONE_OUTSIDE || zone_id as usize > GRID_DIVISIONS * GRID_DIVISIONS {
            return None;
        }
        let idx = zone_id as usize - 1;
        let (row, col) = (idx / GRID_DIVISIONS, idx % GRID_DIVISIONS);
        Some(Vector2::new(
            self.left + (col as f64 + 0.5) * self.cell_width(),
            self.top - (row as f64 + 0.5) * self.cell_height(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_bounds() {
        let bounds = GridBounds::default();
        assert_relative_eq!(bounds.left, -0.2159, epsilon = 1e-9);
        assert_relative_eq!(bounds.top, 1.1, epsilon = 1e-9);
        assert_relative_eq!(bounds.bottom(), 0.5, epsilon = 1e-9);
        assert_relative_eq!(bounds.right(), 0.2159, epsilon = 1e-9);
    }

    #[test]
    fn test_zone_center() {
        let bounds = GridBounds::centered(Vector2::new(0.0, 0.0), 3.0, 3.0, 10.0);
        assert_eq!(bounds.zone_center(1), Some(Vector2::new(-1.0, 1.0)));
        assert_eq!(bounds.zone_center(5), Some(Vector2::new(0.0, 0.0)));
        assert_eq!(bounds.zone_center(9), Some(Vector2::new(1.0, -1.0)));
        assert_eq!(bounds.zone_center(0), None);
        assert_eq!(bounds.zone_center(10), None);
    }

    #[test]
    fn test_contains_edges() {
        let bounds = GridBounds::centered(Vector2::new(0.0, 0.0), 2.0, 2.0, 0.0);
        assert!(bounds.contains(-1.0, 1.0));
        assert!(bounds.contains(1.0, -1.0));
        assert!(!bounds.contains(1.01, 0.0));
        assert!(!bounds.contains(0.0, -1.01));
    }
}
