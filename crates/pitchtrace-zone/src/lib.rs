//! Classification of a trajectory against the 3x3 target grid.

use pitchtrace_core::{
    GridBounds, PredictedTrajectory, Vector2, Vector3, ZoneAssessment, ZoneSettings,
    GRID_DIVISIONS, ZONE_OUTSIDE,
};

/// Maps predicted trajectories to target zones using a fixed grid.
#[derive(Debug, Clone, Default)]
pub struct ZoneAnalyzer {
    settings: ZoneSettings,
}

impl ZoneAnalyzer {
    pub fn new(settings: ZoneSettings) -> Self {
        Self { settings }
    }

    pub fn update_settings(&mut self, settings: ZoneSettings) {
        self.settings = settings;
    }

    /// The grid this analyzer assesses against.
    pub fn grid(&self) -> &GridBounds {
        &self.settings.grid
    }

    /// Assess `trajectory` against the configured grid.
    pub fn assess(
        &self,
        trajectory: &PredictedTrajectory,
        confidence: Option<f64>,
    ) -> ZoneAssessment {
        analyze(trajectory, &self.settings.grid, confidence)
    }
}

/// Assess where `trajectory` crosses the target grid.
///
/// `confidence` is an externally supplied score, clamped to `[0, 1]`. Without it,
/// the confidence is a geometric proxy: inside the grid, `1 - d/r` where `d` is the
/// distance to the center of the hit cell and `r` the half diagonal of a cell;
/// outside, the distance to the grid normalized the same way.
pub fn analyze(
    trajectory: &PredictedTrajectory,
    bounds: &GridBounds,
    confidence: Option<f64>,
) -> ZoneAssessment {
    let crossing = crossing_point(trajectory, bounds.plane_x);
    let (u, v) = (crossing.y, crossing.z);
    let supplied = confidence.filter(|c| c.is_finite()).map(|c| c.clamp(0.0, 1.0));
    let half_diagonal = 0.5 * bounds.cell_width().hypot(bounds.cell_height());

    if !bounds.contains(u, v) {
        let confidence = supplied.unwrap_or_else(|| {
            let dx = (bounds.left - u).max(u - bounds.right()).max(0.0);
            let dy = (bounds.bottom() - v).max(v - bounds.top).max(0.0);
            normalize(dx.hypot(dy), half_diagonal)
        });
        return ZoneAssessment {
            zone_id: ZONE_OUTSIDE,
            confidence,
        };
    }

    let max_idx = (GRID_DIVISIONS - 1) as f64;
    let col = ((u - bounds.left) / bounds.cell_width())
        .floor()
        .clamp(0.0, max_idx) as usize;
    let row = ((bounds.top - v) / bounds.cell_height())
        .floor()
        .clamp(0.0, max_idx) as usize;
    let zone_id = (row * GRID_DIVISIONS + col + 1) as u8;

    let confidence = supplied.unwrap_or_else(|| {
        let center = bounds.zone_center(zone_id).unwrap_or_else(|| bounds.center());
        1.0 - normalize((Vector2::new(u, v) - center).norm(), half_diagonal)
    });

    ZoneAssessment {
        zone_id,
        confidence,
    }
}

/// Find where `trajectory` crosses the plane `x == plane_x`.
///
/// If the path passes through the plane, the crossing is interpolated between the
/// two bracketing points. Otherwise the point closest to the plane is used.
pub fn crossing_point(trajectory: &PredictedTrajectory, plane_x: f64) -> Vector3 {
    for pair in trajectory.points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (da, db) = (a.x - plane_x, b.x - plane_x);
        if da == 0.0 {
            return a;
        }
        if da.signum() != db.signum() || db == 0.0 {
            let f = da / (da - db);
            return a + (b - a) * f;
        }
    }

    trajectory
        .points
        .iter()
        .copied()
        .min_by(|a, b| {
            (a.x - plane_x)
                .abs()
                .total_cmp(&(b.x - plane_x).abs())
        })
        .unwrap_or(trajectory.landing_point)
}

fn normalize(distance: f64, scale: f64) -> f64 {
    if scale <= 0.0 {
        return 0.0;
    }
    (distance / scale).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> GridBounds {
        GridBounds::centered(Vector2::new(0.0, 0.8), 0.45, 0.6, 18.44)
    }

    /// A straight trajectory crossing the plane at `(u, v)`.
    fn through(u: f64, v: f64) -> PredictedTrajectory {
        let points = vec![
            Vector3::new(0.0, u, v),
            Vector3::new(10.0, u, v),
            Vector3::new(20.0, u, v),
        ];
        PredictedTrajectory {
            landing_point: points[2],
            points,
            flight_time: 0.5,
            max_height: v,
            lateral_deflection: 0.0,
            degenerate: false,
        }
    }

    #[test]
    fn test_center_maps_to_zone_5() {
        let bounds = grid();
        let result = analyze(&through(0.0, 0.8), &bounds, None);
        assert_eq!(result.zone_id, 5);
        assert_relative_eq!(result.confidence, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_top_left_corner_maps_to_zone_1() {
        let bounds = grid();
        let result = analyze(&through(bounds.left, bounds.top), &bounds, None);
        assert_eq!(result.zone_id, 1);
        assert_relative_eq!(result.confidence, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bottom_right_corner_maps_to_zone_9() {
        let bounds = grid();
        let result = analyze(&through(bounds.right(), bounds.bottom()), &bounds, None);
        assert_eq!(result.zone_id, 9);
    }

    #[test]
    fn test_row_major_ids() {
        let bounds = grid();
        for zone_id in 1..=9u8 {
            let c = bounds.zone_center(zone_id).unwrap();
            assert_eq!(analyze(&through(c.x, c.y), &bounds, None).zone_id, zone_id);
        }
    }

    #[test]
    fn test_outside_maps_to_zone_0() {
        let bounds = grid();
        let result = analyze(&through(2.0, 0.8), &bounds, None);
        assert_eq!(result.zone_id, ZONE_OUTSIDE);
        assert!(!result.is_strike());
        assert_eq!(result.confidence, 1.0);

        let just_below = analyze(&through(0.0, bounds.bottom() - 0.01), &bounds, None);
        assert_eq!(just_below.zone_id, ZONE_OUTSIDE);
        assert!(just_below.confidence > 0.0 && just_below.confidence < 0.2);
    }

    #[test]
    fn test_supplied_confidence_is_clamped() {
        let bounds = grid();
        assert_eq!(analyze(&through(0.0, 0.8), &bounds, Some(0.4)).confidence, 0.4);
        assert_eq!(analyze(&through(0.0, 0.8), &bounds, Some(3.0)).confidence, 1.0);
        assert_eq!(analyze(&through(5.0, 0.8), &bounds, Some(-1.0)).confidence, 0.0);
        assert_relative_eq!(
            analyze(&through(0.0, 0.8), &bounds, Some(f64::NAN)).confidence,
            1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_crossing_is_interpolated() {
        let traj = PredictedTrajectory {
            points: vec![Vector3::new(18.0, 0.0, 1.0), Vector3::new(19.0, 0.2, 0.0)],
            flight_time: 0.1,
            landing_point: Vector3::new(19.0, 0.2, 0.0),
            max_height: 1.0,
            lateral_deflection: 0.0,
            degenerate: false,
        };
        let p = crossing_point(&traj, 18.5);
        assert_relative_eq!(p.x, 18.5, epsilon = 1e-12);
        assert_relative_eq!(p.y, 0.1, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_short_trajectory_uses_nearest_point() {
        let traj = PredictedTrajectory {
            points: vec![Vector3::new(0.0, 0.0, 1.0), Vector3::new(12.0, 0.1, 0.0)],
            flight_time: 0.5,
            landing_point: Vector3::new(12.0, 0.1, 0.0),
            max_height: 1.0,
            lateral_deflection: 0.0,
            degenerate: false,
        };
        assert_eq!(crossing_point(&traj, 18.44), Vector3::new(12.0, 0.1, 0.0));
        assert_eq!(analyze(&traj, &grid(), None).zone_id, ZONE_OUTSIDE);
    }

    #[test]
    fn test_degenerate_trajectory() {
        let traj = PredictedTrajectory::degenerate(Vector3::new(18.44, 0.0, 0.8));
        let analyzer = ZoneAnalyzer::new(ZoneSettings { grid: grid() });
        assert_eq!(analyzer.assess(&traj, None).zone_id, 5);
    }
}
