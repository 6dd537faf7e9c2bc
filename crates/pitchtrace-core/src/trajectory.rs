use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::Vector3;

/// The predicted flight path of the ball, derived from a single [`TrackingSample`].
///
/// `points[0]` is the sample position. Unless the trajectory is `degenerate`, the
/// last point lies at or below the ground plane. A degenerate trajectory has exactly
/// one point.
///
/// [`TrackingSample`]: crate::TrackingSample
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[typeshare]
pub struct PredictedTrajectory {
    /// Sampled positions along the path, uniformly spaced in time
    pub points: Vec<Vector3>,
    /// Time from release to ground contact, in seconds
    pub flight_time: f64,
    /// Predicted ground contact point
    pub landing_point: Vector3,
    /// Apex height above the ground plane, in meters
    pub max_height: f64,
    /// Lateral offset caused by spin at the landing point, in meters
    pub lateral_deflection: f64,
    /// Whether the flight time could not be solved
    pub degenerate: bool,
}

impl PredictedTrajectory {
    /// Create a single-point trajectory at `position`.
    pub fn degenerate(position: Vector3) -> Self {
        Self {
            points: vec![position],
            flight_time: 0.0,
            landing_point: position,
            max_height: position.z,
            lateral_deflection: 0.0,
            degenerate: true,
        }
    }

    /// Number of points in the trajectory. Always at least 1.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the final point.
    pub fn last_index(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn last_point(&self) -> Vector3 {
        self.points.last().copied().unwrap_or(self.landing_point)
    }

    /// Get the point at `index`, clamped to the last point.
    pub fn point_at(&self, index: usize) -> Vector3 {
        self.points
            .get(index.min(self.last_index()))
            .copied()
            .unwrap_or(self.landing_point)
    }

    /// Time between two consecutive points, in seconds. Zero for degenerate
    /// trajectories.
    pub fn time_step(&self) -> f64 {
        if self.points.len() < 2 {
            0.0
        } else {
            self.flight_time / (self.points.len() - 1) as f64
        }
    }
}
