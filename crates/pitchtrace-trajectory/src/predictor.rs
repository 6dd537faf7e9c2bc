use pitchtrace_core::{
    IntegrationMode, PhysicsSettings, PredictedTrajectory, PredictorSettings, TrackingSample,
};

use crate::{physics, stepwise};

/// Minimum number of points in a non-degenerate trajectory
const MIN_POINTS: usize = 2;
const MAX_POINTS: usize = 4096;
const MAX_SUBSTEPS: u32 = 256;

/// Turns a [`TrackingSample`] into a [`PredictedTrajectory`].
///
/// Prediction is pure and deterministic: the same sample always yields a
/// bit-identical trajectory.
#[derive(Debug, Clone)]
pub struct TrajectoryPredictor {
    physics: PhysicsSettings,
    settings: PredictorSettings,
}

impl TrajectoryPredictor {
    pub fn new(physics: PhysicsSettings, settings: PredictorSettings) -> Self {
        Self {
            physics,
            settings: sanitize(settings),
        }
    }

    pub fn update_settings(&mut self, physics: PhysicsSettings, settings: PredictorSettings) {
        self.physics = physics;
        self.settings = sanitize(settings);
    }

    pub fn physics(&self) -> &PhysicsSettings {
        &self.physics
    }

    /// Number of points in a non-degenerate trajectory.
    pub fn num_points(&self) -> usize {
        self.settings.num_points
    }

    /// Predict the flight path of the ball from a single sample.
    ///
    /// If the flight time cannot be solved, the result is a degenerate trajectory
    /// consisting of the sample position only.
    pub fn predict(&self, sample: &TrackingSample) -> PredictedTrajectory {
        let p0 = sample.position;
        let v0 = sample.velocity;
        let flight_time = match physics::flight_time(&p0, &v0, &self.physics) {
            Some(t) => t,
            None => {
                log::debug!(
                    "Degenerate trajectory for sample at t={}: z0={:.3}, vz={:.3}",
                    sample.timestamp,
                    p0.z,
                    v0.z
                );
                return PredictedTrajectory::degenerate(p0);
            }
        };

        match self.settings.integration {
            IntegrationMode::ClosedForm => self.closed_form(sample, flight_time),
            IntegrationMode::Stepwise { substeps } => stepwise::integrate(
                sample,
                flight_time,
                self.settings.num_points,
                substeps,
                &self.physics,
            ),
        }
    }

    fn closed_form(&self, sample: &TrackingSample, flight_time: f64) -> PredictedTrajectory {
        let p0 = sample.position;
        let v0 = sample.velocity;
        let n = self.settings.num_points;
        let landing_point =
            physics::landing_point(&p0, &v0, sample.spin_rate, flight_time, &self.physics);

        let mut points = Vec::with_capacity(n);
        points.push(p0);
        for i in 1..n - 1 {
            let t = flight_time * i as f64 / (n - 1) as f64;
            points.push(physics::spin_position_at(
                &p0,
                &v0,
                sample.spin_rate,
                t,
                &self.physics,
            ));
        }
        points.push(landing_point);

        PredictedTrajectory {
            points,
            flight_time,
            landing_point,
            max_height: physics::max_height(&p0, &v0, &self.physics),
            lateral_deflection: physics::magnus_deflection(
                sample.spin_rate,
                flight_time,
                &self.physics,
            ),
            degenerate: false,
        }
    }
}

impl Default for TrajectoryPredictor {
    fn default() -> Self {
        Self::new(PhysicsSettings::default(), PredictorSettings::default())
    }
}

fn sanitize(mut settings: PredictorSettings) -> PredictorSettings {
    if settings.num_points < MIN_POINTS {
        log::warn!(
            "Trajectory needs at least {} points, got {}",
            MIN_POINTS,
            settings.num_points
        );
        settings.num_points = MIN_POINTS;
    }
    if settings.num_points > MAX_POINTS {
        log::warn!(
            "Trajectory is limited to {} points, got {}",
            MAX_POINTS,
            settings.num_points
        );
        settings.num_points = MAX_POINTS;
    }
    if let IntegrationMode::Stepwise { substeps } = &mut settings.integration {
        let clamped = (*substeps).clamp(1, MAX_SUBSTEPS);
        if clamped != *substeps {
            log::warn!("Substeps must be in 1..={}, got {}", MAX_SUBSTEPS, substeps);
            *substeps = clamped;
        }
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use pitchtrace_core::Vector3;

    fn reference_sample() -> TrackingSample {
        TrackingSample::new(
            Vector3::new(0.0, 1.2, 18.4),
            Vector3::new(35.0, -12.0, 25.0),
            2400.0,
            1000,
        )
    }

    #[test]
    fn test_deterministic() {
        let predictor = TrajectoryPredictor::default();
        let a = predictor.predict(&reference_sample());
        let b = predictor.predict(&reference_sample());
        assert_eq!(a, b);
        for (pa, pb) in a.points.iter().zip(b.points.iter()) {
            for k in 0..3 {
                assert_eq!(pa[k].to_bits(), pb[k].to_bits());
            }
        }
    }

    #[test]
    fn test_reference_scenario() {
        let predictor = TrajectoryPredictor::default();
        let sample = reference_sample();
        let traj = predictor.predict(&sample);

        assert!(!traj.degenerate);
        assert_eq!(traj.len(), 60);
        assert_eq!(traj.points[0], sample.position);
        assert!(traj.last_point().z <= 0.0);
        assert_abs_diff_eq!(traj.flight_time, 5.749, epsilon = 0.01);
        assert_abs_diff_eq!(traj.max_height, 50.26, epsilon = 0.01);
        assert_relative_eq!(
            traj.lateral_deflection,
            1e-5 * 2400.0 * traj.flight_time * traj.flight_time,
            epsilon = 1e-12
        );
        assert_eq!(traj.landing_point, traj.last_point());
    }

    #[test]
    fn test_points_uniform_in_time() {
        let predictor = TrajectoryPredictor::default();
        let sample = reference_sample();
        let traj = predictor.predict(&sample);
        let physics = predictor.physics();
        let dt = traj.time_step();
        for (i, p) in traj.points.iter().enumerate().take(traj.len() - 1) {
            let expected = physics::spin_position_at(
                &sample.position,
                &sample.velocity,
                sample.spin_rate,
                dt * i as f64,
                physics,
            );
            assert_relative_eq!(p.x, expected.x, epsilon = 1e-9);
            assert_relative_eq!(p.y, expected.y, epsilon = 1e-9);
            assert_relative_eq!(p.z, expected.z, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_degenerate_on_ground_without_vertical_speed() {
        let predictor = TrajectoryPredictor::default();
        let sample = TrackingSample::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(30.0, 2.0, 0.0),
            1500.0,
            0,
        );
        let traj = predictor.predict(&sample);
        assert!(traj.degenerate);
        assert_eq!(traj.points.len(), 1);
        assert_eq!(traj.points[0], sample.position);
        assert_eq!(traj.flight_time, 0.0);
    }

    #[test]
    fn test_configurable_point_count() {
        let predictor = TrajectoryPredictor::new(
            PhysicsSettings::default(),
            PredictorSettings {
                num_points: 10,
                ..Default::default()
            },
        );
        assert_eq!(predictor.predict(&reference_sample()).len(), 10);

        let predictor = TrajectoryPredictor::new(
            PhysicsSettings::default(),
            PredictorSettings {
                num_points: 0,
                ..Default::default()
            },
        );
        let traj = predictor.predict(&reference_sample());
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.points[0], reference_sample().position);
    }

    #[test]
    fn test_spin_direction() {
        let predictor = TrajectoryPredictor::default();
        let mut sample = reference_sample();
        sample.velocity.y = 0.0;
        sample.spin_rate = 0.0;
        let straight = predictor.predict(&sample);
        assert_abs_diff_eq!(straight.landing_point.y, 1.2, epsilon = 1e-12);

        sample.spin_rate = -1800.0;
        let curved = predictor.predict(&sample);
        assert!(curved.landing_point.y < straight.landing_point.y);
    }

    #[test]
    fn test_stepwise_matches_closed_form_without_air() {
        let physics = PhysicsSettings {
            drag_coefficient: 0.0,
            magnus_k: 0.0,
            ..Default::default()
        };
        let sample = reference_sample();
        let closed = TrajectoryPredictor::new(physics.clone(), PredictorSettings::default())
            .predict(&sample);
        let stepwise = TrajectoryPredictor::new(
            physics,
            PredictorSettings {
                num_points: 60,
                integration: IntegrationMode::Stepwise { substeps: 200 },
            },
        )
        .predict(&sample);

        assert_eq!(stepwise.len(), 60);
        assert_eq!(stepwise.points[0], sample.position);
        assert_abs_diff_eq!(stepwise.flight_time, closed.flight_time, epsilon = 0.01);
        assert_abs_diff_eq!(stepwise.max_height, closed.max_height, epsilon = 0.05);
        assert_abs_diff_eq!(
            stepwise.landing_point.x,
            closed.landing_point.x,
            epsilon = 0.1
        );
        assert_eq!(stepwise.last_point().z, 0.0);
    }

    #[test]
    fn test_stepwise_drag_shortens_flight() {
        let sample = reference_sample();
        let settings = PredictorSettings {
            num_points: 60,
            integration: IntegrationMode::Stepwise { substeps: 50 },
        };
        let vacuum = TrajectoryPredictor::new(
            PhysicsSettings {
                drag_coefficient: 0.0,
                ..Default::default()
            },
            settings.clone(),
        )
        .predict(&sample);
        let with_air =
            TrajectoryPredictor::new(PhysicsSettings::default(), settings).predict(&sample);

        assert!(with_air.landing_point.x < vacuum.landing_point.x);
        assert!(with_air.max_height < vacuum.max_height);
    }

    #[test]
    fn test_stepwise_substeps_are_bounded() {
        let predictor = TrajectoryPredictor::new(
            PhysicsSettings::default(),
            PredictorSettings {
                num_points: usize::MAX,
                integration: IntegrationMode::Stepwise {
                    substeps: u32::MAX,
                },
            },
        );
        assert_eq!(predictor.num_points(), MAX_POINTS);
        assert_eq!(
            predictor.settings.integration,
            IntegrationMode::Stepwise {
                substeps: MAX_SUBSTEPS
            }
        );

        let mut predictor = predictor;
        predictor.update_settings(
            PhysicsSettings::default(),
            PredictorSettings {
                num_points: 60,
                integration: IntegrationMode::Stepwise { substeps: 0 },
            },
        );
        assert_eq!(
            predictor.settings.integration,
            IntegrationMode::Stepwise { substeps: 1 }
        );
        let trajectory = predictor.predict(&reference_sample());
        assert_eq!(trajectory.len(), 60);
    }
}
