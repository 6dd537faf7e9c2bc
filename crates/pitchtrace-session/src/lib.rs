//! The tracking session state machine.
//!
//! A [`TrackingSession`] accepts tracking samples, runs the predictor and the zone
//! analyzer on them, and exposes a play-head cursor that the renderer advances once
//! per frame.

use std::time::{Duration, Instant};

use pitchtrace_core::{
    debug_string, debug_value, EngineSettings, PredictedTrajectory, SessionState,
    TrackingSample, Vector3, ZoneAssessment,
};
use pitchtrace_trajectory::TrajectoryPredictor;
use pitchtrace_zone::ZoneAnalyzer;

/// Prediction is expected to fit well within a single frame.
const PREDICTION_BUDGET: Duration = Duration::from_millis(1);

/// Owns the session state, the active trajectory and the play-head.
///
/// There is exactly one active trajectory per session. A new sample always
/// replaces the current one, even in the middle of an animation.
#[derive(Debug)]
pub struct TrackingSession {
    predictor: TrajectoryPredictor,
    analyzer: ZoneAnalyzer,
    /// Where the ball rests while idle
    rest_position: Vector3,
    state: SessionState,
    latest_sample: Option<TrackingSample>,
    trajectory: Option<PredictedTrajectory>,
    /// Fractional play-head position, in points
    cursor: f64,
    play_head: usize,
    /// Assessment of the current trajectory, computed when it is predicted
    pending_assessment: Option<ZoneAssessment>,
    /// Assessment latched on entering `Settled`
    settled_assessment: Option<ZoneAssessment>,
    /// Incremented whenever the trajectory is replaced or discarded
    generation: u64,
    /// Number of animations aborted by a newer sample
    superseded: u64,
}

impl TrackingSession {
    pub fn new(
        predictor: TrajectoryPredictor,
        analyzer: ZoneAnalyzer,
        rest_position: Vector3,
    ) -> Self {
        Self {
            predictor,
            analyzer,
            rest_position,
            state: SessionState::Idle,
            latest_sample: None,
            trajectory: None,
            cursor: 0.0,
            play_head: 0,
            pending_assessment: None,
            settled_assessment: None,
            generation: 0,
            superseded: 0,
        }
    }

    /// Apply new engine settings. The current trajectory is kept, the new settings
    /// take effect with the next sample.
    pub fn update_settings(&mut self, settings: &EngineSettings) {
        self.predictor
            .update_settings(settings.physics.clone(), settings.predictor.clone());
        self.analyzer.update_settings(settings.zone.clone());
        self.rest_position = settings.render.rest_position;
    }

    /// Accept a new sample. See [`TrackingSession::submit_with_confidence`].
    pub fn submit(&mut self, sample: TrackingSample) -> SessionState {
        self.submit_with_confidence(sample, None)
    }

    /// Accept a new sample and predict its trajectory.
    ///
    /// Any running animation is aborted. The session passes through `Tracking` and
    /// `Predicting` and ends up `Animating`, or `Settled` directly if the trajectory
    /// is degenerate. `confidence` is forwarded to the zone analyzer.
    pub fn submit_with_confidence(
        &mut self,
        sample: TrackingSample,
        confidence: Option<f64>,
    ) -> SessionState {
        if self.state == SessionState::Animating {
            self.superseded += 1;
            log::debug!(
                "Sample at t={} supersedes animation at play-head {}",
                sample.timestamp,
                self.play_head
            );
        }
        if let Some(last) = &self.latest_sample {
            if sample.timestamp < last.timestamp {
                log::warn!(
                    "Sample timestamp went backwards ({} < {}), applying anyway",
                    sample.timestamp,
                    last.timestamp
                );
            }
        }

        self.set_state(SessionState::Tracking);
        self.generation += 1;
        self.trajectory = None;
        self.pending_assessment = None;
        self.settled_assessment = None;
        self.cursor = 0.0;
        self.play_head = 0;

        self.set_state(SessionState::Predicting);
        let start = Instant::now();
        let trajectory = self.predictor.predict(&sample);
        let elapsed = start.elapsed();
        if elapsed > PREDICTION_BUDGET {
            log::warn!("Prediction took {:?}, over budget", elapsed);
        }
        let assessment = self.analyzer.assess(&trajectory, confidence);

        debug_value("trajectory.flight_time", trajectory.flight_time);
        debug_value("trajectory.max_height", trajectory.max_height);
        debug_value("trajectory.points", trajectory.len() as f64);

        let degenerate = trajectory.degenerate || trajectory.len() <= 1;
        self.latest_sample = Some(sample);
        self.trajectory = Some(trajectory);
        self.pending_assessment = Some(assessment);

        if degenerate {
            log::debug!("Degenerate trajectory, skipping animation");
            self.settle();
        } else {
            self.set_state(SessionState::Animating);
        }
        self.state
    }

    /// Advance the play-head by `steps` points, which may be fractional.
    ///
    /// Has no effect unless the session is animating. The play-head never moves
    /// backwards. Returns the play-head after advancing.
    pub fn advance(&mut self, steps: f64) -> usize {
        if self.state != SessionState::Animating {
            return self.play_head;
        }
        let last_index = match &self.trajectory {
            Some(trajectory) => trajectory.last_index(),
            None => {
                log::error!("Animating without a trajectory");
                self.settle();
                return self.play_head;
            }
        };

        if steps.is_finite() && steps > 0.0 {
            self.cursor += steps;
        }
        self.play_head = self.play_head.max((self.cursor.floor() as usize).min(last_index));
        if self.play_head >= last_index {
            self.settle();
        }
        self.play_head
    }

    /// Return to `Idle`, discarding the trajectory, the play-head and the assessment.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.latest_sample = None;
        self.trajectory = None;
        self.pending_assessment = None;
        self.settled_assessment = None;
        self.cursor = 0.0;
        self.play_head = 0;
        self.set_state(SessionState::Idle);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn play_head(&self) -> usize {
        self.play_head
    }

    /// The fractional play-head position.
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn trajectory(&self) -> Option<&PredictedTrajectory> {
        self.trajectory.as_ref()
    }

    pub fn latest_sample(&self) -> Option<&TrackingSample> {
        self.latest_sample.as_ref()
    }

    /// The zone assessment, available once the session has settled.
    pub fn zone_assessment(&self) -> Option<ZoneAssessment> {
        self.settled_assessment
    }

    /// The assessment of the current trajectory, available as soon as it is
    /// predicted.
    pub fn pending_assessment(&self) -> Option<ZoneAssessment> {
        self.pending_assessment
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn superseded_count(&self) -> u64 {
        self.superseded
    }

    pub fn rest_position(&self) -> Vector3 {
        self.rest_position
    }

    /// Where the ball currently is: the trajectory point under the play-head, or the
    /// rest position when there is no trajectory.
    pub fn current_point(&self) -> Vector3 {
        match &self.trajectory {
            Some(trajectory) if self.state.has_trajectory() => trajectory.point_at(self.play_head),
            _ => self.rest_position,
        }
    }

    fn settle(&mut self) {
        self.settled_assessment = self.pending_assessment;
        if let Some(assessment) = &self.settled_assessment {
            debug_value("zone.id", assessment.zone_id as f64);
            debug_value("zone.confidence", assessment.confidence);
        }
        self.set_state(SessionState::Settled);
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            log::trace!("Session state {} -> {}", self.state, state);
        }
        self.state = state;
        debug_string("session.state", state.to_string());
    }
}
