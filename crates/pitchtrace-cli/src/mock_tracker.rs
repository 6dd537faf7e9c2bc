use std::time::Duration;

use pitchtrace_core::{RawTrackingSample, TrackingSample, Vector3};
use pitchtrace_render::SampleSender;
use rand::{
    distributions::{Distribution, Uniform},
    rngs::StdRng,
    SeedableRng,
};
use tokio::sync::broadcast;

/// Release point of the mock pitcher, in meters.
const RELEASE_POINT: [f64; 3] = [0.0, 0.0, 1.8];

/// A mock tracking source that throws jittered pitches towards the plate.
pub struct MockTracker {
    rng: StdRng,
    speed: Uniform<f64>,
    lateral: Uniform<f64>,
    vertical: Uniform<f64>,
    spin: Uniform<f64>,
    start: tokio::time::Instant,
}

impl MockTracker {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            speed: Uniform::new(33.0, 42.0),
            lateral: Uniform::new(-0.6, 0.6),
            vertical: Uniform::new(-0.5, 1.5),
            spin: Uniform::new(-2600.0, 2600.0),
            start: tokio::time::Instant::now(),
        }
    }

    /// Spawn a task sending one pitch every `interval` until shutdown.
    pub fn spawn(
        mut self,
        sender: SampleSender,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = timer.tick() => {
                        let sample = self.pitch();
                        tracing::debug!(
                            "Mock pitch at {:.1} m/s, spin {:.0} rpm",
                            sample.velocity.norm(),
                            sample.spin_rate
                        );
                        sender.submit_sample(sample);
                    }
                }
            }
            tracing::debug!("Mock tracker stopped");
        });
    }

    /// Generate the next pitch.
    pub fn pitch(&mut self) -> TrackingSample {
        let velocity = Vector3::new(
            self.speed.sample(&mut self.rng),
            self.lateral.sample(&mut self.rng),
            self.vertical.sample(&mut self.rng),
        );
        TrackingSample::new(
            Vector3::from(RELEASE_POINT),
            velocity,
            self.spin.sample(&mut self.rng),
            self.start.elapsed().as_millis() as u64,
        )
    }
}

/// Replay recorded samples from a JSON file, one every `interval`.
pub fn spawn_replay(
    samples: Vec<RawTrackingSample>,
    sender: SampleSender,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let total = samples.len();
        for (idx, sample) in samples.into_iter().enumerate() {
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                _ = timer.tick() => {
                    tracing::debug!("Replaying sample {}/{}", idx + 1, total);
                    sender.submit_sample(sample);
                }
            }
        }
        tracing::info!("Replayed all {} samples", total);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_pitches_repeat() {
        let mut a = MockTracker::new(Some(7));
        let mut b = MockTracker::new(Some(7));
        for _ in 0..5 {
            let (pa, pb) = (a.pitch(), b.pitch());
            assert_eq!(pa.velocity, pb.velocity);
            assert_eq!(pa.spin_rate, pb.spin_rate);
        }
    }

    #[tokio::test]
    async fn test_pitches_head_towards_plate() {
        let mut tracker = MockTracker::new(Some(1));
        for _ in 0..50 {
            let pitch = tracker.pitch();
            assert!(pitch.velocity.x >= 33.0 && pitch.velocity.x < 42.0);
            assert_eq!(pitch.position, Vector3::new(0.0, 0.0, 1.8));
        }
    }
}
