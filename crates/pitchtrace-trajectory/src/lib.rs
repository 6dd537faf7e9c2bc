//! Projectile model and trajectory prediction.
//!
//! [`physics`] holds the closed-form flight model as pure functions. The
//! [`TrajectoryPredictor`] discretizes that model into a [`PredictedTrajectory`] of
//! a fixed number of points.
//!
//! [`PredictedTrajectory`]: pitchtrace_core::PredictedTrajectory

pub mod physics;
mod predictor;
mod stepwise;

pub use predictor::TrajectoryPredictor;
