use std::fmt;

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// The state of a tracking session.
///
/// The normal cycle is `Idle -> Tracking -> Predicting -> Animating -> Settled`,
/// after which the next sample starts a new cycle at `Tracking`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
#[typeshare]
pub enum SessionState {
    /// No active sample, the ball rests at the release point
    #[default]
    Idle,
    /// A new sample has been accepted
    Tracking,
    /// The trajectory for the current sample is being computed
    Predicting,
    /// The ball is moving along the predicted trajectory
    Animating,
    /// The trajectory is fully drawn and the zone assessment is latched
    Settled,
}

impl SessionState {
    /// Whether a trajectory exists in this state.
    pub fn has_trajectory(&self) -> bool {
        matches!(self, SessionState::Animating | SessionState::Settled)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Tracking => "tracking",
            SessionState::Predicting => "predicting",
            SessionState::Animating => "animating",
            SessionState::Settled => "settled",
        };
        write!(f, "{}", name)
    }
}
