mod debug_info;
mod sample;
mod session_state;
mod settings;
mod trajectory;
mod zone;

pub use debug_info::*;
pub use sample::*;
pub use session_state::*;
pub use settings::*;
pub use trajectory::*;
pub use zone::*;

/// A 3D vector in field coordinates, in meters.
///
/// `x` points downrange from the release point towards the target plane, `y` is
/// lateral and `z` is vertical, with the ground plane at `z == 0`.
pub type Vector3 = nalgebra::Vector3<f64>;

/// A 2D vector, used for coordinates within the target plane (`y`, `z`).
pub type Vector2 = nalgebra::Vector2<f64>;
