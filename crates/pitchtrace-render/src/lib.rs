//! Scene management and the frame loop.
//!
//! The [`Engine`] owns a [`TrackingSession`] and a [`Scene`] drawn through a
//! [`RenderBackend`]. Samples are queued through a [`SampleSender`] and applied at
//! the start of the next frame.
//!
//! [`TrackingSession`]: pitchtrace_session::TrackingSession

mod backend;
mod engine;
mod headless;
mod scene;

pub use backend::*;
pub use engine::*;
pub use headless::*;
pub use scene::*;
