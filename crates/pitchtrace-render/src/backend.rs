//! Defines the interface between the scene and a graphics backend.
//!
//! A backend owns the render context and every GPU-side resource. The scene only
//! holds [`ResourceHandle`]s and must release each of them through
//! [`RenderBackend::release`] before the context is torn down.

use std::fmt;

use anyhow::Result;
use nalgebra::UnitQuaternion;
use pitchtrace_core::{SessionState, Vector3};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// An opaque reference to a resource owned by a [`RenderBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle(pub u64);

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kinds of meshes making up the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[typeshare]
pub enum MeshKind {
    Ground,
    HomePlate,
    Mound,
    Light,
    /// One cell of the target grid
    ZoneCell { zone_id: u8 },
    Ball,
    /// Polyline along the drawn part of the trajectory
    TrajectoryPath,
    /// Unit arrow along `+x`, oriented and scaled by its transform
    VelocityGlyph,
}

/// Placement of a mesh in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vector3,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vector3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: Vector3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<f64>) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Appearance of a target grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[typeshare]
pub struct CellAppearance {
    pub active: bool,
    /// Additional emphasis on top of the active color, in `[0, 1]`
    pub emphasis: f64,
}

/// Summary of what was drawn in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[typeshare]
pub struct FrameSnapshot {
    pub frame: u64,
    pub state: SessionState,
    pub ball: Vector3,
    pub play_head: usize,
    /// Number of points in the drawn trajectory path
    pub path_points: usize,
    /// Currently highlighted zone, if any
    pub active_zone: Option<u8>,
    pub emphasis: f64,
    pub has_velocity_glyph: bool,
}

/// A graphics backend holding a render context.
pub trait RenderBackend {
    /// Create a mesh and return a handle to it.
    fn create_mesh(&mut self, kind: MeshKind) -> Result<ResourceHandle>;

    /// Set the transform of a mesh.
    fn set_transform(&mut self, handle: ResourceHandle, transform: Transform) -> Result<()>;

    /// Replace the vertices of a polyline mesh.
    fn upload_path(&mut self, handle: ResourceHandle, points: &[Vector3]) -> Result<()>;

    /// Set the appearance of a zone cell.
    fn set_cell_appearance(
        &mut self,
        handle: ResourceHandle,
        appearance: CellAppearance,
    ) -> Result<()>;

    /// Resize the drawing surface.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Draw the current scene.
    fn draw(&mut self, frame: &FrameSnapshot) -> Result<()>;

    /// Release a resource. Releasing an unknown handle does nothing.
    fn release(&mut self, handle: ResourceHandle);

    /// Whether the render context has been lost. All resources are invalid after a
    /// context loss.
    fn is_context_lost(&self) -> bool;

    /// Acquire a fresh render context after a loss.
    fn restore_context(&mut self) -> Result<()>;
}
