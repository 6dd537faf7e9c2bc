use std::f64::consts::PI;

use anyhow::Result;
use nalgebra::UnitQuaternion;
use pitchtrace_core::{
    GridBounds, RenderSettings, SessionState, TrackingSample, Vector3, GRID_DIVISIONS,
};
use pitchtrace_session::TrackingSession;

use crate::{CellAppearance, FrameSnapshot, MeshKind, RenderBackend, ResourceHandle, Transform};

/// Half extent of the ground plane, in meters
const GROUND_HALF_EXTENT: f64 = 60.0;
/// Radius of the pitcher's mound, in meters
const MOUND_RADIUS: f64 = 2.74;
/// Width of home plate, in meters
const PLATE_WIDTH: f64 = 0.4318;
/// Rendered ball radius, in meters
const BALL_RADIUS: f64 = 0.0366;

/// The scene graph: static field geometry plus the per-session objects.
///
/// Only the scene mutates its objects. It reads the session each frame and brings
/// the backend resources in line with it.
#[derive(Debug)]
pub struct Scene {
    settings: RenderSettings,
    grid: GridBounds,
    /// Ground, plate, mound and light
    static_meshes: Vec<ResourceHandle>,
    /// Zone cells, indexed by `zone_id - 1`
    cells: Vec<ResourceHandle>,
    ball: ResourceHandle,
    path: ResourceHandle,
    /// Points currently uploaded to the path mesh
    path_points: Vec<Vector3>,
    /// Session generation the path mesh was built for
    path_generation: Option<u64>,
    glyph: Option<ResourceHandle>,
    /// Session generation the velocity glyph was built for
    glyph_generation: Option<u64>,
    /// Highlighted zone and the session generation it belongs to
    highlight: Option<(u8, u64)>,
    /// Time since the highlight was applied, in seconds
    pulse_time: f64,
    emphasis: f64,
}

impl Scene {
    /// Build the scene in the backend's current render context.
    ///
    /// On failure, every resource created so far is released again.
    pub fn build(
        backend: &mut dyn RenderBackend,
        settings: RenderSettings,
        grid: GridBounds,
    ) -> Result<Self> {
        let mut created = Vec::new();
        match Self::build_inner(backend, settings, grid, &mut created) {
            Ok(scene) => Ok(scene),
            Err(err) => {
                for handle in created {
                    backend.release(handle);
                }
                Err(err)
            }
        }
    }

    fn build_inner(
        backend: &mut dyn RenderBackend,
        settings: RenderSettings,
        grid: GridBounds,
        created: &mut Vec<ResourceHandle>,
    ) -> Result<Self> {
        let static_meshes = vec![
            create(
                backend,
                created,
                MeshKind::Ground,
                Transform::default().with_scale(Vector3::new(
                    GROUND_HALF_EXTENT,
                    GROUND_HALF_EXTENT,
                    1.0,
                )),
            )?,
            create(
                backend,
                created,
                MeshKind::HomePlate,
                Transform::from_translation(Vector3::new(grid.plane_x, 0.0, 0.0))
                    .with_scale(Vector3::new(PLATE_WIDTH, PLATE_WIDTH, 1.0)),
            )?,
            create(
                backend,
                created,
                MeshKind::Mound,
                Transform::default().with_scale(Vector3::new(MOUND_RADIUS, MOUND_RADIUS, 0.25)),
            )?,
            create(
                backend,
                created,
                MeshKind::Light,
                Transform::from_translation(Vector3::new(grid.plane_x / 2.0, -10.0, 30.0)),
            )?,
        ];

        let mut cells = Vec::with_capacity(GRID_DIVISIONS * GRID_DIVISIONS);
        for zone_id in 1..=(GRID_DIVISIONS * GRID_DIVISIONS) as u8 {
            let center = grid.zone_center(zone_id).unwrap_or_else(|| grid.center());
            let handle = create(
                backend,
                created,
                MeshKind::ZoneCell { zone_id },
                Transform::from_translation(Vector3::new(grid.plane_x, center.x, center.y))
                    .with_scale(Vector3::new(1.0, grid.cell_width(), grid.cell_height())),
            )?;
            backend.set_cell_appearance(handle, CellAppearance::default())?;
            cells.push(handle);
        }

        let ball = create(
            backend,
            created,
            MeshKind::Ball,
            Transform::from_translation(settings.rest_position)
                .with_scale(Vector3::new(BALL_RADIUS, BALL_RADIUS, BALL_RADIUS)),
        )?;
        let path = create(backend, created, MeshKind::TrajectoryPath, Transform::default())?;

        log::debug!("Scene built with {} resources", created.len());

        Ok(Self {
            settings,
            grid,
            static_meshes,
            cells,
            ball,
            path,
            path_points: Vec::new(),
            path_generation: None,
            glyph: None,
            glyph_generation: None,
            highlight: None,
            pulse_time: 0.0,
            emphasis: 0.0,
        })
    }

    /// Bring the scene in line with `session` and describe the resulting frame.
    ///
    /// `dt` is the time since the previous frame, in seconds.
    pub fn update(
        &mut self,
        backend: &mut dyn RenderBackend,
        session: &TrackingSession,
        frame: u64,
        dt: f64,
    ) -> Result<FrameSnapshot> {
        let ball = session.current_point();
        backend.set_transform(
            self.ball,
            Transform::from_translation(ball)
                .with_scale(Vector3::new(BALL_RADIUS, BALL_RADIUS, BALL_RADIUS)),
        )?;

        self.update_path(backend, session)?;
        self.update_glyph(backend, session)?;
        self.update_highlight(backend, session, dt)?;

        Ok(FrameSnapshot {
            frame,
            state: session.state(),
            ball,
            play_head: session.play_head(),
            path_points: self.path_points.len(),
            active_zone: self.highlight.map(|(zone_id, _)| zone_id),
            emphasis: self.emphasis,
            has_velocity_glyph: self.glyph.is_some(),
        })
    }

    /// Extend the path mesh up to the play-head. The path is rebuilt from scratch
    /// for a new trajectory and never shrinks otherwise.
    fn update_path(
        &mut self,
        backend: &mut dyn RenderBackend,
        session: &TrackingSession,
    ) -> Result<()> {
        let generation = session.generation();
        let mut dirty = false;
        if self.path_generation != Some(generation) {
            self.path_points.clear();
            self.path_generation = Some(generation);
            dirty = true;
        }

        if let Some(trajectory) = session.trajectory() {
            if session.state().has_trajectory() {
                let target = (session.play_head() + 1).min(trajectory.len());
                if self.path_points.len() < target {
                    self.path_points
                        .extend_from_slice(&trajectory.points[self.path_points.len()..target]);
                    dirty = true;
                }
            }
        }

        if dirty {
            backend.upload_path(self.path, &self.path_points)?;
        }
        Ok(())
    }

    /// Rebuild the velocity glyph whenever the latest sample changes.
    fn update_glyph(
        &mut self,
        backend: &mut dyn RenderBackend,
        session: &TrackingSession,
    ) -> Result<()> {
        let generation = session.generation();
        if self.glyph_generation == Some(generation) {
            return Ok(());
        }

        if let Some(old) = self.glyph.take() {
            backend.release(old);
        }
        if let Some(sample) = session.latest_sample() {
            let handle = backend.create_mesh(MeshKind::VelocityGlyph)?;
            self.glyph = Some(handle);
            backend.set_transform(handle, self.glyph_transform(sample))?;
        }
        self.glyph_generation = Some(generation);
        Ok(())
    }

    fn glyph_transform(&self, sample: &TrackingSample) -> Transform {
        let velocity = sample.velocity;
        let length = velocity.norm() * self.settings.velocity_glyph_scale;
        let rotation = UnitQuaternion::rotation_between(&Vector3::x(), &velocity)
            .unwrap_or_else(|| {
                if velocity.x < 0.0 {
                    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI)
                } else {
                    UnitQuaternion::identity()
                }
            });
        Transform::from_translation(sample.position)
            .with_rotation(rotation)
            .with_scale(Vector3::new(length, 1.0, 1.0))
    }

    /// Highlight the settled zone with a pulse, and clear the highlight when the
    /// session moves on.
    fn update_highlight(
        &mut self,
        backend: &mut dyn RenderBackend,
        session: &TrackingSession,
        dt: f64,
    ) -> Result<()> {
        let target = match (session.state(), session.zone_assessment()) {
            (SessionState::Settled, Some(assessment)) if assessment.is_strike() => {
                Some((assessment.zone_id, session.generation()))
            }
            _ => None,
        };

        if target != self.highlight {
            for (idx, handle) in self.cells.iter().enumerate() {
                let active = target.map_or(false, |(zone_id, _)| zone_id as usize == idx + 1);
                backend.set_cell_appearance(
                    *handle,
                    CellAppearance {
                        active,
                        emphasis: 0.0,
                    },
                )?;
            }
            self.highlight = target;
            self.pulse_time = 0.0;
            self.emphasis = 0.0;
            return Ok(());
        }

        if let Some((zone_id, _)) = self.highlight {
            if dt.is_finite() && dt > 0.0 {
                self.pulse_time += dt;
            }
            self.emphasis = pulse(
                self.pulse_time,
                self.settings.pulse_period,
                self.settings.pulse_amplitude,
            );
            if let Some(handle) = self.cells.get(zone_id as usize - 1) {
                backend.set_cell_appearance(
                    *handle,
                    CellAppearance {
                        active: true,
                        emphasis: self.emphasis,
                    },
                )?;
            }
        }
        Ok(())
    }

    pub fn grid(&self) -> &GridBounds {
        &self.grid
    }

    /// Number of backend resources held by the scene.
    pub fn resource_count(&self) -> usize {
        self.static_meshes.len() + self.cells.len() + 2 + usize::from(self.glyph.is_some())
    }

    /// Release every resource held by the scene.
    pub fn dispose(self, backend: &mut dyn RenderBackend) {
        let count = self.resource_count();
        for handle in self
            .static_meshes
            .into_iter()
            .chain(self.cells)
            .chain([self.ball, self.path])
            .chain(self.glyph)
        {
            backend.release(handle);
        }
        log::debug!("Scene disposed, released {} resources", count);
    }
}

/// Create a mesh and place it, recording the handle in `created`.
fn create(
    backend: &mut dyn RenderBackend,
    created: &mut Vec<ResourceHandle>,
    kind: MeshKind,
    transform: Transform,
) -> Result<ResourceHandle> {
    let handle = backend.create_mesh(kind)?;
    created.push(handle);
    backend.set_transform(handle, transform)?;
    Ok(handle)
}

/// Emphasis of the pulsing cell `t` seconds into the pulse: a raised cosine with
/// the given period, bounded to `[0, amplitude]`.
pub fn pulse(t: f64, period: f64, amplitude: f64) -> f64 {
    let amplitude = amplitude.clamp(0.0, 1.0);
    if period <= 0.0 {
        return amplitude;
    }
    amplitude * 0.5 * (1.0 - (2.0 * PI * t / period).cos())
}
