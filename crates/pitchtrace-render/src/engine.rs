use anyhow::{Context, Result};
use pitchtrace_core::{
    debug_value, EngineSettings, RawTrackingSample, SessionState, ZoneAssessment,
};
use pitchtrace_session::TrackingSession;
use pitchtrace_trajectory::TrajectoryPredictor;
use pitchtrace_zone::ZoneAnalyzer;
use tokio::sync::mpsc;

use crate::{FrameSnapshot, RenderBackend, Scene};

/// Commands queued for the next frame.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Sample(RawTrackingSample),
    Reset,
}

/// A handle for submitting samples to an [`Engine`] from any thread or task.
///
/// Commands are applied at the start of the engine's next frame.
#[derive(Debug, Clone)]
pub struct SampleSender {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl SampleSender {
    /// Queue a sample. If the engine is gone the sample is dropped.
    pub fn submit_sample(&self, sample: impl Into<RawTrackingSample>) {
        self.send(EngineCommand::Sample(sample.into()));
    }

    /// Queue a reset of the session.
    pub fn reset(&self) {
        self.send(EngineCommand::Reset);
    }

    fn send(&self, cmd: EngineCommand) {
        if let Err(err) = self.tx.send(cmd) {
            log::debug!("Engine is gone, dropping {:?}", err.0);
        }
    }
}

/// Drives a [`TrackingSession`] and draws it through a [`RenderBackend`], one
/// frame per [`Engine::tick`].
pub struct Engine<B: RenderBackend> {
    settings: EngineSettings,
    session: TrackingSession,
    backend: B,
    scene: Option<Scene>,
    tx: mpsc::UnboundedSender<EngineCommand>,
    rx: mpsc::UnboundedReceiver<EngineCommand>,
    frame: u64,
    width: u32,
    height: u32,
}

impl<B: RenderBackend> Engine<B> {
    /// Create an engine and build the scene in the backend's render context.
    pub fn new(settings: EngineSettings, mut backend: B) -> Result<Self> {
        let predictor =
            TrajectoryPredictor::new(settings.physics.clone(), settings.predictor.clone());
        let analyzer = ZoneAnalyzer::new(settings.zone.clone());
        let session = TrackingSession::new(predictor, analyzer, settings.render.rest_position);

        let (width, height) = (settings.render.width, settings.render.height);
        backend
            .resize(width, height)
            .context("Failed to size the render surface")?;
        let scene = Scene::build(&mut backend, settings.render.clone(), settings.zone.grid)
            .context("Failed to build the scene")?;

        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            settings,
            session,
            backend,
            scene: Some(scene),
            tx,
            rx,
            frame: 0,
            width,
            height,
        })
    }

    /// A handle for submitting samples from other tasks.
    pub fn sample_sender(&self) -> SampleSender {
        SampleSender {
            tx: self.tx.clone(),
        }
    }

    /// Queue a sample for the next frame.
    pub fn submit_sample(&self, sample: impl Into<RawTrackingSample>) {
        if self.tx.send(EngineCommand::Sample(sample.into())).is_err() {
            log::debug!("Engine queue closed, dropping sample");
        }
    }

    /// Return the session to `Idle` immediately, discarding any queued samples.
    pub fn reset(&mut self) {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            log::debug!("Reset discarded {} queued commands", dropped);
        }
        self.session.reset();
    }

    /// Run one frame. `dt` is the wall-clock time since the previous frame, in
    /// seconds.
    ///
    /// Returns the drawn frame, or `None` if nothing could be drawn. Renderer
    /// failures are logged and recovered from on later frames.
    pub fn tick(&mut self, dt: f64) -> Option<FrameSnapshot> {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let new_sample = self.apply_commands();
        if !new_sample {
            let steps = self.playback_steps(dt);
            self.session.advance(steps);
        }

        if self.backend.is_context_lost() || self.scene.is_none() {
            if let Err(err) = self.reinitialize() {
                log::error!("Failed to re-initialize the renderer: {:?}", err);
                return None;
            }
        }

        let frame = self.frame;
        let snapshot = match self.draw(frame, dt) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::error!("Failed to draw frame {}: {:?}", frame, err);
                // Rebuilt on the next frame
                if let Some(scene) = self.scene.take() {
                    scene.dispose(&mut self.backend);
                }
                return None;
            }
        };
        self.frame += 1;
        debug_value("engine.frame", self.frame as f64);
        Some(snapshot)
    }

    /// Resize the surface. The renderer is rebuilt from scratch, the session is
    /// kept.
    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return Ok(());
        }
        log::info!("Resizing renderer to {}x{}", width, height);
        self.width = width;
        self.height = height;
        self.reinitialize()
    }

    /// Apply new settings. The session keeps its trajectory, which is replaced
    /// with the next sample. The scene is rebuilt for the new grid and size.
    pub fn update_settings(&mut self, settings: EngineSettings) -> Result<()> {
        self.session.update_settings(&settings);
        self.width = settings.render.width;
        self.height = settings.render.height;
        self.settings = settings;
        log::info!("Engine settings updated");
        self.reinitialize()
    }

    pub fn get_zone_assessment(&self) -> Option<ZoneAssessment> {
        self.session.zone_assessment()
    }

    pub fn get_session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Number of frames drawn so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Release every scene resource and hand back the backend.
    pub fn teardown(mut self) -> B {
        if let Some(scene) = self.scene.take() {
            scene.dispose(&mut self.backend);
        }
        self.rx.close();
        log::debug!("Engine torn down after {} frames", self.frame);
        self.backend
    }

    /// Drain the command queue. Only the newest sample is applied; a reset discards
    /// samples queued before it. Returns whether a sample was applied.
    fn apply_commands(&mut self) -> bool {
        let mut latest = None;
        let mut reset = false;
        let mut superseded = 0;
        while let Ok(cmd) = self.rx.try_recv() {
            match cmd {
                EngineCommand::Sample(sample) => {
                    if latest.replace(sample).is_some() {
                        superseded += 1;
                    }
                }
                EngineCommand::Reset => {
                    if latest.take().is_some() {
                        superseded += 1;
                    }
                    reset = true;
                }
            }
        }
        if superseded > 0 {
            log::debug!("Dropped {} samples superseded within one frame", superseded);
        }

        if reset {
            self.session.reset();
        }
        match latest {
            Some(raw) => {
                let sample = raw.resolve(&self.settings.defaults);
                self.session.submit(sample);
                true
            }
            None => false,
        }
    }

    /// Number of trajectory points to advance over `dt` seconds.
    fn playback_steps(&self, dt: f64) -> f64 {
        let Some(trajectory) = self.session.trajectory() else {
            return 0.0;
        };
        let rate = match self.settings.render.animation_duration {
            Some(duration) if duration > 0.0 => trajectory.last_index() as f64 / duration,
            _ => {
                let time_step = trajectory.time_step();
                if time_step > 0.0 {
                    1.0 / time_step
                } else {
                    trajectory.last_index() as f64
                }
            }
        };
        dt * rate
    }

    fn draw(&mut self, frame: u64, dt: f64) -> Result<FrameSnapshot> {
        let scene = self.scene.as_mut().context("No scene")?;
        let snapshot = scene.update(&mut self.backend, &self.session, frame, dt)?;
        self.backend.draw(&snapshot)?;
        Ok(snapshot)
    }

    /// Dispose of the scene and rebuild it in a fresh render context.
    fn reinitialize(&mut self) -> Result<()> {
        if let Some(scene) = self.scene.take() {
            scene.dispose(&mut self.backend);
        }
        if self.backend.is_context_lost() {
            log::warn!("Render context lost, restoring");
            self.backend.restore_context()?;
        }
        self.backend.resize(self.width, self.height)?;
        let scene = Scene::build(
            &mut self.backend,
            self.settings.render.clone(),
            self.settings.zone.grid,
        )?;
        self.scene = Some(scene);
        log::debug!("Renderer re-initialized at {}x{}", self.width, self.height);
        Ok(())
    }
}
