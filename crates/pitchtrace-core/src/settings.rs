use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

use crate::{GridBounds, SampleDefaults, Vector3};

/// Physical constants used by the projectile model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[typeshare]
pub struct PhysicsSettings {
    /// Gravitational acceleration in m/s².
    pub gravity: f64,
    /// Drag coefficient of the ball (dimensionless).
    pub drag_coefficient: f64,
    /// Air density in kg/m³.
    pub air_density: f64,
    /// Ball radius in m.
    pub ball_radius: f64,
    /// Ball mass in kg.
    pub ball_mass: f64,
    /// Empirical Magnus constant, in m/(rpm·s²).
    pub magnus_k: f64,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            drag_coefficient: 0.3,
            air_density: 1.225,
            ball_radius: 0.0366,
            ball_mass: 0.145,
            magnus_k: 1e-5,
        }
    }
}

/// How the predictor evaluates the flight path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "data")]
#[typeshare]
pub enum IntegrationMode {
    /// Closed-form solution with a multiplicative drag correction.
    #[default]
    ClosedForm,
    /// Explicit Euler integration of gravity, quadratic drag and Magnus force.
    Stepwise {
        /// Number of integration steps between two output points
        substeps: u32,
    },
}

/// Settings for the trajectory predictor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[typeshare]
pub struct PredictorSettings {
    /// Number of points in a non-degenerate trajectory.
    pub num_points: usize,
    pub integration: IntegrationMode,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            num_points: 60,
            integration: IntegrationMode::ClosedForm,
        }
    }
}

/// Settings for the zone analyzer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[typeshare]
pub struct ZoneSettings {
    pub grid: GridBounds,
}

/// Settings for the scene and the frame loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[typeshare]
pub struct RenderSettings {
    /// Initial surface width in pixels.
    pub width: u32,
    /// Initial surface height in pixels.
    pub height: u32,
    /// Wall-clock duration of a full trajectory animation, in seconds. When `None`,
    /// the animation plays back in real time (the trajectory's flight time).
    pub animation_duration: Option<f64>,
    /// Period of the active zone cell's pulse, in seconds.
    pub pulse_period: f64,
    /// Maximum emphasis of the active zone cell, in `[0, 1]`.
    pub pulse_amplitude: f64,
    /// Where the ball rests while the session is idle.
    pub rest_position: Vector3,
    /// Length of the velocity glyph per m/s of ball speed, in meters.
    pub velocity_glyph_scale: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            animation_duration: Some(1.0),
            pulse_period: 1.0,
            pulse_amplitude: 0.35,
            rest_position: Vector3::new(0.0, 0.0, 1.8),
            velocity_glyph_scale: 0.05,
        }
    }
}

/// Settings for the whole engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[typeshare]
pub struct EngineSettings {
    pub physics: PhysicsSettings,
    pub predictor: PredictorSettings,
    pub zone: ZoneSettings,
    pub render: RenderSettings,
    pub defaults: SampleDefaults,
}

impl EngineSettings {
    /// Load the engine settings from a file, or store the default settings if the file
    /// does not exist. A file that cannot be parsed yields the default settings.
    pub fn load_or_insert(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => Ok(settings),
                Err(err) => {
                    log::error!("Failed to parse engine settings: {}", err);
                    Ok(Self::default())
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                fs::write(path, serde_json::to_string_pretty(&settings)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                log::info!("Wrote default engine settings to {}", path.display());
                Ok(settings)
            }
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        }
    }

    /// Store the engine settings in the given file.
    pub async fn store(&self, path: impl AsRef<Path>) {
        let contents = match serde_json::to_string_pretty(self) {
            Ok(contents) => contents,
            Err(err) => {
                log::error!("Failed to serialize engine settings: {}", err);
                return;
            }
        };
        if let Err(err) = tokio::fs::write(path, contents).await {
            log::error!("Failed to write engine settings: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_or_insert_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = EngineSettings::load_or_insert(&path).unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert!(path.exists());

        let reloaded = EngineSettings::load_or_insert(&path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"physics": {"magnus_k": 0.0}, "predictor": {"num_points": 30}}"#,
        )
        .unwrap();

        let settings = EngineSettings::load_or_insert(&path).unwrap();
        assert_eq!(settings.physics.magnus_k, 0.0);
        assert_eq!(settings.physics.gravity, 9.81);
        assert_eq!(settings.predictor.num_points, 30);
        assert_eq!(settings.render, RenderSettings::default());
    }

    #[test]
    fn test_load_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let settings = EngineSettings::load_or_insert(&path).unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_integration_mode_format() {
        let mode = IntegrationMode::Stepwise { substeps: 8 };
        let json = serde_json::to_string(&mode).unwrap();
        assert_eq!(json, r#"{"type":"Stepwise","data":{"substeps":8}}"#);
    }

    #[tokio::test]
    async fn test_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = EngineSettings::default();
        settings.render.pulse_period = 2.0;
        settings.store(&path).await;

        let loaded = EngineSettings::load_or_insert(&path).unwrap();
        assert_eq!(loaded.render.pulse_period, 2.0);
    }
}
