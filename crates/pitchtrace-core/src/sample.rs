use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use typeshare::typeshare;

use crate::Vector3;

/// A single ball observation from the tracking source.
///
/// Samples are immutable once created. Within a session, timestamps are expected to
/// be monotonically non-decreasing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[typeshare]
pub struct TrackingSample {
    /// Position of the ball in meters, in field coordinates
    pub position: Vector3,
    /// Velocity of the ball in m/s, in field coordinates
    pub velocity: Vector3,
    /// Spin rate of the ball in rev/min. Positive spin deflects towards `+y`.
    pub spin_rate: f64,
    /// Capture timestamp in milliseconds, as reported by the tracking source
    pub timestamp: u64,
}

impl TrackingSample {
    pub fn new(position: Vector3, velocity: Vector3, spin_rate: f64, timestamp: u64) -> Self {
        Self {
            position,
            velocity,
            spin_rate,
            timestamp,
        }
    }
}

/// Values substituted for fields missing from a [`RawTrackingSample`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[typeshare]
pub struct SampleDefaults {
    pub position: Vector3,
    pub velocity: Vector3,
    pub spin_rate: f64,
}

impl Default for SampleDefaults {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 1.2, 18.4),
            velocity: Vector3::new(35.0, -12.0, 25.0),
            spin_rate: 2400.0,
        }
    }
}

/// A sample as delivered by the tracking collaborator, where every field may be
/// missing.
///
/// Deserialization is lenient: a field of the wrong shape (eg. a two-component
/// position or a string spin rate) is read as missing and logged.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[typeshare]
pub struct RawTrackingSample {
    #[serde(default, deserialize_with = "lenient")]
    pub position: Option<Vector3>,
    #[serde(default, deserialize_with = "lenient")]
    pub velocity: Option<Vector3>,
    #[serde(default, alias = "spin", deserialize_with = "lenient")]
    pub spin_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<u64>,
}

impl RawTrackingSample {
    /// Read a sample from an arbitrary JSON value. Anything that is not an object
    /// yields an empty sample.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value(value) {
            Ok(sample) => sample,
            Err(err) => {
                log::warn!("Unreadable tracking sample ({}), using defaults", err);
                Self::default()
            }
        }
    }

    /// Parse a JSON array of samples. Only a document that is not an array is an
    /// error, malformed records are read as far as possible.
    pub fn parse_batch(json: &str) -> Result<Vec<Self>> {
        let values: Vec<Value> =
            serde_json::from_str(json).context("Expected a JSON array of samples")?;
        Ok(values.into_iter().map(Self::from_value).collect())
    }

    /// Resolve into a [`TrackingSample`], substituting defaults for missing or
    /// non-finite fields. This never fails.
    pub fn resolve(&self, defaults: &SampleDefaults) -> TrackingSample {
        let position = match self.position {
            Some(p) if is_finite(&p) => p,
            Some(p) => {
                log::warn!("Non-finite sample position {:?}, using default", p);
                defaults.position
            }
            None => {
                log::warn!("Sample without position, using default");
                defaults.position
            }
        };
        let velocity = match self.velocity {
            Some(v) if is_finite(&v) => v,
            Some(v) => {
                log::warn!("Non-finite sample velocity {:?}, using default", v);
                defaults.velocity
            }
            None => {
                log::warn!("Sample without velocity, using default");
                defaults.velocity
            }
        };
        let spin_rate = match self.spin_rate {
            Some(s) if s.is_finite() => s,
            _ => {
                log::warn!("Sample without usable spin rate, using default");
                defaults.spin_rate
            }
        };

        TrackingSample {
            position,
            velocity,
            spin_rate,
            timestamp: self.timestamp.unwrap_or(0),
        }
    }
}

impl From<TrackingSample> for RawTrackingSample {
    fn from(sample: TrackingSample) -> Self {
        Self {
            position: Some(sample.position),
            velocity: Some(sample.velocity),
            spin_rate: Some(sample.spin_rate),
            timestamp: Some(sample.timestamp),
        }
    }
}

/// Deserialize an optional field, treating a value of the wrong shape as missing.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value.clone()) {
        Ok(v) => Ok(Some(v)),
        Err(err) => {
            log::warn!("Ignoring malformed sample field {}: {}", value, err);
            Ok(None)
        }
    }
}

fn is_finite(v: &Vector3) -> bool {
    v.iter().all(|c| c.is_finite())
}
