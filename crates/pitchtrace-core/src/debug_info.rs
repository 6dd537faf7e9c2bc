//! Process-wide telemetry for inspecting a running engine.
//!
//! Components publish keyed values with [`debug_value`] and [`debug_string`]. The
//! values are collected by a single [`DebugSubscriber`] task. Publishing before a
//! subscriber exists is a no-op, so libraries can publish unconditionally.

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock, RwLock},
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use typeshare::typeshare;

static TELEMETRY: OnceLock<mpsc::UnboundedSender<(String, DebugValue)>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[typeshare]
pub enum DebugValue {
    Number(f64),
    String(String),
}

/// Latest value per key.
///
/// Keys are `snake_case` segments separated by `.`, grouped by the publishing
/// component: `session.state`, `trajectory.flight_time`, `zone.id`, `engine.frame`.
#[typeshare]
pub type DebugMap = HashMap<String, DebugValue>;

/// Collects published values into a shared [`DebugMap`].
#[derive(Clone)]
pub struct DebugSubscriber {
    values: Arc<RwLock<DebugMap>>,
}

impl DebugSubscriber {
    /// Spawn the collector task on the current tokio runtime.
    ///
    /// Returns `None` if a subscriber already exists in this process.
    pub fn spawn() -> Option<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, DebugValue)>();
        if TELEMETRY.set(tx).is_err() {
            log::warn!("Debug subscriber already spawned");
            return None;
        }

        let values = Arc::new(RwLock::new(DebugMap::new()));
        let collected = Arc::clone(&values);
        tokio::spawn(async move {
            while let Some((key, value)) = rx.recv().await {
                match collected.write() {
                    Ok(mut map) => {
                        map.insert(key, value);
                    }
                    Err(_) => break,
                }
            }
        });
        Some(Self { values })
    }

    /// A copy of the latest values.
    pub fn get_copy(&self) -> DebugMap {
        self.values.read().map(|map| map.clone()).unwrap_or_default()
    }
}

fn publish(key: impl Into<String>, value: DebugValue) {
    if let Some(tx) = TELEMETRY.get() {
        // The collector only stops with the runtime
        let _ = tx.send((key.into(), value));
    }
}

/// Publish a numeric value.
pub fn debug_value(key: impl Into<String>, value: f64) {
    publish(key, DebugValue::Number(value));
}

/// Publish a string value.
pub fn debug_string(key: impl Into<String>, value: impl Into<String>) {
    publish(key, DebugValue::String(value.into()));
}
