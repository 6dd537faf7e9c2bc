use std::path::PathBuf;

use pitchtrace_core::EngineSettings;

/// Polls a settings file and yields the new settings whenever its contents change.
pub(crate) struct SettingsWatcher {
    path: PathBuf,
    last_contents: Option<String>,
}

impl SettingsWatcher {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_contents: None,
        }
    }

    /// Remember the current contents without reporting them as a change.
    pub(crate) async fn prime(&mut self) {
        self.last_contents = tokio::fs::read_to_string(&self.path).await.ok();
    }

    /// Returns the new settings if the file changed and parses. A file that fails to
    /// parse is reported once and the current settings stay in place.
    pub(crate) async fn poll(&mut self) -> Option<EngineSettings> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) => {
                tracing::debug!("Cannot read {}: {}", self.path.display(), err);
                return None;
            }
        };
        if self.last_contents.as_deref() == Some(contents.as_str()) {
            return None;
        }

        let parsed = serde_json::from_str(&contents);
        self.last_contents = Some(contents);
        match parsed {
            Ok(settings) => {
                tracing::info!("Reloading settings from {}", self.path.display());
                Some(settings)
            }
            Err(err) => {
                tracing::warn!(
                    "Ignoring invalid settings in {}: {}",
                    self.path.display(),
                    err
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_changed_settings_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = EngineSettings::load_or_insert(&path).unwrap();

        let mut watcher = SettingsWatcher::new(path.clone());
        watcher.prime().await;
        assert_eq!(watcher.poll().await, None);

        let mut changed = settings.clone();
        changed.predictor.num_points = 30;
        changed.store(&path).await;
        assert_eq!(watcher.poll().await, Some(changed));
        assert_eq!(watcher.poll().await, None);
    }

    #[tokio::test]
    async fn test_invalid_file_keeps_current_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut watcher = SettingsWatcher::new(path.clone());
        assert_eq!(watcher.poll().await, None);

        tokio::fs::write(&path, "{\"predictor\": ").await.unwrap();
        assert_eq!(watcher.poll().await, None);

        tokio::fs::write(&path, r#"{"render": {"width": 800}}"#)
            .await
            .unwrap();
        let settings = watcher.poll().await.unwrap();
        assert_eq!(settings.render.width, 800);
        assert_eq!(settings.physics, EngineSettings::default().physics);
    }
}
