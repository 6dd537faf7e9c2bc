use anyhow::Result;
use pitchtrace_core::{DebugSubscriber, DebugValue, EngineSettings, RawTrackingSample};
use pitchtrace_render::{Engine, HeadlessBackend};
use tokio::{sync::broadcast, time::Duration};

use crate::{
    mock_tracker::{self, MockTracker},
    settings_watch::SettingsWatcher,
    Args, SourceType,
};

const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Run the engine until shutdown, or until the requested number of frames has been
/// drawn.
pub async fn run(args: Args, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let settings = match &args.settings {
        Some(path) => EngineSettings::load_or_insert(path)?,
        None => EngineSettings::default(),
    };
    let mut watcher = match &args.settings {
        Some(path) => {
            let mut watcher = SettingsWatcher::new(path.clone());
            watcher.prime().await;
            Some(watcher)
        }
        None => None,
    };
    let debug = DebugSubscriber::spawn();

    let backend = HeadlessBackend::new(settings.render.width, settings.render.height);
    let mut engine = Engine::new(settings, backend)?;
    let sender = engine.sample_sender();

    let interval = Duration::from_millis(args.interval_ms.max(1));
    match args.source {
        SourceType::Mock => {
            MockTracker::new(args.seed).spawn(sender, interval, shutdown_rx.resubscribe())
        }
        SourceType::File => {
            let Some(path) = &args.samples else {
                anyhow::bail!("--samples is required with --source file");
            };
            let contents = tokio::fs::read_to_string(path).await?;
            let samples = RawTrackingSample::parse_batch(&contents)?;
            mock_tracker::spawn_replay(samples, sender, interval, shutdown_rx.resubscribe());
        }
    }

    let fps = if args.fps > 0.0 { args.fps } else { 60.0 };
    let dt = 1.0 / fps;
    let mut timer = tokio::time::interval(Duration::from_secs_f64(dt));
    let mut settings_timer = tokio::time::interval(SETTINGS_POLL_INTERVAL);
    let mut reported_generation = None;
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = settings_timer.tick(), if watcher.is_some() => {
                let Some(watcher) = watcher.as_mut() else { continue };
                if let Some(settings) = watcher.poll().await {
                    if let Err(err) = engine.update_settings(settings) {
                        tracing::error!("Failed to apply new settings: {:?}", err);
                    }
                }
            }
            _ = timer.tick() => {
                engine.tick(dt);

                let generation = engine.session().generation();
                if let Some(assessment) = engine.get_zone_assessment() {
                    if reported_generation != Some(generation) {
                        reported_generation = Some(generation);
                        if assessment.is_strike() {
                            tracing::info!(
                                "Pitch settled in zone {} (confidence {:.2})",
                                assessment.zone_id,
                                assessment.confidence
                            );
                        } else {
                            tracing::info!(
                                "Pitch settled outside the zone (confidence {:.2})",
                                assessment.confidence
                            );
                        }
                    }
                }

                if args.frames > 0 && engine.frame_count() >= args.frames {
                    tracing::info!("Drew {} frames, stopping", engine.frame_count());
                    break;
                }
            }
        }
    }

    if let Some(debug) = debug {
        for (key, value) in debug.get_copy() {
            match value {
                DebugValue::Number(n) => tracing::debug!("{} = {}", key, n),
                DebugValue::String(s) => tracing::debug!("{} = {}", key, s),
            }
        }
    }

    if let Some(path) = &args.save_settings {
        engine.settings().store(path).await;
        tracing::info!("Saved settings to {}", path.display());
    }

    let backend = engine.teardown();
    tracing::info!(
        "Renderer torn down, {} frames drawn, {} resources live",
        backend.frames_drawn(),
        backend.counter().live()
    );
    Ok(())
}
