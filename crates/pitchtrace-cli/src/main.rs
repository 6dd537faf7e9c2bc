use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{path::PathBuf, str::FromStr};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod mock_tracker;
mod run;
mod settings_watch;

#[derive(Debug, Clone, ValueEnum)]
pub(crate) enum SourceType {
    /// Jittered pitches from a mock tracker
    Mock,
    /// Samples replayed from a JSON file
    File,
}

#[derive(Debug, Parser)]
#[command(name = "pitchtrace-cli")]
pub(crate) struct Args {
    #[clap(long, default_value = "mock")]
    source: SourceType,

    /// JSON array of tracking samples, used with `--source file`
    #[clap(long)]
    samples: Option<PathBuf>,

    /// Time between two tracking samples, in milliseconds
    #[clap(long, default_value = "2500")]
    interval_ms: u64,

    #[clap(long, default_value = "60")]
    fps: f64,

    /// Engine settings file, created with defaults if missing and reloaded when it
    /// changes
    #[clap(long)]
    settings: Option<PathBuf>,

    /// Write the settings in effect to this file on exit
    #[clap(long)]
    save_settings: Option<PathBuf>,

    /// Seed for the mock tracker
    #[clap(long)]
    seed: Option<u64>,

    /// Number of frames to draw, 0 to run until ctrl-c
    #[clap(long, default_value = "0")]
    frames: u64,

    #[clap(long, default_value = "debug")]
    log_level: String,

    #[clap(long, default_value = "auto")]
    log_file: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up log file
    let log_file_path = if args.log_file != "auto" {
        let path = PathBuf::from(args.log_file.clone());
        if path.exists() {
            anyhow::bail!("Log file already exists: {}", path.display());
        }
        path
    } else {
        let time = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let filename = format!("pitchtrace-{time}.log");
        let path = dirs::data_local_dir()
            .map(|p| p.join("pitchtrace").join(&filename))
            .unwrap_or_else(|| PathBuf::from(&filename));
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        }
        path
    };

    // Create log file appender
    let log_dir = log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let log_name = log_file_path
        .file_name()
        .context("Log file path has no file name")?;
    let appender = tracing_appender::rolling::never(log_dir, log_name);
    let (non_blocking_appender, _guard) = tracing_appender::non_blocking(appender);

    // Set up tracing, also capturing records from the `log` facade
    let log_level = tracing::Level::from_str(&args.log_level)
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", args.log_level))?;
    let stdout_layer = fmt::Subscriber::builder()
        .with_max_level(log_level)
        .without_time()
        .finish();
    let logfile_layer = fmt::Layer::default()
        .json()
        .with_ansi(false)
        .with_writer(non_blocking_appender);
    stdout_layer
        .with(logfile_layer)
        .try_init()
        .context("Unable to set global tracing subscriber")?;

    tracing::info!("Saving logs to {}", log_file_path.display());

    let (stop_tx, stop_rx) = broadcast::channel(1);
    let mut main_task = tokio::spawn(async move {
        if let Err(err) = run::run(args, stop_rx).await {
            tracing::error!("Engine failed: {:?}", err);
        }
    });

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for ctrl-c")?;
            tracing::info!("Shutting down");
            // The engine may already have stopped on its own
            let _ = stop_tx.send(());
            main_task.await.context("Engine task failed")?;
        }
        res = &mut main_task => {
            res.context("Engine task failed")?;
        }
    }

    Ok(())
}
