use crate::models::LoggingSettings;
use anyhow::{Context, Result};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup logging with a daily rotating file appender and optional console output.
///
/// File output is plain text (no ANSI codes) or one JSON object per line when
/// `settings.json` is set.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(settings: &LoggingSettings) -> Result<WorkerGuard> {
    if !settings.dir.exists() {
        fs::create_dir_all(&settings.dir)
            .with_context(|| format!("Failed to create log directory: {}", settings.dir))?;
    }

    let file_appender = rolling::daily(&settings.dir, &settings.prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::new(level_directive(settings.debug));

    let json_layer = settings.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking.clone())
            .with_target(true)
            .with_thread_ids(true)
    });

    let text_layer = (!settings.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking.clone())
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let console_layer = settings.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}, json={}",
        settings.dir,
        settings.prefix,
        settings.debug,
        settings.console,
        settings.json
    );

    Ok(guard)
}

fn level_directive(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}
