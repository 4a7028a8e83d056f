// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "chewedit.log";

pub fn log_dir(user_dir: &Path) -> PathBuf {
    user_dir.join("logs")
}

/// Sends logs to a file under `log_dir`; the terminal belongs to the TUI.
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init(filter: &str, log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("create log directory {}", log_dir.display()))?;
    let filter = EnvFilter::try_new(filter)
        .with_context(|| format!("invalid log filter {filter:?}; check [logging] level"))?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    Ok(guard)
}
