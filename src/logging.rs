use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "DIFFMAN_LOG";
const DEFAULT_FILTER: &str = "warn,diffman=info";
const LOG_FILE: &str = "diffman.log";

/// Keeps the background log writer alive; dropping it flushes the file.
pub(crate) struct LogGuard {
    _file_guard: WorkerGuard,
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("diffman")
        .join(LOG_FILE)
}

/// A bare level such as `debug` applies to this crate only.
fn expand_level(value: &str) -> String {
    let value = value.trim();
    if value.contains('=') || value.contains(',') {
        value.to_string()
    } else {
        format!("warn,diffman={value}")
    }
}

fn filter_directives(diffman_log: Option<String>, rust_log: Option<String>) -> String {
    if let Some(value) = diffman_log.filter(|value| !value.trim().is_empty()) {
        return expand_level(&value);
    }
    if let Some(value) = rust_log.filter(|value| !value.trim().is_empty()) {
        return value;
    }
    DEFAULT_FILTER.to_string()
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| LOG_FILE.to_string());
    (directory, file_name)
}

/// Sends tracing output to a file, since the terminal belongs to the UI.
pub(crate) fn init(log_file: Option<&Path>) -> Result<LogGuard> {
    let path = log_file.map_or_else(default_log_path, Path::to_path_buf);
    let (directory, file_name) = split_log_path(&path);
    std::fs::create_dir_all(&directory)
        .with_context(|| format!("failed to create log directory {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(&directory, file_name);
    let (writer, file_guard) = tracing_appender::non_blocking(appender);

    let directives = filter_directives(env::var(LOG_ENV).ok(), env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter `{directives}`"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("failed to install log subscriber")?;

    tracing::debug!(path = %path.display(), "logging initialised");
    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
