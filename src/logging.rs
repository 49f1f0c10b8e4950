//! Tracing setup: human-readable output on stdout plus a dated log file

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "tangible_dashboard=debug,rumqttc=info";

/// Name of the log file for a given day
pub fn log_file_name(date: NaiveDate) -> String {
    format!("dashboard-{}.log", date.format("%Y-%m-%d"))
}

fn open_log_file(log_dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file_name(Local::now().date_naive()));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Install the global subscriber. Stdout logging is always enabled; the
/// returned error only means the log file could not be opened.
pub fn init(log_dir: &Path) -> io::Result<PathBuf> {
    let (file_layer, result) = match open_log_file(log_dir) {
        Ok((path, file)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Ok(path),
        ),
        Err(e) => (None, Err(e)),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    result
}
