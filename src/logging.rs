//! Log sinks and the subscriber a run logs through.
//!
//! The subscriber is assembled once from a list of [`LogSink`]s and held in a
//! [`LogContext`]; code runs inside [`LogContext::in_scope`] instead of relying
//! on a process-wide default.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use tracing::Dispatch;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::error::{Result, ToolError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_FILTER: &str = "info";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// A destination for log lines.
#[derive(Debug)]
pub enum LogSink {
    /// Standard error, with colours.
    Console,
    /// `{dir}/{YYYY-MM-DD}.log`, appended to, named after the local date.
    DailyFile { dir: PathBuf },
    /// Any writer, without colours.
    Writer(BoxMakeWriter),
}

/// The subscriber built for a run, plus the files it writes to.
pub struct LogContext {
    dispatch: Dispatch,
    files: Vec<PathBuf>,
}

impl LogContext {
    /// Builds the subscriber. Level filtering follows `RUST_LOG`, defaulting
    /// to `info`.
    pub fn new(sinks: Vec<LogSink>) -> Result<Self> {
        let mut layers: Vec<BoxedLayer> = Vec::with_capacity(sinks.len());
        let mut files = Vec::new();

        for sink in sinks {
            match sink {
                LogSink::Console => {
                    layers.push(
                        fmt::layer()
                            .with_writer(std::io::stderr)
                            .with_timer(timer())
                            .with_target(false)
                            .boxed(),
                    );
                }
                LogSink::DailyFile { dir } => {
                    let path = daily_log_path(&dir, Local::now().date_naive());
                    let file = open_log_file(&path)?;
                    layers.push(
                        fmt::layer()
                            .with_writer(Mutex::new(file))
                            .with_ansi(false)
                            .with_timer(timer())
                            .with_target(false)
                            .boxed(),
                    );
                    files.push(path);
                }
                LogSink::Writer(writer) => {
                    layers.push(
                        fmt::layer()
                            .with_writer(writer)
                            .with_ansi(false)
                            .with_timer(timer())
                            .with_target(false)
                            .boxed(),
                    );
                }
            }
        }

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let subscriber = Registry::default().with(layers).with(filter);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
            files,
        })
    }

    /// Runs `f` with this context as the active subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Log files opened by [`LogSink::DailyFile`] sinks.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// Path of the log file for `date` under `dir`.
pub fn daily_log_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.log", date.format("%Y-%m-%d")))
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|error| {
            ToolError::Logging(format!("cannot create log directory {}: {error}", dir.display()))
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| ToolError::Logging(format!("cannot open {}: {error}", path.display())))
}

fn timer() -> ChronoLocal {
    ChronoLocal::new(TIMESTAMP_FORMAT.to_string())
}
