use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::error::ProcessingError;
use crate::transform::TransformStats;

use super::detect::Platform;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (file skipped, processing continues).
    Warning,
    /// Error-level event (this file failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// Classify a processing error for observers.
pub fn severity_for_error(e: &ProcessingError) -> ProcessingSeverity {
    match e {
        ProcessingError::Io(_) => ProcessingSeverity::Critical,
        ProcessingError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => ProcessingSeverity::Critical,
            _ => ProcessingSeverity::Error,
        },
        #[cfg(feature = "excel")]
        ProcessingError::Excel(_) => ProcessingSeverity::Error,
        ProcessingError::UnsupportedFormat { .. } => ProcessingSeverity::Warning,
        ProcessingError::SchemaMismatch { .. } => ProcessingSeverity::Error,
        ProcessingError::Config { .. }
        | ProcessingError::Encoding { .. }
        | ProcessingError::Watch(_) => ProcessingSeverity::Critical,
    }
}

/// Context about one processed input.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    /// Input identifier (file path or object key).
    pub source: String,
    /// Detected platform; `None` when detection itself failed.
    pub platform: Option<Platform>,
}

/// Observer interface for per-file outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait ProcessingObserver: Send + Sync {
    /// Called when a file was transformed successfully.
    fn on_success(&self, _ctx: &ProcessingContext, _stats: TransformStats) {}

    /// Called when processing a file fails.
    fn on_failure(&self, _ctx: &ProcessingContext, _severity: ProcessingSeverity, _error: &ProcessingError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ProcessingContext, severity: ProcessingSeverity, error: &ProcessingError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ProcessingObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn ProcessingObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ProcessingObserver for CompositeObserver {
    fn on_success(&self, ctx: &ProcessingContext, stats: TransformStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &ProcessingContext, severity: ProcessingSeverity, error: &ProcessingError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &ProcessingContext, severity: ProcessingSeverity, error: &ProcessingError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits processing events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ProcessingObserver for TracingObserver {
    fn on_success(&self, ctx: &ProcessingContext, stats: TransformStats) {
        tracing::info!(
            source = %ctx.source,
            platform = ?ctx.platform,
            input_rows = stats.input_rows,
            output_rows = stats.output_rows,
            dropped_rows = stats.dropped_rows,
            coerced_fields = stats.coerced_fields,
            "processed"
        );
    }

    fn on_failure(&self, ctx: &ProcessingContext, severity: ProcessingSeverity, error: &ProcessingError) {
        match severity {
            ProcessingSeverity::Info => {
                tracing::info!(source = %ctx.source, platform = ?ctx.platform, %error, "skipped")
            }
            ProcessingSeverity::Warning => {
                tracing::warn!(source = %ctx.source, platform = ?ctx.platform, %error, "skipped")
            }
            ProcessingSeverity::Error | ProcessingSeverity::Critical => {
                tracing::error!(source = %ctx.source, platform = ?ctx.platform, ?severity, %error, "failed")
            }
        }
    }

    fn on_alert(&self, ctx: &ProcessingContext, severity: ProcessingSeverity, error: &ProcessingError) {
        tracing::error!(
            alert = true,
            source = %ctx.source,
            platform = ?ctx.platform,
            ?severity,
            %error,
            "processing alert"
        );
    }
}

/// Appends processing events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ProcessingObserver for FileObserver {
    fn on_success(&self, ctx: &ProcessingContext, stats: TransformStats) {
        self.append_line(&format!(
            "{} ok platform={:?} source={} rows_in={} rows_out={} dropped={} coerced={}",
            unix_ts(),
            ctx.platform,
            ctx.source,
            stats.input_rows,
            stats.output_rows,
            stats.dropped_rows,
            stats.coerced_fields
        ));
    }

    fn on_failure(&self, ctx: &ProcessingContext, severity: ProcessingSeverity, error: &ProcessingError) {
        self.append_line(&format!(
            "{} fail severity={:?} platform={:?} source={} err={}",
            unix_ts(),
            severity,
            ctx.platform,
            ctx.source,
            error
        ));
    }

    fn on_alert(&self, ctx: &ProcessingContext, severity: ProcessingSeverity, error: &ProcessingError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} platform={:?} source={} err={}",
            unix_ts(),
            severity,
            ctx.platform,
            ctx.source,
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
