//! Runtime configuration.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```json
//! { "input_dir": "/data/raw", "output_dir": "/data/trusted", "poll_interval_secs": 5 }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProcessingError, ProcessingResult};
use crate::ingestion::csv::resolve_encoding;
use crate::ingestion::{
    CompositeObserver, FileObserver, ProcessingObserver, ProcessingSeverity, TracingObserver,
};
use crate::pipeline::ProcessingOptions;

/// Settings shared by both shells.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Watched directory, or input bucket root for the handler.
    pub input_dir: PathBuf,
    /// Output directory, or output bucket root for the handler.
    pub output_dir: PathBuf,
    /// Seconds between poll rounds.
    pub poll_interval_secs: u64,
    /// Seconds between the two size reads of the stabilization check.
    pub settle_delay_secs: u64,
    /// `encoding_rs` label of platform 2 inputs.
    pub input_encoding: String,
    /// Optional append-only event log.
    pub event_log: Option<PathBuf>,
    /// Failures at or above this severity are alerted.
    pub alert_at_or_above: ProcessingSeverity,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("bucket-raw"),
            output_dir: PathBuf::from("bucket-trusted"),
            poll_interval_secs: 2,
            settle_delay_secs: 2,
            input_encoding: "latin1".to_string(),
            event_log: None,
            alert_at_or_above: ProcessingSeverity::Critical,
        }
    }
}

impl AppConfig {
    /// Load a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> ProcessingResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|source| ProcessingError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a JSON config document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Build [`ProcessingOptions`]: tracing events always, plus the event log when configured.
    pub fn processing_options(&self) -> ProcessingResult<ProcessingOptions> {
        let mut observers: Vec<Arc<dyn ProcessingObserver>> = vec![Arc::new(TracingObserver)];
        if let Some(log) = &self.event_log {
            observers.push(Arc::new(FileObserver::new(log)));
        }
        Ok(ProcessingOptions {
            input_encoding: resolve_encoding(&self.input_encoding)?,
            observer: Some(Arc::new(CompositeObserver::new(observers))),
            alert_at_or_above: self.alert_at_or_above,
        })
    }
}
