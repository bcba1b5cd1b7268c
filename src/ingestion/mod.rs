//! Format detection, raw readers and observability hooks.
//!
//! - [`detect`]: file extension → [`Platform`]
//! - [`csv`]: semicolon-delimited text (platform 2), decoded from a configurable encoding
//! - [`excel`]: `.xlsx` workbooks (platform 1, feature `excel`)
//! - [`observability`]: per-file success/failure/alert callbacks

pub mod csv;
pub mod detect;
#[cfg(feature = "excel")]
pub mod excel;
pub mod observability;

pub use detect::Platform;
pub use observability::{
    severity_for_error, CompositeObserver, FileObserver, ProcessingContext, ProcessingObserver,
    ProcessingSeverity, TracingObserver,
};
