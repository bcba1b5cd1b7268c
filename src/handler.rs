//! On-demand handler: process the most recently modified object of an input store.
//!
//! Invoked once per "a file arrived" event. The event itself carries no payload the handler
//! relies on; it always picks the newest object in the input store.

use chrono::NaiveDateTime;

use crate::error::ProcessingResult;
use crate::pipeline::{process_bytes, ProcessingOptions};
use crate::storage::ObjectStore;
use crate::transform::TransformStats;

/// What one handler invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledObject {
    /// Key of the processed input object.
    pub input_key: String,
    /// Key written to the output store.
    pub output_key: String,
    /// Row accounting.
    pub stats: TransformStats,
}

/// Process the newest object of `input` and store the result in `output`.
///
/// Returns `Ok(None)` when the input store is empty. An unsupported latest object is reported as
/// [`crate::ProcessingError::UnsupportedFormat`] and nothing is written.
pub fn handle_latest(
    input: &dyn ObjectStore,
    output: &dyn ObjectStore,
    options: &ProcessingOptions,
    at: NaiveDateTime,
) -> ProcessingResult<Option<HandledObject>> {
    let Some(latest) = input.latest()? else {
        tracing::info!("no input objects found");
        return Ok(None);
    };
    tracing::info!(key = %latest.key, "latest input object");

    let bytes = input.get(&latest.key)?;
    let processed = process_bytes(&latest.key, &bytes, options, at)?;
    output.put(&processed.output_name, &processed.contents)?;
    tracing::info!(output = %processed.output_name, "processed object stored");

    Ok(Some(HandledObject {
        input_key: latest.key,
        output_key: processed.output_name,
        stats: processed.stats,
    }))
}
