//! Delimited-text reader (platform 2 input).

use std::path::Path;

use encoding_rs::Encoding;

use crate::error::{ProcessingError, ProcessingResult};
use crate::types::{RawTable, Value};

/// Field delimiter of platform 2 exports.
pub const INPUT_DELIMITER: u8 = b';';

/// Resolve an `encoding_rs` label such as `"latin1"` or `"utf-8"`.
pub fn resolve_encoding(label: &str) -> ProcessingResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| ProcessingError::Encoding {
        label: label.to_string(),
    })
}

/// Read a delimited-text export from disk.
pub fn read_delimited_from_path(
    path: impl AsRef<Path>,
    encoding: &'static Encoding,
) -> ProcessingResult<RawTable> {
    let bytes = std::fs::read(path)?;
    read_delimited_from_bytes(&bytes, encoding)
}

/// Decode `bytes` with `encoding` and read them as a semicolon-delimited table.
///
/// Rules:
///
/// - The first record is the header row.
/// - A byte-order mark overrides `encoding` (so re-saved UTF-8 exports still read correctly).
/// - Records may be shorter or longer than the header; missing cells read as null.
/// - Cells are trimmed; empty cells become [`Value::Null`], everything else [`Value::Utf8`].
pub fn read_delimited_from_bytes(
    bytes: &[u8],
    encoding: &'static Encoding,
) -> ProcessingResult<RawTable> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::warn!(
            encoding = used.name(),
            "input contained byte sequences invalid for the declared encoding; replaced"
        );
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(INPUT_DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    read_delimited_from_reader(&mut rdr)
}

/// Read an already decoded table from an existing CSV reader.
pub fn read_delimited_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
) -> ProcessingResult<RawTable> {
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(text_cell).collect());
    }

    Ok(RawTable::new(headers, rows))
}

fn text_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::Utf8(trimmed.to_owned())
    }
}
