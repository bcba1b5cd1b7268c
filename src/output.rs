//! Canonical CSV output and output naming.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::ProcessingResult;
use crate::ingestion::Platform;
use crate::types::CanonicalTable;

/// Suffix appended to every output file name.
pub const OUTPUT_SUFFIX: &str = "_processado.csv";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `{stem}_{platformId}_{YYYYMMDD_HHMMSS}_processado.csv` for `input` processed at `at`.
pub fn output_file_name(input: impl AsRef<Path>, platform: Platform, at: NaiveDateTime) -> String {
    let stem = input
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "{stem}_{id}_{ts}{OUTPUT_SUFFIX}",
        id = platform.id(),
        ts = at.format("%Y%m%d_%H%M%S")
    )
}

/// Write `table` as UTF-8 (with BOM) delimited text.
///
/// The delimiter follows the source platform ([`Platform::output_delimiter`]); nulls are written
/// as empty fields and dates as `YYYY-MM-DD`.
pub fn write_canonical_csv<W: Write>(mut writer: W, table: &CanonicalTable) -> ProcessingResult<()> {
    writer.write_all(UTF8_BOM)?;

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(table.platform.output_delimiter())
        .from_writer(writer);

    wtr.write_record(table.columns.iter().map(|c| c.name()))?;
    for row in &table.rows {
        wtr.write_record(table.columns.iter().map(|c| row.value(*c).to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// [`write_canonical_csv`] into a fresh buffer.
pub fn to_csv_bytes(table: &CanonicalTable) -> ProcessingResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_canonical_csv(&mut buf, table)?;
    Ok(buf)
}
