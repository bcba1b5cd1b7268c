#![cfg(feature = "excel")]

//! Spreadsheet reader (platform 1 input).

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::NaiveDate;

use crate::error::{ProcessingError, ProcessingResult};
use crate::types::{RawTable, Value};

/// Read the first sheet of an in-memory workbook into a [`RawTable`].
///
/// Behavior:
/// - Uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Converts date cells into [`Value::Date`]; other cells keep their spreadsheet type
pub fn read_spreadsheet_from_bytes(bytes: &[u8]) -> ProcessingResult<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ProcessingError::SchemaMismatch {
            message: "workbook has no sheets".to_string(),
        })?;
    let range = workbook.worksheet_range(&sheet)?;

    read_sheet_range(&sheet, &range)
}

fn read_sheet_range(sheet: &str, range: &calamine::Range<Data>) -> ProcessingResult<RawTable> {
    let mut rows_iter = range
        .rows()
        .skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));

    let headers: Vec<String> = rows_iter
        .next()
        .map(|row| row.iter().map(cell_to_header_string).collect())
        .ok_or_else(|| ProcessingError::SchemaMismatch {
            message: format!("sheet '{sheet}': no non-empty rows (no header row found)"),
        })?;

    let rows = rows_iter
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Ok(RawTable::new(headers, rows))
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => "".to_string(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Utf8(b.to_string()),
        // calamine applies the workbook's 1900/1904 date system.
        Data::DateTime(dt) if dt.is_datetime() => dt
            .as_datetime()
            .map(|d| Value::Date(d.date()))
            .unwrap_or(Value::Null),
        Data::DateTime(dt) => Value::Float64(dt.as_f64()),
        Data::DateTimeIso(s) => c.as_date().map(Value::Date).unwrap_or_else(|| Value::Utf8(s.clone())),
        Data::DurationIso(s) => Value::Utf8(s.clone()),
        Data::Error(e) => {
            tracing::debug!(error = ?e, "spreadsheet error cell read as null");
            Value::Null
        }
    }
}

/// Date of a plain numeric cell read as a serial day number (1900 date system).
pub(crate) fn serial_number_date(serial: f64) -> Option<NaiveDate> {
    // Beyond 9999-12-31 spreadsheets have no dates.
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    Data::Float(serial).as_date()
}
