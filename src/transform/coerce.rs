//! Per-field value coercion.
//!
//! Malformed values never abort a file: they become null, are logged at `debug`, and counted.

use chrono::{NaiveDate, NaiveDateTime};

use crate::types::Value;

/// Date layout of platform 2 order dates.
pub const DELIMITED_DATE_FORMAT: &str = "%d/%m/%Y";

const SHEET_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];
const SHEET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Counts coercions to null while a table is being transformed.
#[derive(Debug, Default)]
pub struct FieldCoercer {
    coerced: usize,
}

impl FieldCoercer {
    /// Apply `parse` to `raw`. A non-null value that fails to parse is counted and read as `None`.
    pub fn apply<T>(
        &mut self,
        row: usize,
        column: &str,
        raw: &Value,
        parse: impl FnOnce(&Value) -> Option<T>,
    ) -> Option<T> {
        if raw.is_null() {
            return None;
        }
        let parsed = parse(raw);
        if parsed.is_none() {
            self.coerced += 1;
            tracing::debug!(row, column, raw = %raw, "unparseable value coerced to null");
        }
        parsed
    }

    /// Number of values coerced to null so far.
    pub fn coerced(&self) -> usize {
        self.coerced
    }
}

/// Parse a platform 2 order date (`dd/mm/yyyy`, nothing else).
pub fn parse_delimited_date(v: &Value) -> Option<NaiveDate> {
    match v {
        Value::Date(d) => Some(*d),
        Value::Utf8(s) => NaiveDate::parse_from_str(s.trim(), DELIMITED_DATE_FORMAT).ok(),
        _ => None,
    }
}

/// Parse a spreadsheet order date: a date cell, a serial day number, or a textual date with an
/// optional time of day (which is dropped).
pub fn parse_sheet_date(v: &Value) -> Option<NaiveDate> {
    match v {
        Value::Date(d) => Some(*d),
        #[cfg(feature = "excel")]
        Value::Float64(f) => crate::ingestion::excel::serial_number_date(*f),
        #[cfg(feature = "excel")]
        Value::Int64(i) => crate::ingestion::excel::serial_number_date(*i as f64),
        Value::Utf8(s) => {
            let s = s.trim();
            SHEET_DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .or_else(|| {
                    SHEET_DATETIME_FORMATS
                        .iter()
                        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                        .map(|dt| dt.date())
                })
        }
        _ => None,
    }
}

/// Parse a money amount. Accepts plain numbers, `R$` prefixes, Brazilian notation (`1.234,56`)
/// and comma-grouped notation (`1,234.56`).
///
/// When both `.` and `,` appear, the last one is the decimal mark. A single separator followed
/// by exactly three digits (`1.234`, `1,234`) cannot be told apart from a thousands group and
/// reads as `None`, except after `R$`, where the Brazilian reading applies (`R$ 1.234` is
/// `1234`).
pub fn parse_decimal(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Float64(f) => *f,
        Value::Int64(i) => *i as f64,
        Value::Utf8(s) => parse_decimal_str(s)?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_decimal_str(s: &str) -> Option<f64> {
    let s = s.trim();
    let (currency, s) = match s.strip_prefix("R$") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, s),
    };
    let mark = decimal_mark(s, currency)?;
    let grouping = if mark == ',' { '.' } else { ',' };

    let (int_part, frac_part) = match s.rsplit_once(mark) {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    if !is_grouped(int_part, grouping) {
        return None;
    }

    let mut normalized: String = int_part.chars().filter(|c| *c != grouping).collect();
    if let Some(frac) = frac_part {
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        normalized.push('.');
        normalized.push_str(frac);
    }
    normalized.parse::<f64>().ok()
}

/// Decimal mark used by `s`; `None` when the notation is ambiguous.
fn decimal_mark(s: &str, currency: bool) -> Option<char> {
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();
    match (commas, dots) {
        (0, 0) => Some('.'),
        (1.., 1..) => Some(if s.rfind(',') > s.rfind('.') { ',' } else { '.' }),
        // Repeated separators can only be grouping.
        (2.., 0) => Some('.'),
        (0, 2..) => Some(','),
        (1, 0) if ends_with_group(s, ',') && !currency => None,
        (1, 0) => Some(','),
        (0, 1) if ends_with_group(s, '.') => currency.then_some(','),
        (0, 1) => Some('.'),
    }
}

/// `true` when `sep` is followed by exactly three digits and nothing else.
fn ends_with_group(s: &str, sep: char) -> bool {
    s.rsplit_once(sep)
        .is_some_and(|(_, tail)| tail.len() == 3 && tail.bytes().all(|b| b.is_ascii_digit()))
}

/// `true` when `int_part` is a plain integer or uses `sep` between groups of three digits.
fn is_grouped(int_part: &str, sep: char) -> bool {
    if !int_part.contains(sep) {
        return true;
    }
    let digits = int_part.strip_prefix('-').unwrap_or(int_part);
    let mut groups = digits.split(sep);
    let first_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    first_ok && groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Parse a whole quantity. Integral floats (`2.0`, `"2,0"`) are accepted.
pub fn parse_quantity(v: &Value) -> Option<i64> {
    match v {
        Value::Int64(i) => Some(*i),
        Value::Utf8(s) if s.trim().parse::<i64>().is_ok() => s.trim().parse().ok(),
        _ => {
            let f = parse_decimal(v)?;
            (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
        }
    }
}
