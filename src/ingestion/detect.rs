//! Format detection: file extension → [`Platform`].

use std::fmt;
use std::path::Path;

use crate::error::{ProcessingError, ProcessingResult};

/// Supported source platforms.
///
/// Each platform has its own export shape and its own transformer; the numeric id is part of
/// every output file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Spreadsheet export (`.xlsx`), one row per line item. Platform id 1.
    Spreadsheet,
    /// Semicolon-delimited Latin-1 export (`.csv`) with order and product rows interleaved.
    /// Platform id 2.
    DelimitedText,
}

impl Platform {
    /// Parse a platform from a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(Self::Spreadsheet),
            "csv" => Some(Self::DelimitedText),
            _ => None,
        }
    }

    /// Detect the platform of `path` from its extension.
    ///
    /// Unknown or missing extensions yield [`ProcessingError::UnsupportedFormat`], which callers
    /// treat as "skip this file".
    pub fn detect(path: impl AsRef<Path>) -> ProcessingResult<Self> {
        let path = path.as_ref();
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| ProcessingError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
    }

    /// `true` when `path` carries an extension of a supported platform.
    pub fn is_supported(path: impl AsRef<Path>) -> bool {
        Self::detect(path).is_ok()
    }

    /// Numeric platform id used in output names.
    pub fn id(self) -> u8 {
        match self {
            Self::Spreadsheet => 1,
            Self::DelimitedText => 2,
        }
    }

    /// Field delimiter of the canonical output written for this platform.
    pub fn output_delimiter(self) -> u8 {
        match self {
            Self::Spreadsheet => b',',
            Self::DelimitedText => b';',
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spreadsheet => f.write_str("spreadsheet"),
            Self::DelimitedText => f.write_str("delimited-text"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension_case_insensitively() {
        assert_eq!(Platform::detect("pedidos.xlsx").unwrap(), Platform::Spreadsheet);
        assert_eq!(Platform::detect("PEDIDOS.XLSX").unwrap(), Platform::Spreadsheet);
        assert_eq!(Platform::detect("dir/loja.CSV").unwrap(), Platform::DelimitedText);
    }

    #[test]
    fn platform_ids_and_delimiters() {
        assert_eq!(Platform::Spreadsheet.id(), 1);
        assert_eq!(Platform::DelimitedText.id(), 2);
        assert_eq!(Platform::Spreadsheet.output_delimiter(), b',');
        assert_eq!(Platform::DelimitedText.output_delimiter(), b';');
    }

    #[test]
    fn unsupported_extension_is_signalled_not_panicked() {
        let err = Platform::detect("notes.txt").unwrap_err();
        assert!(err.is_unsupported_format());
        assert!(err.to_string().contains("notes.txt"));

        assert!(Platform::detect("no_extension").unwrap_err().is_unsupported_format());
        assert!(!Platform::is_supported("report.xls"));
    }
}
