//! detect → transform → write, over in-memory bytes.
//!
//! Both deployment shells ([`crate::watch`] and [`crate::handler`]) call [`process_bytes`] and
//! only differ in where the bytes come from and where the result goes.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use encoding_rs::{Encoding, WINDOWS_1252};

use crate::error::{ProcessingError, ProcessingResult};
use crate::ingestion::{
    csv, severity_for_error, Platform, ProcessingContext, ProcessingObserver, ProcessingSeverity,
};
use crate::output::{output_file_name, to_csv_bytes};
use crate::transform::{transform, TransformStats, Transformed};
use crate::types::RawTable;

/// Options controlling per-file processing.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ProcessingOptions {
    /// Text encoding of platform 2 inputs (Latin-1 by default).
    pub input_encoding: &'static Encoding,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn ProcessingObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: ProcessingSeverity,
}

impl fmt::Debug for ProcessingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingOptions")
            .field("input_encoding", &self.input_encoding.name())
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            // encoding_rs resolves the "latin1" label to windows-1252, a superset of ISO-8859-1.
            input_encoding: WINDOWS_1252,
            observer: None,
            alert_at_or_above: ProcessingSeverity::Critical,
        }
    }
}

/// Result of processing one input.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFile {
    /// Input identifier (path or object key).
    pub source: String,
    /// Detected platform.
    pub platform: Platform,
    /// Generated output name (see [`output_file_name`]).
    pub output_name: String,
    /// Encoded canonical CSV.
    pub contents: Vec<u8>,
    /// Row accounting.
    pub stats: TransformStats,
}

/// Read `bytes` as the raw table of `platform`.
pub fn read_raw(
    platform: Platform,
    bytes: &[u8],
    options: &ProcessingOptions,
) -> ProcessingResult<RawTable> {
    match platform {
        Platform::DelimitedText => csv::read_delimited_from_bytes(bytes, options.input_encoding),
        Platform::Spreadsheet => read_spreadsheet(bytes),
    }
}

fn read_spreadsheet(bytes: &[u8]) -> ProcessingResult<RawTable> {
    // Avoid unused warnings when the feature is off.
    let _ = bytes;

    #[cfg(feature = "excel")]
    {
        crate::ingestion::excel::read_spreadsheet_from_bytes(bytes)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(ProcessingError::SchemaMismatch {
            message: "spreadsheet input not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

/// Detect, read and transform one input without encoding the result.
pub fn transform_bytes(
    source: &str,
    bytes: &[u8],
    options: &ProcessingOptions,
) -> ProcessingResult<Transformed> {
    let platform = Platform::detect(source)?;
    let raw = read_raw(platform, bytes, options)?;
    transform(platform, &raw)
}

/// Process one input end to end: detect its platform from `source`, transform `bytes`, and encode
/// the canonical CSV named for time `at`.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row stats
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use order_normalizer::pipeline::{process_bytes, ProcessingOptions};
///
/// # fn main() -> Result<(), order_normalizer::ProcessingError> {
/// // Inputs are Latin-1 by default; this one is a Rust string, so UTF-8.
/// let options = ProcessingOptions {
///     input_encoding: encoding_rs::UTF_8,
///     ..Default::default()
/// };
/// let input = "Número do Pedido;Data;Total;Desconto;Nome do Produto;Quantidade Comprada\n\
///              1;31/01/2024;10.00;0;Caneca (Branca);1\n";
/// let at = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
///
/// let out = process_bytes("loja.csv", input.as_bytes(), &options, at)?;
/// assert_eq!(out.output_name, "loja_2_20240201_120000_processado.csv");
/// assert_eq!(out.stats.output_rows, 1);
/// # Ok(())
/// # }
/// ```
pub fn process_bytes(
    source: &str,
    bytes: &[u8],
    options: &ProcessingOptions,
    at: NaiveDateTime,
) -> ProcessingResult<ProcessedFile> {
    let platform = Platform::detect(source).ok();
    let ctx = ProcessingContext {
        source: source.to_string(),
        platform,
    };

    let result = transform_bytes(source, bytes, options).and_then(|t| {
        let contents = to_csv_bytes(&t.table)?;
        Ok(ProcessedFile {
            source: source.to_string(),
            platform: t.table.platform,
            output_name: output_file_name(Path::new(source), t.table.platform, at),
            contents,
            stats: t.stats,
        })
    });

    if let Some(obs) = options.observer.as_ref() {
        let outcome = result.as_ref().map(|p| p.stats);
        report(obs.as_ref(), &ctx, outcome, options.alert_at_or_above);
    }

    result
}

fn report(
    obs: &dyn ProcessingObserver,
    ctx: &ProcessingContext,
    outcome: Result<TransformStats, &ProcessingError>,
    alert_at_or_above: ProcessingSeverity,
) {
    match outcome {
        Ok(stats) => obs.on_success(ctx, stats),
        Err(e) => {
            let sev = severity_for_error(e);
            obs.on_failure(ctx, sev, e);
            if sev >= alert_at_or_above {
                obs.on_alert(ctx, sev, e);
            }
        }
    }
}

/// Process a local file: read it from disk, then [`process_bytes`].
///
/// Unsupported extensions and I/O failures while reading are reported to the observer like any other failure.
pub fn process_path(
    path: impl AsRef<Path>,
    options: &ProcessingOptions,
    at: NaiveDateTime,
) -> ProcessingResult<ProcessedFile> {
    let path = path.as_ref();
    let source = path.to_string_lossy().into_owned();
    // Unsupported files are never read.
    let read = Platform::detect(path)
        .and_then(|_| std::fs::read(path).map_err(ProcessingError::from));
    match read {
        Ok(bytes) => process_bytes(&source, &bytes, options, at),
        Err(err) => {
            if let Some(obs) = options.observer.as_ref() {
                let ctx = ProcessingContext {
                    source,
                    platform: Platform::detect(path).ok(),
                };
                report(obs.as_ref(), &ctx, Err(&err), options.alert_at_or_above);
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap()
    }

    const DELIMITED: &str = "Número do Pedido;Data;Total;Desconto;Nome do Produto;Quantidade Comprada\n\
                             1;31/01/2024;10.00;0;Camiseta (Azul (M));1\n\
                             2;;;;Camiseta;2\n";

    fn utf8_options() -> ProcessingOptions {
        ProcessingOptions {
            input_encoding: encoding_rs::UTF_8,
            ..Default::default()
        }
    }

    #[test]
    fn delimited_text_end_to_end() {
        let out = process_bytes("loja.csv", DELIMITED.as_bytes(), &utf8_options(), at()).unwrap();
        assert_eq!(out.platform, Platform::DelimitedText);
        assert_eq!(out.output_name, "loja_2_20240506_070809_processado.csv");

        let text = String::from_utf8(out.contents[3..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "numeroPedido;nomeProduto;quantidade;caracteristicaProduto;dtVenda;precoVenda;totalDesconto",
                "1;Camiseta;1;Azul (M);2024-01-31;10;0",
                "2;Camiseta;2;sem caracteristica;;;",
            ]
        );
    }

    #[test]
    fn same_input_gives_same_output() {
        let a = process_bytes("x.csv", DELIMITED.as_bytes(), &utf8_options(), at()).unwrap();
        let b = process_bytes("x.csv", DELIMITED.as_bytes(), &utf8_options(), at()).unwrap();
        assert_eq!(a.contents, b.contents);
    }

    #[test]
    fn latin1_is_the_default_input_encoding() {
        let mut bytes = b"N\xfamero do Pedido;Data;Total;Desconto;Nome do Produto;Quantidade Comprada\n".to_vec();
        bytes.extend_from_slice(b"5;01/02/2024;3;0;Cal\xe7a (G);1\n");
        let out = transform_bytes("loja.csv", &bytes, &ProcessingOptions::default()).unwrap();
        assert_eq!(out.table.rows[0].nome_produto.as_deref(), Some("Cal\u{e7}a"));
        assert_eq!(out.table.rows[0].caracteristica_produto, "G");
    }

    #[test]
    fn unsupported_extension_is_signalled() {
        let err = process_bytes("notes.txt", b"hello", &ProcessingOptions::default(), at()).unwrap_err();
        assert!(err.is_unsupported_format());
    }
}
