//! Platform transformers: [`RawTable`] → [`CanonicalTable`].
//!
//! - [`spreadsheet`]: platform 1, status filter + column projection
//! - [`delimited`]: platform 2, order/product split, product-name decomposition, left join
//!
//! Shared building blocks live in [`schema`] (header alias tables), [`product_name`] (nested
//! parenthesis qualifier extraction) and [`coerce`] (null-on-failure value parsing).
//!
//! ## Example
//!
//! ```rust
//! use order_normalizer::ingestion::Platform;
//! use order_normalizer::transform::transform;
//! use order_normalizer::types::{RawTable, Value};
//!
//! let headers = ["Número do Pedido", "Data", "Total", "Desconto", "Nome do Produto", "Quantidade Comprada"]
//!     .iter()
//!     .map(|s| s.to_string())
//!     .collect();
//! let t = |s: &str| Value::Utf8(s.to_string());
//! let raw = RawTable::new(
//!     headers,
//!     vec![vec![t("10"), t("31/01/2024"), t("99.90"), t("0"), t("Camiseta (Azul (M))"), t("1")]],
//! );
//!
//! let out = transform(Platform::DelimitedText, &raw).unwrap();
//! assert_eq!(out.table.rows[0].nome_produto.as_deref(), Some("Camiseta"));
//! assert_eq!(out.table.rows[0].caracteristica_produto, "Azul (M)");
//! ```

pub mod coerce;
pub mod delimited;
pub mod product_name;
pub mod schema;
pub mod spreadsheet;

use crate::error::ProcessingResult;
use crate::ingestion::Platform;
use crate::types::{CanonicalTable, RawTable};

pub use delimited::transform_delimited;
pub use product_name::{split_characteristic, ProductName};
pub use spreadsheet::transform_spreadsheet;

/// Row accounting for one transformed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformStats {
    /// Data rows in the raw input.
    pub input_rows: usize,
    /// Canonical rows produced.
    pub output_rows: usize,
    /// Raw rows that produced no output (filtered out or not line items).
    pub dropped_rows: usize,
    /// Individual values coerced to null because they did not parse.
    pub coerced_fields: usize,
}

/// A transformed table together with its row accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub table: CanonicalTable,
    pub stats: TransformStats,
}

/// Run the transformer of `platform` over `raw`.
pub fn transform(platform: Platform, raw: &RawTable) -> ProcessingResult<Transformed> {
    match platform {
        Platform::Spreadsheet => transform_spreadsheet(raw),
        Platform::DelimitedText => transform_delimited(raw),
    }
}
