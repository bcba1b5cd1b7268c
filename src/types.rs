//! Core data model types.
//!
//! Readers produce a [`RawTable`] (source-defined headers, loosely typed cells). Transformers
//! turn it into a [`CanonicalTable`] of [`OrderLine`]s, one per (order, product line) pair.

use std::fmt;

use chrono::NaiveDate;

use crate::ingestion::Platform;

/// Default written to `caracteristicaProduto` when a product carries no qualifier.
pub const NO_CHARACTERISTIC: &str = "sem caracteristica";

/// A single loosely typed cell of a [`RawTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Calendar date.
    Date(NaiveDate),
}

impl Value {
    /// `true` for [`Value::Null`] and for strings that are empty after trimming.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Utf8(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form of the cell, `None` when null.
    ///
    /// Integral floats render without a fractional part so spreadsheet ids like `123.0` read
    /// back as `123`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Utf8(s) if s.trim().is_empty() => None,
            Value::Utf8(s) => Some(s.trim().to_owned()),
            Value::Int64(i) => Some(i.to_string()),
            Value::Float64(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some((*f as i64).to_string()),
            Value::Float64(f) => Some(f.to_string()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(s) => f.write_str(&s),
            None => Ok(()),
        }
    }
}

/// Whole-file tabular input, headers as the source wrote them.
///
/// Rows are stored as `Vec<Vec<Value>>`; short rows are treated as null-padded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    /// Header cells, in source order.
    pub headers: Vec<String>,
    /// Row-major cell storage.
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    /// Create a table from headers and rows.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at (`row`, `col`); missing trailing cells read as [`Value::Null`].
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&NULL)
    }

    /// Create a new table containing only rows that match `predicate`.
    ///
    /// The returned table preserves the original headers.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.as_slice()))
            .cloned()
            .collect();
        Self {
            headers: self.headers.clone(),
            rows,
        }
    }
}

/// Columns of the canonical output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    /// Order identifier; join key between order-level and line-item data.
    NumeroPedido,
    /// Order date.
    DtVenda,
    /// Order total.
    PrecoVenda,
    /// Discount applied to the order.
    TotalDesconto,
    /// Product name with any trailing qualifier stripped.
    NomeProduto,
    /// Quantity purchased for the line item.
    Quantidade,
    /// Product qualifier, or [`NO_CHARACTERISTIC`].
    CaracteristicaProduto,
}

impl CanonicalField {
    /// Every canonical field, in mapping-table order.
    pub const ALL: [CanonicalField; 7] = [
        CanonicalField::NumeroPedido,
        CanonicalField::DtVenda,
        CanonicalField::PrecoVenda,
        CanonicalField::TotalDesconto,
        CanonicalField::NomeProduto,
        CanonicalField::Quantidade,
        CanonicalField::CaracteristicaProduto,
    ];

    /// Output header name.
    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::NumeroPedido => "numeroPedido",
            CanonicalField::DtVenda => "dtVenda",
            CanonicalField::PrecoVenda => "precoVenda",
            CanonicalField::TotalDesconto => "totalDesconto",
            CanonicalField::NomeProduto => "nomeProduto",
            CanonicalField::Quantidade => "quantidade",
            CanonicalField::CaracteristicaProduto => "caracteristicaProduto",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One canonical output row.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub numero_pedido: Option<String>,
    pub dt_venda: Option<NaiveDate>,
    pub preco_venda: Option<f64>,
    pub total_desconto: Option<f64>,
    pub nome_produto: Option<String>,
    pub quantidade: Option<i64>,
    /// Never empty: absence is always [`NO_CHARACTERISTIC`].
    pub caracteristica_produto: String,
}

impl Default for OrderLine {
    fn default() -> Self {
        Self {
            numero_pedido: None,
            dt_venda: None,
            preco_venda: None,
            total_desconto: None,
            nome_produto: None,
            quantidade: None,
            caracteristica_produto: NO_CHARACTERISTIC.to_owned(),
        }
    }
}

impl OrderLine {
    /// Value of `field` as a [`Value`] (for writers).
    pub fn value(&self, field: CanonicalField) -> Value {
        fn opt<T>(v: &Option<T>, f: impl FnOnce(&T) -> Value) -> Value {
            v.as_ref().map(f).unwrap_or(Value::Null)
        }
        match field {
            CanonicalField::NumeroPedido => opt(&self.numero_pedido, |s| Value::Utf8(s.clone())),
            CanonicalField::DtVenda => opt(&self.dt_venda, |d| Value::Date(*d)),
            CanonicalField::PrecoVenda => opt(&self.preco_venda, |v| Value::Float64(*v)),
            CanonicalField::TotalDesconto => opt(&self.total_desconto, |v| Value::Float64(*v)),
            CanonicalField::NomeProduto => opt(&self.nome_produto, |s| Value::Utf8(s.clone())),
            CanonicalField::Quantidade => opt(&self.quantidade, |v| Value::Int64(*v)),
            CanonicalField::CaracteristicaProduto => Value::Utf8(self.caracteristica_produto.clone()),
        }
    }
}

/// Transformer output: the projected column set plus typed rows.
///
/// `columns` lists only the canonical fields the source actually provided, in output order.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    /// Platform the rows were read from.
    pub platform: Platform,
    /// Output columns, in order.
    pub columns: Vec<CanonicalField>,
    /// One row per (order, product line) pair.
    pub rows: Vec<OrderLine>,
}

impl CanonicalTable {
    /// Number of output rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// `true` when `field` is part of the projected output.
    pub fn has_column(&self, field: CanonicalField) -> bool {
        self.columns.contains(&field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_render_as_integers() {
        assert_eq!(Value::Float64(250_112.0).as_text().as_deref(), Some("250112"));
        assert_eq!(Value::Float64(10.5).as_text().as_deref(), Some("10.5"));
    }

    #[test]
    fn blank_strings_are_null() {
        assert!(Value::Utf8("   ".to_string()).is_null());
        assert!(Value::Null.is_null());
        assert!(!Value::Int64(0).is_null());
        assert_eq!(Value::Utf8("  ".to_string()).as_text(), None);
    }

    #[test]
    fn short_rows_read_as_null() {
        let t = RawTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Value::Int64(1)]],
        );
        assert_eq!(t.cell(0, 0), &Value::Int64(1));
        assert_eq!(t.cell(0, 1), &Value::Null);
        assert_eq!(t.cell(5, 0), &Value::Null);
    }

    #[test]
    fn filter_rows_preserves_headers() {
        let t = RawTable::new(
            vec!["id".to_string()],
            vec![vec![Value::Int64(1)], vec![Value::Int64(2)]],
        );
        let out = t.filter_rows(|row| matches!(row.first(), Some(Value::Int64(v)) if *v > 1));
        assert_eq!(out.headers, t.headers);
        assert_eq!(out.rows, vec![vec![Value::Int64(2)]]);
    }

    #[test]
    fn order_line_defaults_to_sentinel_characteristic() {
        let line = OrderLine::default();
        assert_eq!(
            line.value(CanonicalField::CaracteristicaProduto),
            Value::Utf8(NO_CHARACTERISTIC.to_string())
        );
        assert_eq!(line.value(CanonicalField::DtVenda), Value::Null);
    }
}
