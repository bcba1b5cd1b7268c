//! Platform 1 transformer: spreadsheet exports, already one row per line item.

use crate::error::{ProcessingError, ProcessingResult};
use crate::ingestion::Platform;
use crate::types::{CanonicalField, CanonicalTable, OrderLine, RawTable, NO_CHARACTERISTIC};

use super::coerce::{parse_decimal, parse_quantity, parse_sheet_date, FieldCoercer};
use super::schema::{ColumnAlias, ResolvedColumns};
use super::{TransformStats, Transformed};

/// Only orders in this status produce output.
pub const COMPLETED_STATUS: &str = "Concluído";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SheetColumn {
    Status,
    Field(CanonicalField),
}

// Header spellings differ between export variants only in case and accents, which
// `normalize_header` folds; both observed spellings are listed anyway.
const SHEET_COLUMNS: &[ColumnAlias<SheetColumn>] = &[
    ColumnAlias {
        key: SheetColumn::Field(CanonicalField::NumeroPedido),
        names: &["ID do pedido"],
    },
    ColumnAlias {
        key: SheetColumn::Field(CanonicalField::DtVenda),
        names: &["Data de criação do pedido"],
    },
    ColumnAlias {
        key: SheetColumn::Field(CanonicalField::PrecoVenda),
        names: &["Valor Total"],
    },
    ColumnAlias {
        key: SheetColumn::Field(CanonicalField::TotalDesconto),
        names: &["Desconto do vendedor", "Desconto do Vendedor"],
    },
    ColumnAlias {
        key: SheetColumn::Field(CanonicalField::NomeProduto),
        names: &["Nome do Produto", "Nome do produto"],
    },
    ColumnAlias {
        key: SheetColumn::Field(CanonicalField::Quantidade),
        names: &["Quantidade do Produto", "Quantidade do produto"],
    },
    ColumnAlias {
        key: SheetColumn::Field(CanonicalField::CaracteristicaProduto),
        names: &["Nome da variação"],
    },
    ColumnAlias {
        key: SheetColumn::Status,
        names: &["Status do pedido"],
    },
];

/// Transform a platform 1 sheet.
///
/// Rules:
///
/// - Only rows whose status is exactly [`COMPLETED_STATUS`] survive.
/// - Only the recognized columns present in the sheet are projected; if none are present, or the
///   status column is absent, the sheet is a [`ProcessingError::SchemaMismatch`].
/// - Rows with an empty product name are dropped when the product column exists.
/// - A missing variation becomes [`NO_CHARACTERISTIC`].
pub fn transform_spreadsheet(raw: &RawTable) -> ProcessingResult<Transformed> {
    let cols = ResolvedColumns::resolve(&raw.headers, SHEET_COLUMNS);

    let columns: Vec<CanonicalField> = cols
        .found_keys()
        .filter_map(|k| match k {
            SheetColumn::Field(f) => Some(f),
            SheetColumn::Status => None,
        })
        .collect();
    if columns.is_empty() {
        return Err(ProcessingError::SchemaMismatch {
            message: format!("no expected spreadsheet columns found. headers={:?}", raw.headers),
        });
    }
    let status_idx = cols.require(SheetColumn::Status, &raw.headers)?;

    let completed = raw.filter_rows(|row| {
        row.get(status_idx)
            .and_then(|v| v.as_text())
            .is_some_and(|s| s == COMPLETED_STATUS)
    });

    let idx = |f: CanonicalField| cols.index(SheetColumn::Field(f));
    let mut coercer = FieldCoercer::default();
    let mut rows = Vec::with_capacity(completed.row_count());

    for r in 0..completed.row_count() {
        let cell = |f: CanonicalField| idx(f).map(|i| completed.cell(r, i));

        let nome_produto = cell(CanonicalField::NomeProduto).and_then(|v| v.as_text());
        if idx(CanonicalField::NomeProduto).is_some() && nome_produto.is_none() {
            continue;
        }

        let mut line = OrderLine {
            numero_pedido: cell(CanonicalField::NumeroPedido).and_then(|v| v.as_text()),
            nome_produto,
            caracteristica_produto: cell(CanonicalField::CaracteristicaProduto)
                .and_then(|v| v.as_text())
                .unwrap_or_else(|| NO_CHARACTERISTIC.to_string()),
            ..OrderLine::default()
        };
        if let Some(v) = cell(CanonicalField::DtVenda) {
            line.dt_venda = coercer.apply(r, CanonicalField::DtVenda.name(), v, parse_sheet_date);
        }
        if let Some(v) = cell(CanonicalField::PrecoVenda) {
            line.preco_venda = coercer.apply(r, CanonicalField::PrecoVenda.name(), v, parse_decimal);
        }
        if let Some(v) = cell(CanonicalField::TotalDesconto) {
            line.total_desconto =
                coercer.apply(r, CanonicalField::TotalDesconto.name(), v, parse_decimal);
        }
        if let Some(v) = cell(CanonicalField::Quantidade) {
            line.quantidade = coercer.apply(r, CanonicalField::Quantidade.name(), v, parse_quantity);
        }
        rows.push(line);
    }

    let stats = TransformStats {
        input_rows: raw.row_count(),
        output_rows: rows.len(),
        dropped_rows: raw.row_count() - rows.len(),
        coerced_fields: coercer.coerced(),
    };
    Ok(Transformed {
        table: CanonicalTable {
            platform: Platform::Spreadsheet,
            columns,
            rows,
        },
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use chrono::NaiveDate;

    fn t(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    fn full_headers() -> Vec<String> {
        [
            "ID do pedido",
            "Status do pedido",
            "Data de criação do pedido",
            "Valor Total",
            "Desconto do Vendedor",
            "Nome do produto",
            "Quantidade do produto",
            "Nome da variação",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn sample() -> RawTable {
        RawTable::new(
            full_headers(),
            vec![
                vec![
                    Value::Float64(1001.0),
                    t("Concluído"),
                    t("2024-01-31 10:15"),
                    Value::Float64(150.5),
                    Value::Float64(10.0),
                    t("Camiseta"),
                    Value::Float64(2.0),
                    t("Azul,M"),
                ],
                vec![
                    Value::Float64(1002.0),
                    t("Cancelado"),
                    t("2024-02-01 09:00"),
                    Value::Float64(80.0),
                    Value::Float64(0.0),
                    t("Boné"),
                    Value::Float64(1.0),
                    Value::Null,
                ],
                vec![
                    Value::Float64(1003.0),
                    t("Concluído"),
                    t("sem data"),
                    Value::Float64(80.0),
                    Value::Null,
                    t("Meia"),
                    Value::Float64(3.0),
                    Value::Null,
                ],
            ],
        )
    }

    #[test]
    fn non_completed_orders_produce_no_rows() {
        let out = transform_spreadsheet(&sample()).unwrap();
        let ids: Vec<_> = out
            .table
            .rows
            .iter()
            .map(|r| r.numero_pedido.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["1001", "1003"]);
        assert_eq!(out.stats.dropped_rows, 1);
    }

    #[test]
    fn maps_columns_to_canonical_fields() {
        let out = transform_spreadsheet(&sample()).unwrap();
        assert_eq!(out.table.columns, CanonicalField::ALL.to_vec());

        let first = &out.table.rows[0];
        assert_eq!(first.dt_venda, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(first.preco_venda, Some(150.5));
        assert_eq!(first.total_desconto, Some(10.0));
        assert_eq!(first.nome_produto.as_deref(), Some("Camiseta"));
        assert_eq!(first.quantidade, Some(2));
        assert_eq!(first.caracteristica_produto, "Azul,M");
    }

    #[test]
    fn missing_variation_defaults_and_bad_date_is_null() {
        let out = transform_spreadsheet(&sample()).unwrap();
        let second = &out.table.rows[1];
        assert_eq!(second.caracteristica_produto, NO_CHARACTERISTIC);
        assert_eq!(second.dt_venda, None);
        assert_eq!(second.total_desconto, None);
        assert_eq!(out.stats.coerced_fields, 1);
    }

    #[test]
    fn projects_only_present_columns() {
        let raw = RawTable::new(
            vec!["Status do pedido".to_string(), "Nome do Produto".to_string()],
            vec![vec![t("Concluído"), t("Caneca")]],
        );
        let out = transform_spreadsheet(&raw).unwrap();
        assert_eq!(out.table.columns, vec![CanonicalField::NomeProduto]);
        assert!(!out.table.has_column(CanonicalField::CaracteristicaProduto));
        assert_eq!(out.table.row_count(), 1);
    }

    #[test]
    fn no_expected_columns_is_schema_mismatch() {
        let raw = RawTable::new(
            vec!["Status do pedido".to_string(), "Outra".to_string()],
            vec![vec![t("Concluído"), t("x")]],
        );
        let err = transform_spreadsheet(&raw).unwrap_err();
        assert!(err.to_string().contains("no expected spreadsheet columns found"));
    }

    #[test]
    fn missing_status_column_is_schema_mismatch() {
        let raw = RawTable::new(vec!["ID do pedido".to_string()], vec![vec![t("1")]]);
        let err = transform_spreadsheet(&raw).unwrap_err();
        assert!(err.to_string().contains("missing required column Status"));
    }

    #[test]
    fn rows_without_product_name_are_dropped() {
        let mut raw = sample();
        raw.rows[0][5] = Value::Null;
        let out = transform_spreadsheet(&raw).unwrap();
        assert_eq!(out.table.row_count(), 1);
        assert_eq!(out.table.rows[0].numero_pedido.as_deref(), Some("1003"));
    }
}
