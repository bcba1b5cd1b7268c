//! Platform 2 transformer: order rows and product rows interleaved in one table.
//!
//! An order's header row carries the date, total and discount; its product rows carry the
//! product name and quantity. A row may be both. Output is the product lines left-joined to the
//! order headers on the order number.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{ProcessingError, ProcessingResult};
use crate::ingestion::Platform;
use crate::types::{CanonicalField, CanonicalTable, OrderLine, RawTable, NO_CHARACTERISTIC};

use super::coerce::{parse_decimal, parse_delimited_date, parse_quantity, FieldCoercer};
use super::product_name::split_characteristic;
use super::schema::{ColumnAlias, ResolvedColumns};
use super::{TransformStats, Transformed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextColumn {
    OrderNumber,
    Date,
    Total,
    Discount,
    ProductName,
    QuantityPurchased,
}

const TEXT_COLUMNS: &[ColumnAlias<TextColumn>] = &[
    ColumnAlias { key: TextColumn::OrderNumber, names: &["Número do Pedido"] },
    ColumnAlias { key: TextColumn::Date, names: &["Data"] },
    ColumnAlias { key: TextColumn::Total, names: &["Total"] },
    ColumnAlias { key: TextColumn::Discount, names: &["Desconto"] },
    ColumnAlias { key: TextColumn::ProductName, names: &["Nome do Produto"] },
    ColumnAlias { key: TextColumn::QuantityPurchased, names: &["Quantidade Comprada"] },
];

/// Output column order: product-line fields first, then the joined order fields.
const OUTPUT_COLUMNS: [CanonicalField; 7] = [
    CanonicalField::NumeroPedido,
    CanonicalField::NomeProduto,
    CanonicalField::Quantidade,
    CanonicalField::CaracteristicaProduto,
    CanonicalField::DtVenda,
    CanonicalField::PrecoVenda,
    CanonicalField::TotalDesconto,
];

/// Order-level fields of one order header row.
#[derive(Debug, Clone, PartialEq)]
struct OrderHeader {
    dt_venda: Option<NaiveDate>,
    preco_venda: Option<f64>,
    total_desconto: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
struct ProductLine {
    numero_pedido: Option<String>,
    nome_produto: String,
    quantidade: Option<i64>,
    caracteristica_produto: String,
}

/// Transform a platform 2 table.
///
/// Rules:
///
/// - All six source columns must be present, else [`ProcessingError::SchemaMismatch`].
/// - Rows with a non-empty date are order headers; the date is parsed as `dd/mm/yyyy` and
///   unparseable dates become null.
/// - Rows with a non-empty product name are product lines; the name is split into base name and
///   characteristic (see [`split_characteristic`]), defaulting to [`NO_CHARACTERISTIC`].
/// - Every product line yields one output row per matching order header, or a single row with
///   null order fields when nothing matches.
pub fn transform_delimited(raw: &RawTable) -> ProcessingResult<Transformed> {
    let cols = ResolvedColumns::resolve(&raw.headers, TEXT_COLUMNS);
    if !cols.missing().is_empty() {
        return Err(ProcessingError::SchemaMismatch {
            message: format!(
                "missing required columns {:?}. headers={:?}",
                cols.missing(),
                raw.headers
            ),
        });
    }
    let order_idx = cols.require(TextColumn::OrderNumber, &raw.headers)?;
    let date_idx = cols.require(TextColumn::Date, &raw.headers)?;
    let total_idx = cols.require(TextColumn::Total, &raw.headers)?;
    let discount_idx = cols.require(TextColumn::Discount, &raw.headers)?;
    let product_idx = cols.require(TextColumn::ProductName, &raw.headers)?;
    let quantity_idx = cols.require(TextColumn::QuantityPurchased, &raw.headers)?;

    let mut coercer = FieldCoercer::default();
    let mut orders: HashMap<String, Vec<OrderHeader>> = HashMap::new();
    let mut products: Vec<ProductLine> = Vec::new();

    for r in 0..raw.row_count() {
        let order_number = raw.cell(r, order_idx).as_text();

        let date = raw.cell(r, date_idx);
        if !date.is_null() {
            let header = OrderHeader {
                dt_venda: coercer.apply(r, "Data", date, parse_delimited_date),
                preco_venda: coercer.apply(r, "Total", raw.cell(r, total_idx), parse_decimal),
                total_desconto: coercer.apply(
                    r,
                    "Desconto",
                    raw.cell(r, discount_idx),
                    parse_decimal,
                ),
            };
            // A header without an order number can never be joined.
            if let Some(key) = order_number.clone() {
                orders.entry(key).or_default().push(header);
            }
        }

        if let Some(name) = raw.cell(r, product_idx).as_text() {
            let split = split_characteristic(&name);
            products.push(ProductLine {
                numero_pedido: order_number,
                nome_produto: split.base,
                quantidade: coercer.apply(
                    r,
                    "Quantidade Comprada",
                    raw.cell(r, quantity_idx),
                    parse_quantity,
                ),
                caracteristica_produto: split
                    .characteristic
                    .unwrap_or_else(|| NO_CHARACTERISTIC.to_string()),
            });
        }
    }

    let product_rows = products.len();
    let rows = left_join(products, &orders);

    let stats = TransformStats {
        input_rows: raw.row_count(),
        output_rows: rows.len(),
        dropped_rows: raw.row_count() - product_rows,
        coerced_fields: coercer.coerced(),
    };
    Ok(Transformed {
        table: CanonicalTable {
            platform: Platform::DelimitedText,
            columns: OUTPUT_COLUMNS.to_vec(),
            rows,
        },
        stats,
    })
}

fn left_join(products: Vec<ProductLine>, orders: &HashMap<String, Vec<OrderHeader>>) -> Vec<OrderLine> {
    let mut out = Vec::with_capacity(products.len());
    for p in products {
        let matches = p
            .numero_pedido
            .as_ref()
            .and_then(|k| orders.get(k))
            .map(Vec::as_slice)
            .unwrap_or_default();

        let base = OrderLine {
            numero_pedido: p.numero_pedido,
            nome_produto: Some(p.nome_produto),
            quantidade: p.quantidade,
            caracteristica_produto: p.caracteristica_produto,
            ..OrderLine::default()
        };

        if matches.is_empty() {
            out.push(base);
            continue;
        }
        for h in matches {
            out.push(OrderLine {
                dt_venda: h.dt_venda,
                preco_venda: h.preco_venda,
                total_desconto: h.total_desconto,
                ..base.clone()
            });
        }
    }
    out
}
