use chrono::NaiveDate;

use order_normalizer::ingestion::csv::read_delimited_from_path;
use order_normalizer::pipeline::{process_path, ProcessingOptions};
use order_normalizer::transform::transform_delimited;
use order_normalizer::types::NO_CHARACTERISTIC;

const FIXTURE: &str = "tests/fixtures/loja_pedidos.csv";

fn at() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, 2)
        .unwrap()
        .and_hms_opt(23, 59, 1)
        .unwrap()
}

#[test]
fn latin1_fixture_joins_products_to_orders() {
    let raw = read_delimited_from_path(FIXTURE, encoding_rs::WINDOWS_1252).unwrap();
    assert_eq!(raw.row_count(), 7);

    let out = transform_delimited(&raw).unwrap();
    let rows = &out.table.rows;
    assert_eq!(rows.len(), 5);

    assert_eq!(rows[0].numero_pedido.as_deref(), Some("5001"));
    assert_eq!(rows[0].nome_produto.as_deref(), Some("Camiseta Básica"));
    assert_eq!(rows[0].caracteristica_produto, "Azul (M)");
    assert_eq!(rows[0].quantidade, Some(2));
    assert_eq!(rows[0].dt_venda, NaiveDate::from_ymd_opt(2024, 1, 31));
    assert_eq!(rows[0].preco_venda, Some(259.8));
    assert_eq!(rows[0].total_desconto, Some(20.0));

    // Same order, broadcast onto the second line.
    assert_eq!(rows[1].nome_produto.as_deref(), Some("Caneca Cerâmica"));
    assert_eq!(rows[1].caracteristica_produto, NO_CHARACTERISTIC);
    assert_eq!(rows[1].dt_venda, rows[0].dt_venda);

    assert_eq!(rows[2].caracteristica_produto, "Preto");
    assert_eq!(rows[2].total_desconto, Some(0.0));

    // Unparseable order date: the order still joins, with a null date.
    assert_eq!(rows[3].caracteristica_produto, "Kit (3 pares)");
    assert_eq!(rows[3].dt_venda, None);
    assert_eq!(rows[3].preco_venda, Some(45.0));

    // No order header at all.
    assert_eq!(rows[4].numero_pedido.as_deref(), Some("5004"));
    assert_eq!(rows[4].dt_venda, None);
    assert_eq!(rows[4].preco_venda, None);
    assert_eq!(rows[4].total_desconto, None);

    assert_eq!(out.stats.input_rows, 7);
    assert_eq!(out.stats.dropped_rows, 2);
    assert_eq!(out.stats.coerced_fields, 1);
}

#[test]
fn characteristic_is_never_empty() {
    let raw = read_delimited_from_path(FIXTURE, encoding_rs::WINDOWS_1252).unwrap();
    let out = transform_delimited(&raw).unwrap();
    assert!(out
        .table
        .rows
        .iter()
        .all(|r| !r.caracteristica_produto.trim().is_empty()));
}

#[test]
fn fixture_output_is_semicolon_utf8_with_bom() {
    let out = process_path(FIXTURE, &ProcessingOptions::default(), at()).unwrap();
    assert_eq!(out.output_name, "loja_pedidos_2_20240202_235901_processado.csv");
    assert!(out.contents.starts_with(b"\xEF\xBB\xBF"));

    let text = std::str::from_utf8(&out.contents[3..]).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "numeroPedido;nomeProduto;quantidade;caracteristicaProduto;dtVenda;precoVenda;totalDesconto"
    );
    assert_eq!(lines[1], "5001;Camiseta Básica;2;Azul (M);2024-01-31;259.8;20");
    assert_eq!(lines[5], "5004;Chaveiro;4;Prata;;;");
    assert_eq!(lines.len(), 6);
}

#[test]
fn reprocessing_is_idempotent() {
    let a = process_path(FIXTURE, &ProcessingOptions::default(), at()).unwrap();
    let b = process_path(FIXTURE, &ProcessingOptions::default(), at()).unwrap();
    assert_eq!(a.contents, b.contents);
}

#[test]
fn missing_product_columns_is_schema_mismatch() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("parcial.csv");
    std::fs::write(&p, b"Data;Total;Desconto\n01/01/2024;1;0\n").unwrap();

    let err = process_path(&p, &ProcessingOptions::default(), at()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("schema mismatch"), "{msg}");
    assert!(msg.contains("OrderNumber"), "{msg}");
}
