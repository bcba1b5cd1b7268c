//! Throughput of the two platform transformers over synthetic tables.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use order_normalizer::output::to_csv_bytes;
use order_normalizer::transform::{transform_delimited, transform_spreadsheet};
use order_normalizer::types::{RawTable, Value};

fn text(s: impl Into<String>) -> Value {
    Value::Utf8(s.into())
}

/// One order header followed by three product lines per order.
fn delimited_table(orders: usize) -> RawTable {
    let headers = [
        "Número do Pedido",
        "Data",
        "Total",
        "Desconto",
        "Nome do Produto",
        "Quantidade Comprada",
    ]
    .map(String::from)
    .to_vec();

    let mut rows = Vec::with_capacity(orders * 4);
    for i in 0..orders {
        let id = text(i.to_string());
        rows.push(vec![
            id.clone(),
            text(format!("{:02}/01/2024", i % 28 + 1)),
            text("149,90"),
            text("10,00"),
            Value::Null,
            Value::Null,
        ]);
        for (n, name) in ["Camiseta (Azul (M))", "Caneca", "Meia (Kit (3 pares))"].iter().enumerate() {
            rows.push(vec![
                id.clone(),
                Value::Null,
                Value::Null,
                Value::Null,
                text(*name),
                text((n + 1).to_string()),
            ]);
        }
    }
    RawTable::new(headers, rows)
}

fn spreadsheet_table(rows: usize) -> RawTable {
    let headers = [
        "ID do pedido",
        "Status do pedido",
        "Data de criação do pedido",
        "Valor Total",
        "Desconto do vendedor",
        "Nome do Produto",
        "Quantidade do Produto",
        "Nome da variação",
    ]
    .map(String::from)
    .to_vec();

    let data = (0..rows)
        .map(|i| {
            vec![
                Value::Int64(i as i64),
                text(if i % 5 == 0 { "Cancelado" } else { "Concluído" }),
                Value::Float64(45_300.0 + (i % 300) as f64),
                Value::Float64(99.9),
                Value::Float64(0.0),
                text("Vestido Midi"),
                Value::Int64(1),
                if i % 2 == 0 { text("Verde,G") } else { Value::Null },
            ]
        })
        .collect();
    RawTable::new(headers, data)
}

fn bench_transformers(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    for orders in [1_000, 10_000] {
        let raw = delimited_table(orders);
        group.bench_function(format!("delimited_{orders}_orders"), |b| {
            b.iter(|| black_box(transform_delimited(black_box(&raw))))
        });
    }

    for rows in [1_000, 10_000] {
        let raw = spreadsheet_table(rows);
        group.bench_function(format!("spreadsheet_{rows}_rows"), |b| {
            b.iter(|| black_box(transform_spreadsheet(black_box(&raw))))
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let Ok(out) = transform_delimited(&delimited_table(10_000)) else {
        return;
    };
    c.bench_function("encode_delimited_30k_lines", |b| {
        b.iter(|| black_box(to_csv_bytes(black_box(&out.table))))
    });
}

criterion_group!(benches, bench_transformers, bench_encode);
criterion_main!(benches);
