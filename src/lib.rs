//! `order-normalizer` turns e-commerce order exports into one canonical order/line-item CSV.
//!
//! Two source platforms are understood, selected by file extension:
//!
//! - **Platform 1, spreadsheet** (`.xlsx`, Cargo feature `excel`, on by default): one row per
//!   line item. Only orders with status `Concluído` are kept.
//! - **Platform 2, delimited text** (`.csv`, `;`-separated, Latin-1): order header rows and
//!   product rows interleaved. Product names like `Camiseta (Azul (M))` are split into a name and
//!   a characteristic, and product rows are left-joined to their order.
//!
//! Both produce rows of the canonical schema:
//! `numeroPedido, dtVenda, precoVenda, totalDesconto, nomeProduto, quantidade,
//! caracteristicaProduto`, where `caracteristicaProduto` is never empty
//! (see [`types::NO_CHARACTERISTIC`]).
//!
//! ## Quick example: process one file
//!
//! ```no_run
//! use order_normalizer::pipeline::{process_path, ProcessingOptions};
//!
//! # fn main() -> Result<(), order_normalizer::ProcessingError> {
//! let now = chrono::Local::now().naive_local();
//! let out = process_path("pedidos.xlsx", &ProcessingOptions::default(), now)?;
//! std::fs::write(&out.output_name, &out.contents)?;
//! println!("rows={}", out.stats.output_rows);
//! # Ok(())
//! # }
//! ```
//!
//! ## Deployment shells
//!
//! - [`watch`]: polls a local directory and processes files once their size settles
//! - [`handler`]: processes the newest object of an [`storage::ObjectStore`] on demand
//!
//! ## Modules
//!
//! - [`ingestion`]: platform detection, raw readers, observability hooks
//! - [`transform`]: the two platform transformers and their building blocks
//! - [`output`]: canonical CSV encoding and output naming
//! - [`pipeline`]: detect → transform → encode
//! - [`storage`]: arrival / sink / object-store collaborators
//! - [`config`], [`logging`]: runtime settings and `tracing` setup
//! - [`types`], [`error`]: data model and error types

pub mod config;
pub mod error;
pub mod handler;
pub mod ingestion;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod transform;
pub mod types;
pub mod watch;

pub use error::{ProcessingError, ProcessingResult};
