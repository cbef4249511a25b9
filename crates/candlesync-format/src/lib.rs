//! Output formatters for candlesync series snapshots.
//!
//! Bars and Bollinger Band points can be written as:
//!
//! - [`CsvFormatter`] - CSV or TSV with epoch and RFC 3339 times
//! - [`JsonFormatter`] - JSON array or NDJSON
//! - [`ParquetFormatter`] - Apache Parquet columnar format
//!
//! [`export_bars`] and [`export_bands`] pick the formatter from an
//! [`OutputFormat`] and write straight to a file.

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod csv;
mod export;
mod formatter;
mod json;

#[cfg(feature = "parquet")]
mod parquet;

pub use crate::csv::CsvFormatter;
pub use export::{export_bands, export_bars, write_bands, write_bars};
pub use formatter::{FormatError, Formatter, OutputFormat};
pub use json::{JsonFormatter, JsonStyle};

#[cfg(feature = "parquet")]
pub use crate::parquet::ParquetFormatter;
