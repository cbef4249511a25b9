//! Network clients for candlesync.
//!
//! This crate provides the data acquisition layer:
//!
//! - [`OhlcvSource`] - Page-oriented source of historical bars
//! - [`OhlcvClient`] - HTTP client for `/ohlcv`, `/tables` and `/spreads`
//! - [`url::ohlcv_url`] - Constructs data service URLs
//! - [`PushClient`] - WebSocket push channel with bounded reconnects
//! - [`PushEvent`] / [`ClientMessage`] - Push channel envelopes

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod parse;
mod push;
mod source;
pub mod url;

pub use client::{ClientConfig, OhlcvClient};
pub use error::{FetchError, PushError};
pub use parse::{parse_ohlcv_page, parse_spreads, parse_tables};
pub use push::{
    ClientMessage, ClientNotice, ConnectionStatus, DATA_PULLED, DataPullFlag, DataUpdate,
    PushClient, PushConfig, PushEvent, PushHandle,
};
pub use source::{OhlcvSource, PageRequest};
