//! Core types for the candlesync market-data reconciliation engine.
//!
//! This crate provides the fundamental data structures used throughout candlesync:
//!
//! - [`Bar`] - A normalized OHLCV sample keyed by its period start
//! - [`RawBar`] - A bar as it arrives on the wire, before normalization
//! - [`LtpUpdate`] - A last-traded-price tick from the push channel
//! - [`Timeframe`] - Chart timeframe and its REST interval
//! - [`Symbol`] - Exchange-prefixed instrument symbol

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bar;
mod error;
mod ltp;
mod symbol;
mod timeframe;

pub use bar::{Bar, RawBar, normalize_batch};
pub use error::InvalidBar;
pub use ltp::LtpUpdate;
pub use symbol::{Exchange, Market, Symbol};
pub use timeframe::{Timeframe, TimeframeParseError};
