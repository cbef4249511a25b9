//! Tick-to-minute-bar aggregation for candlesync.
//!
//! This crate provides the minute aggregator used for live LTP ticks:
//!
//! - [`MinuteAggregator`] - Streaming aggregator holding one pending bar
//! - [`TickOutcome`] - What a single tick did to the pending bar
//! - [`minute_bucket`] - Minute boundary for an epoch timestamp

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod minute;

pub use minute::{MINUTE_SECONDS, MinuteAggregator, TickOutcome, minute_bucket};
