//! Rolling indicators for candlesync.
//!
//! - [`bollinger_bands`] - Windowed SMA ± k·σ envelope over closes
//! - [`BandSettings`] - Fast and slow band parameters computed together

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bollinger;

pub use bollinger::{
    BandParams, BandPoint, BandSettings, Bands, IndicatorError, MAX_MULTIPLIER, MAX_PERIOD,
    MIN_MULTIPLIER, MIN_PERIOD, bollinger_bands,
};
