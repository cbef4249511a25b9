//! Error types for bar normalization.

use thiserror::Error;

/// Reasons a raw record cannot become a [`Bar`](crate::Bar).
///
/// Invalid bars are dropped from their batch; they are never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidBar {
    /// The record carries no timestamp.
    #[error("missing timestamp")]
    MissingTimestamp,

    /// The timestamp is not an integer number of seconds.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A price field is absent, unparseable, NaN or infinite.
    #[error("non-finite {field} price")]
    NonFinitePrice {
        /// Name of the offending field.
        field: &'static str,
    },
}
