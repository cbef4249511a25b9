//! Error types for the network clients.

use thiserror::Error;

/// Errors from the REST client.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Server error: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The body was not the expected JSON shape.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(String),
}

/// Errors from the push channel.
#[derive(Error, Debug)]
pub enum PushError {
    /// WebSocket transport failed.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// An outbound message could not be serialized.
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// All reconnection attempts failed.
    #[error("Gave up reconnecting after {0} attempts")]
    ReconnectExhausted(u32),
}
