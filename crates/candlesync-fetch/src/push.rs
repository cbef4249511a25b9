//! WebSocket push channel.
//!
//! Inbound frames are JSON envelopes `{"event": "...", "data": ...}` carrying
//! realtime bars, LTP ticks and data-pull toggles. Outbound frames use the
//! same envelope for subscription management.

use candlesync_types::{LtpUpdate, RawBar, Symbol, Timeframe};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::PushError;

/// Message text of the client notice sent after live bars are merged.
pub const DATA_PULLED: &str = "DataPulled";

/// Push channel configuration.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// WebSocket server URL.
    pub url: String,
    /// Ping interval to keep the connection alive.
    pub ping_interval: Duration,
    /// Reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnection attempt.
    pub reconnect_base_delay: Duration,
    /// Upper bound on the reconnection delay.
    pub reconnect_max_delay: Duration,
    /// Event channel buffer size.
    pub channel_buffer_size: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5000/ws".to_string(),
            ping_interval: Duration::from_secs(25),
            max_reconnect_attempts: 10,
            reconnect_base_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(5),
            channel_buffer_size: 1000,
        }
    }
}

impl PushConfig {
    /// Creates a configuration with a custom URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the ping interval.
    #[must_use]
    pub const fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Sets the reconnection budget.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the reconnection delay bounds.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, base: Duration, max: Duration) -> Self {
        self.reconnect_base_delay = base;
        self.reconnect_max_delay = max;
        self
    }

    /// Sets the event channel buffer size.
    #[must_use]
    pub const fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    /// Returns the delay before reconnection attempt `attempt` (1-based).
    ///
    /// Doubles from the base delay and is capped at the maximum.
    #[must_use]
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.reconnect_base_delay
            .saturating_mul(factor)
            .min(self.reconnect_max_delay)
    }
}

/// Connection status updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// A connection attempt is in progress.
    Reconnecting,
    /// The channel is open.
    Connected,
    /// The channel dropped; a reconnect may follow.
    Disconnected,
    /// The reconnection budget is spent; the client has stopped.
    Failed,
}

/// Payload of a `data_update` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataUpdate {
    /// Nested toggle as sent by the server.
    pub data_pull: DataPullFlag,
}

/// Inner flag of a [`DataUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPullFlag {
    /// Whether data-pull mode is on.
    pub data_pull: bool,
}

impl DataUpdate {
    /// Returns whether data-pull mode should be enabled.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.data_pull.data_pull
    }
}

/// An inbound push event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// Recent bars for the subscribed symbol.
    RealtimeUpdate(Vec<RawBar>),
    /// Last traded price tick.
    LtpUpdate(LtpUpdate),
    /// Data-pull mode toggle.
    DataUpdate(DataUpdate),
}

impl PushEvent {
    /// Decodes an event from a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown events or malformed payloads.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Payload of a `client_message` notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientNotice {
    /// Notice text, e.g. [`DATA_PULLED`].
    pub message: String,
    /// Active symbol.
    pub symbol: String,
    /// Active timeframe in minutes.
    pub timeframe: u32,
    /// Send time (epoch seconds).
    pub timestamp: i64,
}

/// An outbound push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start streaming bars for a symbol.
    Subscribe {
        /// Symbol to stream.
        table_name: String,
        /// Timeframe in minutes.
        timeframe: u32,
    },
    /// Stop streaming a symbol.
    Unsubscribe {
        /// Symbol to stop.
        table_name: String,
    },
    /// Register interest in LTP ticks for a symbol.
    SymbolSubscribed {
        /// Symbol to tick.
        symbol: String,
        /// Send time (epoch seconds).
        timestamp: i64,
    },
    /// Free-form client notice.
    #[serde(rename = "client_message")]
    Notice(ClientNotice),
}

impl ClientMessage {
    /// Builds a `subscribe` message.
    #[must_use]
    pub fn subscribe(symbol: &Symbol, timeframe: Timeframe) -> Self {
        Self::Subscribe {
            table_name: symbol.to_string(),
            timeframe: timeframe.minutes(),
        }
    }

    /// Builds an `unsubscribe` message.
    #[must_use]
    pub fn unsubscribe(symbol: &Symbol) -> Self {
        Self::Unsubscribe {
            table_name: symbol.to_string(),
        }
    }

    /// Builds a `symbol_subscribed` message.
    #[must_use]
    pub fn symbol_subscribed(symbol: &Symbol, timestamp: i64) -> Self {
        Self::SymbolSubscribed {
            symbol: symbol.to_string(),
            timestamp,
        }
    }

    /// Builds the `DataPulled` notice.
    #[must_use]
    pub fn data_pulled(symbol: &Symbol, timeframe: Timeframe, timestamp: i64) -> Self {
        Self::Notice(ClientNotice {
            message: DATA_PULLED.to_string(),
            symbol: symbol.to_string(),
            timeframe: timeframe.minutes(),
            timestamp,
        })
    }

    /// Encodes the message as a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Serialize`] if serialization fails.
    pub fn encode(&self) -> Result<String, PushError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Channels to a running [`PushClient`].
///
/// Dropping `events` or `outbound` shuts the client down.
#[derive(Debug)]
pub struct PushHandle {
    /// Decoded inbound events.
    pub events: mpsc::Receiver<PushEvent>,
    /// Connection status changes.
    pub status: mpsc::Receiver<ConnectionStatus>,
    /// Messages to send to the server.
    pub outbound: mpsc::Sender<ClientMessage>,
}

/// WebSocket push channel client with bounded reconnection.
#[derive(Debug, Clone, Default)]
pub struct PushClient {
    config: PushConfig,
}

impl PushClient {
    /// Creates a client with the given configuration.
    #[must_use]
    pub const fn new(config: PushConfig) -> Self {
        Self { config }
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &PushConfig {
        &self.config
    }

    /// Spawns the connection task and returns its channels.
    #[must_use]
    pub fn start(self) -> PushHandle {
        let (event_tx, events) = mpsc::channel(self.config.channel_buffer_size);
        let (status_tx, status) = mpsc::channel(16);
        let (outbound, outbound_rx) = mpsc::channel(64);

        tokio::spawn(run_push_loop(self.config, event_tx, status_tx, outbound_rx));

        PushHandle {
            events,
            status,
            outbound,
        }
    }
}

enum SessionEnd {
    /// Connection lost; reconnect.
    Dropped,
    /// Consumer went away; stop.
    Shutdown,
}

async fn run_push_loop(
    config: PushConfig,
    event_tx: mpsc::Sender<PushEvent>,
    status_tx: mpsc::Sender<ConnectionStatus>,
    mut outbound_rx: mpsc::Receiver<ClientMessage>,
) {
    info!(url = %config.url, "starting push channel");
    let mut attempt = 0u32;

    loop {
        let _ = status_tx.send(ConnectionStatus::Reconnecting).await;

        match connect_async(config.url.as_str()).await {
            Ok((ws, _)) => {
                attempt = 0;
                // Anything queued while offline is superseded by the
                // resubscription the consumer sends on Connected.
                while outbound_rx.try_recv().is_ok() {}

                info!(url = %config.url, "push channel connected");
                let _ = status_tx.send(ConnectionStatus::Connected).await;

                let end = run_session(&config, ws, &event_tx, &mut outbound_rx).await;
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
                match end {
                    Ok(SessionEnd::Shutdown) => {
                        debug!("push channel consumer dropped, stopping");
                        return;
                    }
                    Ok(SessionEnd::Dropped) => warn!("push channel disconnected, will reconnect"),
                    Err(e) => warn!(error = %e, "push channel failed, will reconnect"),
                }
            }
            Err(e) => {
                error!(url = %config.url, error = %e, "push channel connect failed");
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
            }
        }

        attempt += 1;
        if attempt > config.max_reconnect_attempts {
            let e = PushError::ReconnectExhausted(config.max_reconnect_attempts);
            error!(error = %e, "push channel stopped");
            let _ = status_tx.send(ConnectionStatus::Failed).await;
            return;
        }

        let delay = config.reconnect_delay(attempt);
        debug!(attempt, ?delay, "waiting before reconnecting");
        tokio::time::sleep(delay).await;
    }
}

async fn run_session(
    config: &PushConfig,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    event_tx: &mpsc::Sender<PushEvent>,
    outbound_rx: &mut mpsc::Receiver<ClientMessage>,
) -> Result<SessionEnd, PushError> {
    let (mut write, mut read) = ws.split();
    let mut ping = tokio::time::interval(config.ping_interval);
    ping.tick().await;

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => match PushEvent::decode(text.as_str()) {
                    Ok(event) => {
                        if event_tx.send(event).await.is_err() {
                            return Ok(SessionEnd::Shutdown);
                        }
                    }
                    Err(e) => debug!(error = %e, raw = text.as_str(), "ignoring push frame"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!("server closed push channel");
                    return Ok(SessionEnd::Dropped);
                }
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(_)) => {}
            },
            outbound = outbound_rx.recv() => match outbound {
                Some(message) => match message.encode() {
                    Ok(text) => write.send(Message::Text(text.into())).await?,
                    Err(e) => error!(error = %e, ?message, "failed to encode push message"),
                },
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
            },
            _ = ping.tick() => {
                write.send(Message::Ping(Vec::new().into())).await?;
            }
        }
    }
}
