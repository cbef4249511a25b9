//! Async driver for the [`SubscriptionController`].
//!
//! One task owns the controller and serializes everything that touches it:
//! commands, push-channel events, fetch completions and timers. Page fetches
//! run as separate tasks bound to the session's cancellation token and
//! report back through a channel.

use candlesync_fetch::{
    ClientMessage, ConnectionStatus, FetchError, OhlcvSource, PushEvent, PushHandle,
};
use candlesync_indicators::BandSettings;
use candlesync_types::{Bar, RawBar, Symbol, Timeframe};
use std::future::pending;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    Debouncer, EngineConfig, EngineEvent, FetchTask, SubscriptionController, VisibleRange,
};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 1024;
const FETCH_BUFFER: usize = 32;

/// Requests accepted by a running engine.
#[derive(Debug)]
pub enum EngineCommand {
    /// Subscribe to a symbol, replacing any active subscription.
    Subscribe {
        /// Symbol to load.
        symbol: Symbol,
        /// Bar timeframe.
        timeframe: Timeframe,
    },
    /// Resubscribe the current symbol at another timeframe.
    ChangeTimeframe(Timeframe),
    /// End the active subscription.
    Unsubscribe,
    /// The consumer's visible window moved.
    VisibleRange {
        /// Visible window.
        range: VisibleRange,
        /// True while the consumer follows the newest bar.
        live_mode: bool,
    },
    /// Load the next older page now.
    LoadMore,
    /// Fetch the latest bars, or retry a failed subscribe.
    Refresh,
    /// Replace the band parameters.
    SetBands(BandSettings),
    /// Look up the bar nearest to a time.
    Inspect {
        /// Target time in epoch seconds.
        time: i64,
        /// Receives the matching bar.
        reply: oneshot::Sender<Option<Bar>>,
    },
    /// Stop the engine.
    Shutdown,
}

/// Channels to a spawned engine.
#[derive(Debug)]
pub struct EngineHandle {
    /// Command input.
    pub commands: mpsc::Sender<EngineCommand>,
    /// Event output.
    pub events: mpsc::Receiver<EngineEvent>,
    /// The engine task.
    pub task: JoinHandle<()>,
}

type FetchResult = (FetchTask, Result<Vec<RawBar>, FetchError>);

/// Owns a [`SubscriptionController`] and drives it from async inputs.
pub struct EngineRuntime<S> {
    controller: SubscriptionController,
    source: Arc<S>,
    backfill: Debouncer,
    bands: Debouncer,
    visible: Option<(VisibleRange, bool)>,
    fetch_tx: mpsc::Sender<FetchResult>,
    fetch_rx: mpsc::Receiver<FetchResult>,
}

impl<S> std::fmt::Debug for EngineRuntime<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRuntime")
            .field("controller", &self.controller)
            .field("backfill", &self.backfill)
            .field("bands", &self.bands)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

impl<S: OhlcvSource + 'static> EngineRuntime<S> {
    /// Creates a runtime fetching pages from `source`.
    #[must_use]
    pub fn new(config: EngineConfig, source: Arc<S>) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::channel(FETCH_BUFFER);
        Self {
            backfill: Debouncer::new(config.backfill_debounce),
            bands: Debouncer::new(config.band_debounce),
            visible: None,
            controller: SubscriptionController::new(config),
            source,
            fetch_tx,
            fetch_rx,
        }
    }

    /// Returns the controller.
    #[must_use]
    pub const fn controller(&self) -> &SubscriptionController {
        &self.controller
    }

    /// Spawns the engine on the current tokio runtime.
    #[must_use]
    pub fn spawn(self, push: Option<PushHandle>, shutdown: CancellationToken) -> EngineHandle {
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, events) = mpsc::channel(EVENT_BUFFER);
        let task = tokio::spawn(self.run(command_rx, event_tx, push, shutdown));
        EngineHandle {
            commands,
            events,
            task,
        }
    }

    /// Runs until shutdown, the command channel closes, or the event
    /// consumer goes away.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<EngineCommand>,
        events: mpsc::Sender<EngineEvent>,
        push: Option<PushHandle>,
        shutdown: CancellationToken,
    ) {
        let (mut push_events, mut push_status, outbound) = match push {
            Some(handle) => (Some(handle.events), Some(handle.status), Some(handle.outbound)),
            None => (None, None, None),
        };

        let mut minute = tokio::time::interval(self.controller.config().minute_timer);
        minute.set_missed_tick_behavior(MissedTickBehavior::Delay);
        minute.tick().await;

        info!(push = outbound.is_some(), "engine started");

        loop {
            let backfill_due = self.backfill.deadline();
            let bands_due = self.bands.deadline();

            tokio::select! {
                () = shutdown.cancelled() => break,

                command = commands.recv() => match command {
                    None | Some(EngineCommand::Shutdown) => break,
                    Some(command) => self.handle_command(command, &mut minute),
                },

                Some((task, result)) = self.fetch_rx.recv() => {
                    let now = now_secs();
                    match self.controller.complete_fetch(&task, result, now) {
                        Ok(()) => {}
                        Err(e) if e.is_stale() => debug!(kind = ?task.kind, "stale fetch discarded"),
                        Err(e) => warn!(kind = ?task.kind, error = %e, "fetch failed"),
                    }
                }

                event = recv_some(&mut push_events) => match event {
                    Some(event) => self.handle_push_event(event),
                    None => {
                        debug!("push event stream closed");
                        push_events = None;
                    }
                },

                status = recv_some(&mut push_status) => match status {
                    Some(status) => self.handle_status(status),
                    None => push_status = None,
                },

                _ = minute.tick() => self.controller.on_minute_timer(now_secs()),

                () = sleep_until_some(backfill_due) => {
                    self.backfill.cancel();
                    self.backfill_if_near_edge();
                }

                () = sleep_until_some(bands_due) => {
                    self.bands.cancel();
                    self.controller.recompute_bands();
                }
            }

            if self.controller.take_band_request() {
                self.bands.schedule(Instant::now());
            }
            if !self.publish(&events, outbound.as_ref()).await {
                debug!("event consumer closed");
                break;
            }
        }

        self.controller.unsubscribe();
        self.publish(&events, outbound.as_ref()).await;
        info!("engine stopped");
    }

    fn handle_command(&mut self, command: EngineCommand, minute: &mut Interval) {
        match command {
            EngineCommand::Subscribe { symbol, timeframe } => {
                if let Some(task) = self.controller.begin_subscribe(symbol, timeframe) {
                    self.reset_timers(minute);
                    self.spawn_fetch(task);
                }
            }
            EngineCommand::ChangeTimeframe(timeframe) => {
                match self.controller.change_timeframe(timeframe) {
                    Ok(Some(task)) => {
                        self.reset_timers(minute);
                        self.spawn_fetch(task);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "cannot change timeframe"),
                }
            }
            EngineCommand::Unsubscribe => {
                self.reset_timers(minute);
                self.controller.unsubscribe();
            }
            EngineCommand::VisibleRange { range, live_mode } => {
                self.visible = Some((range, live_mode));
                if self.controller.should_backfill(range, live_mode) {
                    self.backfill.schedule(Instant::now());
                } else {
                    self.backfill.cancel();
                }
            }
            EngineCommand::LoadMore => {
                self.backfill.cancel();
                if let Some(task) = self.controller.begin_backfill() {
                    self.spawn_fetch(task);
                }
            }
            EngineCommand::Refresh => {
                if let Some(task) = self.controller.begin_refresh() {
                    self.spawn_fetch(task);
                }
            }
            EngineCommand::SetBands(settings) => self.controller.set_band_settings(settings),
            EngineCommand::Inspect { time, reply } => {
                let _ = reply.send(self.controller.find_nearest(time));
            }
            EngineCommand::Shutdown => {}
        }
    }

    fn handle_push_event(&mut self, event: PushEvent) {
        let now = now_secs();
        match event {
            PushEvent::RealtimeUpdate(bars) => {
                let changed = self.controller.apply_realtime(&bars, now);
                debug!(records = bars.len(), changed, "realtime update");
            }
            PushEvent::LtpUpdate(update) => self.controller.apply_ltp(&update, now),
            PushEvent::DataUpdate(update) => {
                if let Some(task) = self.controller.set_data_pull(update.enabled()) {
                    self.spawn_fetch(task);
                }
            }
        }
    }

    fn handle_status(&mut self, status: ConnectionStatus) {
        match status {
            ConnectionStatus::Connected => self.controller.on_push_connected(now_secs()),
            ConnectionStatus::Reconnecting => debug!("push channel reconnecting"),
            ConnectionStatus::Disconnected | ConnectionStatus::Failed => {
                warn!(?status, "push channel down");
                self.controller.on_push_disconnected();
            }
        }
    }

    /// Loads an older page if the last reported window still sits near the
    /// oldest bar and live mode is off.
    fn backfill_if_near_edge(&mut self) {
        let Some((range, live_mode)) = self.visible else {
            return;
        };
        if !self.controller.should_backfill(range, live_mode) {
            debug!(live_mode, "visible range moved, backfill skipped");
            return;
        }
        if let Some(task) = self.controller.begin_backfill() {
            self.spawn_fetch(task);
        }
    }

    fn reset_timers(&mut self, minute: &mut Interval) {
        self.backfill.cancel();
        self.bands.cancel();
        self.visible = None;
        minute.reset();
    }

    fn spawn_fetch(&self, task: FetchTask) {
        let source = Arc::clone(&self.source);
        let tx = self.fetch_tx.clone();
        debug!(
            kind = ?task.kind,
            symbol = %task.request.symbol,
            offset = task.request.offset,
            limit = task.request.limit,
            "fetching page"
        );

        tokio::spawn(async move {
            let result = tokio::select! {
                () = task.cancel.cancelled() => {
                    debug!(kind = ?task.kind, "fetch cancelled");
                    return;
                }
                result = source.fetch_page(&task.request) => result,
            };
            let _ = tx.send((task, result)).await;
        });
    }

    /// Delivers drained controller events. Returns false once the event
    /// consumer is gone.
    async fn publish(
        &mut self,
        events: &mpsc::Sender<EngineEvent>,
        outbound: Option<&mpsc::Sender<ClientMessage>>,
    ) -> bool {
        for event in self.controller.drain_events() {
            match event {
                EngineEvent::Push(message) => match outbound {
                    Some(tx) => {
                        if tx.send(message).await.is_err() {
                            debug!("push channel closed, message dropped");
                        }
                    }
                    None => debug!(?message, "no push channel"),
                },
                event => {
                    if events.send(event).await.is_err() {
                        return false;
                    }
                }
            }
        }
        true
    }
}

async fn recv_some<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => pending().await,
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use candlesync_fetch::PageRequest;
    use candlesync_types::LtpUpdate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const T0: i64 = 1_700_000_000 / 60 * 60;

    struct MockSource {
        total: i64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OhlcvSource for MockSource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawBar>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let end = (self.total - request.offset as i64).max(0);
            let start = (end - request.limit as i64).max(0);
            Ok((start..end)
                .map(|i| {
                    let close = 100.0 + (i % 13) as f64;
                    RawBar::new(T0 + i * 60, close, close + 1.0, close - 1.0, close, 10.0)
                })
                .collect())
        }
    }

    fn engine(total: i64) -> (Arc<MockSource>, EngineHandle) {
        let config = EngineConfig::default()
            .with_debounce(Duration::from_millis(5), Duration::from_millis(5));
        engine_with(total, config, None)
    }

    fn engine_with(
        total: i64,
        config: EngineConfig,
        push: Option<PushHandle>,
    ) -> (Arc<MockSource>, EngineHandle) {
        let source = Arc::new(MockSource {
            total,
            calls: AtomicUsize::new(0),
        });
        let handle = EngineRuntime::new(config, Arc::clone(&source))
            .spawn(push, CancellationToken::new());
        (source, handle)
    }

    async fn subscribe(handle: &mut EngineHandle, symbol: &str) {
        handle
            .commands
            .send(EngineCommand::Subscribe {
                symbol: Symbol::new(symbol),
                timeframe: Timeframe::Minute1,
            })
            .await
            .unwrap();
    }

    fn drain(events: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        std::iter::from_fn(|| events.try_recv().ok()).collect()
    }

    async fn next_matching<F>(events: &mut mpsc::Receiver<EngineEvent>, pred: F) -> EngineEvent
    where
        F: Fn(&EngineEvent) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = events.recv().await.expect("engine stopped");
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn test_subscribe_then_bands() {
        let (_, mut handle) = engine(2000);
        handle
            .commands
            .send(EngineCommand::Subscribe {
                symbol: Symbol::new("NSE_TCS"),
                timeframe: Timeframe::Minute1,
            })
            .await
            .unwrap();

        let event = next_matching(&mut handle.events, |e| {
            matches!(e, EngineEvent::Subscribed { .. })
        })
        .await;
        assert!(matches!(event, EngineEvent::Subscribed { bars: 1000, .. }));

        let event = next_matching(&mut handle.events, |e| {
            matches!(e, EngineEvent::BandsUpdated { .. })
        })
        .await;
        let EngineEvent::BandsUpdated { bands, .. } = event else {
            unreachable!();
        };
        assert_eq!(bands.fast.len(), 901);

        handle.commands.send(EngineCommand::Shutdown).await.unwrap();
        handle.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_load_more_until_exhausted() {
        let (source, mut handle) = engine(2000);
        handle
            .commands
            .send(EngineCommand::Subscribe {
                symbol: Symbol::new("NSE_TCS"),
                timeframe: Timeframe::Minute1,
            })
            .await
            .unwrap();
        next_matching(&mut handle.events, |e| matches!(e, EngineEvent::Subscribed { .. })).await;

        handle.commands.send(EngineCommand::LoadMore).await.unwrap();
        let event = next_matching(&mut handle.events, |e| {
            matches!(e, EngineEvent::BackfillLoaded { .. })
        })
        .await;
        assert!(matches!(
            event,
            EngineEvent::BackfillLoaded { inserted: 1000, earliest: Some(T0), .. }
        ));

        handle.commands.send(EngineCommand::LoadMore).await.unwrap();
        next_matching(&mut handle.events, |e| {
            matches!(e, EngineEvent::BackfillExhausted { .. })
        })
        .await;
        let calls = source.calls.load(Ordering::SeqCst);

        handle
            .commands
            .send(EngineCommand::VisibleRange {
                range: VisibleRange::new(T0 - 600, T0 + 3600),
                live_mode: false,
            })
            .await
            .unwrap();

        let (reply, answer) = oneshot::channel();
        handle
            .commands
            .send(EngineCommand::Inspect { time: T0 + 10, reply })
            .await
            .unwrap();
        assert_eq!(answer.await.unwrap().map(|b| b.time), Some(T0));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);

        drop(handle.commands);
        handle.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_live_mode_cancels_pending_backfill() {
        let config = EngineConfig::default()
            .with_debounce(Duration::from_millis(200), Duration::from_millis(5));
        let (source, mut handle) = engine_with(5000, config, None);
        subscribe(&mut handle, "NSE_TCS").await;
        next_matching(&mut handle.events, |e| matches!(e, EngineEvent::Subscribed { .. })).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let earliest = T0 + 4000 * 60;
        let latest = T0 + 4999 * 60;
        let near_edge = VisibleRange::new(earliest - 600, earliest + 3600);
        let pinned = VisibleRange::new(latest - 3600, latest);

        for (range, live_mode) in [(near_edge, false), (pinned, true)] {
            handle
                .commands
                .send(EngineCommand::VisibleRange { range, live_mode })
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        for (range, live_mode) in [(near_edge, false), (pinned, false)] {
            handle
                .commands
                .send(EngineCommand::VisibleRange { range, live_mode })
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        handle
            .commands
            .send(EngineCommand::VisibleRange {
                range: near_edge,
                live_mode: false,
            })
            .await
            .unwrap();
        next_matching(&mut handle.events, |e| {
            matches!(e, EngineEvent::BackfillLoaded { .. })
        })
        .await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_repeated_subscribe_keeps_band_recompute() {
        let config = EngineConfig::default()
            .with_debounce(Duration::from_millis(5), Duration::from_millis(300));
        let (source, mut handle) = engine_with(2000, config, None);
        subscribe(&mut handle, "NSE_TCS").await;
        next_matching(&mut handle.events, |e| matches!(e, EngineEvent::Subscribed { .. })).await;

        subscribe(&mut handle, "NSE_TCS").await;
        let event = next_matching(&mut handle.events, |e| {
            matches!(e, EngineEvent::BandsUpdated { .. })
        })
        .await;
        assert!(matches!(event, EngineEvent::BandsUpdated { bands, .. } if bands.fast.len() == 901));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resubscribe_restarts_minute_timer() {
        let (push_events, events_rx) = mpsc::channel(16);
        let (_status, status_rx) = mpsc::channel(16);
        let (outbound, _outbound_rx) = mpsc::channel(64);
        let push = PushHandle {
            events: events_rx,
            status: status_rx,
            outbound,
        };

        let config = EngineConfig::default()
            .with_debounce(Duration::from_millis(5), Duration::from_millis(5))
            .with_minute_timer(Duration::from_millis(600));
        let start = Instant::now();
        let (_, mut handle) = engine_with(2000, config, Some(push));

        subscribe(&mut handle, "NSE_TCS").await;
        next_matching(&mut handle.events, |e| matches!(e, EngineEvent::Subscribed { .. })).await;

        tokio::time::sleep_until(start + Duration::from_millis(300)).await;
        subscribe(&mut handle, "NSE_INFY").await;
        next_matching(&mut handle.events, |e| matches!(e, EngineEvent::Subscribed { .. })).await;
        push_events
            .send(PushEvent::LtpUpdate(LtpUpdate::new("NSE_INFY", 150.0, T0 + 2000 * 60)))
            .await
            .unwrap();

        tokio::time::sleep_until(start + Duration::from_millis(700)).await;
        let early = drain(&mut handle.events);
        assert!(early.iter().any(|e| matches!(e, EngineEvent::PendingBar { .. })));
        assert!(!early.iter().any(|e| matches!(e, EngineEvent::CandlesChanged { .. })));

        let event = next_matching(&mut handle.events, |e| {
            matches!(e, EngineEvent::CandlesChanged { .. })
        })
        .await;
        assert!(matches!(event, EngineEvent::CandlesChanged { count: 1, .. }));
    }

    #[tokio::test]
    async fn test_empty_source_reports_failure() {
        let (_, mut handle) = engine(0);
        handle
            .commands
            .send(EngineCommand::Subscribe {
                symbol: Symbol::new("NSE_NONE"),
                timeframe: Timeframe::Minute1,
            })
            .await
            .unwrap();

        let event = next_matching(&mut handle.events, |e| {
            matches!(e, EngineEvent::SubscribeFailed { .. })
        })
        .await;
        assert!(matches!(event, EngineEvent::SubscribeFailed { reason, .. } if reason == "no data"));

        let (reply, answer) = oneshot::channel();
        handle
            .commands
            .send(EngineCommand::Inspect { time: T0, reply })
            .await
            .unwrap();
        assert_eq!(answer.await.unwrap(), None);
    }
}
