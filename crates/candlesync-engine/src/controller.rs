//! Subscription controller: the synchronous core of the engine.
//!
//! The controller owns the active [`Session`] and applies every mutation
//! (loads, backfill pages, live bars, ticks, timers) on the caller's thread.
//! It performs no I/O: operations that need data return a [`FetchTask`],
//! and the result is handed back through the matching `complete_*` call,
//! where it is checked against the session that asked for it.

use candlesync_fetch::{ClientMessage, FetchError, PageRequest};
use candlesync_indicators::BandSettings;
use candlesync_types::{Bar, LtpUpdate, RawBar, Symbol, Timeframe, normalize_batch};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    BackfillOutcome, BackfillCursor, EngineConfig, EngineError, EngineEvent, FetchKind, FetchTask,
    Session, SessionId, UpsertOutcome, VisibleRange,
};

/// Externally visible subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// No session.
    Unsubscribed,
    /// Initial page in flight.
    Loading(SessionId),
    /// Series loaded and live.
    Subscribed(SessionId),
}

/// Reconciles initial loads, backfill, live bars and ticks into one series.
#[derive(Debug)]
pub struct SubscriptionController {
    config: EngineConfig,
    bands: BandSettings,
    session: Option<Session>,
    last_failed: Option<(Symbol, Timeframe)>,
    data_pull: bool,
    bands_requested: bool,
    events: Vec<EngineEvent>,
}

impl SubscriptionController {
    /// Creates an unsubscribed controller.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            bands: config.bands,
            config,
            session: None,
            last_failed: None,
            data_pull: false,
            bands_requested: false,
            events: Vec::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the subscription state.
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        match &self.session {
            None => SubscriptionState::Unsubscribed,
            Some(s) if s.is_live() => SubscriptionState::Subscribed(s.id()),
            Some(s) => SubscriptionState::Loading(s.id()),
        }
    }

    /// Returns the active session.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Returns the series of the live session.
    #[must_use]
    pub fn series(&self) -> Option<&crate::Series> {
        self.live().map(Session::series)
    }

    /// Returns the current band parameters.
    #[must_use]
    pub const fn band_settings(&self) -> &BandSettings {
        &self.bands
    }

    /// Returns true if data-pull mode is on.
    #[must_use]
    pub const fn data_pull(&self) -> bool {
        self.data_pull
    }

    /// Takes the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Returns and clears the pending band-recompute request.
    pub fn take_band_request(&mut self) -> bool {
        std::mem::take(&mut self.bands_requested)
    }

    /// Starts a subscription to `symbol` at `timeframe`.
    ///
    /// Any current session is torn down first. Returns the initial page
    /// fetch, or `None` if that exact subscription is already active.
    pub fn begin_subscribe(&mut self, symbol: Symbol, timeframe: Timeframe) -> Option<FetchTask> {
        if self
            .session
            .as_ref()
            .is_some_and(|s| s.symbol() == &symbol && s.timeframe() == timeframe)
        {
            debug!(%symbol, %timeframe, "already subscribed");
            return None;
        }

        self.unsubscribe();
        self.last_failed = None;

        let session = Session::new(symbol, timeframe, self.config.max_retained);
        info!(
            symbol = %session.symbol(),
            timeframe = %timeframe,
            session = %session.id(),
            "subscribing"
        );
        let task = self.task_for(
            &session,
            FetchKind::Initial,
            PageRequest::latest(session.symbol().clone(), timeframe, self.config.initial_page_size),
        );
        self.session = Some(session);
        Some(task)
    }

    /// Applies the initial page for `session`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StaleResponse`] if `session` is not the loading
    /// session, [`EngineError::Fetch`] if the fetch failed and
    /// [`EngineError::EmptyResponse`] if no valid bar was returned. The last
    /// two leave the controller unsubscribed.
    pub fn complete_subscribe(
        &mut self,
        session: SessionId,
        result: Result<Vec<RawBar>, FetchError>,
        now: i64,
    ) -> Result<(), EngineError> {
        let Some(active) = self
            .session
            .as_mut()
            .filter(|s| s.id() == session && !s.is_live())
        else {
            debug!(%session, "discarding stale initial page");
            return Err(EngineError::StaleResponse { session });
        };

        let bars = match result {
            Ok(raws) => normalize_batch(&raws),
            Err(e) => {
                self.fail_subscribe(e.to_string());
                return Err(e.into());
            }
        };
        if bars.is_empty() {
            let symbol = active.symbol().clone();
            self.fail_subscribe("no data".to_string());
            return Err(EngineError::EmptyResponse { symbol });
        }

        active.series.set_all(bars);
        active.cursor = BackfillCursor::for_series(&active.series);
        active.go_live();

        let symbol = active.symbol().clone();
        let timeframe = active.timeframe();
        let stored = active.series.len();
        info!(%symbol, %timeframe, bars = stored, "subscribed");

        self.events
            .push(EngineEvent::Push(ClientMessage::symbol_subscribed(&symbol, now)));
        self.events
            .push(EngineEvent::Push(ClientMessage::subscribe(&symbol, timeframe)));
        self.events.push(EngineEvent::Subscribed {
            session,
            symbol,
            timeframe,
            bars: stored,
        });
        self.emit_series();
        self.bands_requested = true;
        Ok(())
    }

    fn fail_subscribe(&mut self, reason: String) {
        if let Some(mut session) = self.session.take() {
            warn!(symbol = %session.symbol(), %reason, "subscribe failed");
            session.close();
            self.events.push(EngineEvent::SubscribeFailed {
                symbol: session.symbol().clone(),
                timeframe: session.timeframe(),
                reason,
            });
            self.last_failed = Some((session.symbol().clone(), session.timeframe()));
        }
    }

    /// Resubscribes the current symbol at a new timeframe.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotSubscribed`] when there is no session.
    pub fn change_timeframe(&mut self, timeframe: Timeframe) -> Result<Option<FetchTask>, EngineError> {
        let symbol = self
            .session
            .as_ref()
            .map(|s| s.symbol().clone())
            .ok_or(EngineError::NotSubscribed)?;
        Ok(self.begin_subscribe(symbol, timeframe))
    }

    /// Ends the current session. Returns false if there was none.
    ///
    /// The pending minute bar is discarded, the series and cursor cleared,
    /// in-flight work cancelled, data pull stopped and the push channel
    /// told to unsubscribe.
    pub fn unsubscribe(&mut self) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };
        let was_live = session.is_live();
        session.close();
        info!(symbol = %session.symbol(), session = %session.id(), "unsubscribed");

        if was_live {
            self.events
                .push(EngineEvent::Push(ClientMessage::unsubscribe(session.symbol())));
        }
        self.events.push(EngineEvent::Unsubscribed {
            symbol: session.symbol().clone(),
        });
        self.bands_requested = false;
        let _ = self.set_data_pull(false);
        true
    }

    /// Returns true if `range` is close enough to the oldest loaded bar to
    /// warrant another page.
    #[must_use]
    pub fn should_backfill(&self, range: VisibleRange, live_mode: bool) -> bool {
        self.live().is_some_and(|s| {
            s.cursor.can_load()
                && self
                    .config
                    .backfill_trigger
                    .should_load(range, s.cursor.earliest_loaded_time, live_mode)
        })
    }

    /// Starts loading the next older page.
    ///
    /// Returns `None` when not live, already loading, or exhausted.
    pub fn begin_backfill(&mut self) -> Option<FetchTask> {
        let page_size = self.config.backfill_page_size;
        let session = self.session.as_mut().filter(|s| s.is_live())?;
        let offset = session.cursor.begin(session.series.len(), page_size)?;
        debug!(symbol = %session.symbol(), offset, "loading older page");

        let request = PageRequest::new(
            session.symbol().clone(),
            session.timeframe(),
            page_size,
            offset,
        );
        let session = self.session.as_ref()?;
        Some(self.task_for(session, FetchKind::Backfill, request))
    }

    /// Applies a backfill page for `session`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::StaleResponse`] for a page from an abandoned
    /// session and [`EngineError::Fetch`] if the fetch failed.
    pub fn complete_backfill(
        &mut self,
        session: SessionId,
        result: Result<Vec<RawBar>, FetchError>,
    ) -> Result<BackfillOutcome, EngineError> {
        let Some(active) = self
            .session
            .as_mut()
            .filter(|s| s.id() == session && s.is_live())
        else {
            debug!(%session, "discarding stale backfill page");
            return Err(EngineError::StaleResponse { session });
        };

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                active.cursor.fail();
                warn!(symbol = %active.symbol(), error = %e, "backfill failed");
                self.events.push(EngineEvent::BackfillFailed {
                    session,
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let outcome = active.cursor.apply(&mut active.series, &page);
        match outcome {
            BackfillOutcome::Exhausted => {
                self.events.push(EngineEvent::BackfillExhausted { session });
            }
            BackfillOutcome::Rejected { records } => {
                warn!(records, "backfill page had no valid bars");
            }
            BackfillOutcome::Loaded(prepend) => {
                let earliest = active.cursor.earliest_loaded_time;
                self.events.push(EngineEvent::BackfillLoaded {
                    session,
                    inserted: prepend.inserted,
                    earliest,
                });
                if prepend.inserted > 0 || prepend.evicted > 0 {
                    self.emit_series();
                    self.bands_requested = true;
                }
            }
        }
        Ok(outcome)
    }

    /// Merges live bars from the push channel, data-pull or refresh.
    ///
    /// Bars older than the newest stored bar are discarded. Returns the
    /// number of changed candles.
    pub fn apply_realtime(&mut self, raws: &[RawBar], now: i64) -> usize {
        let Some(session) = self.live_mut() else {
            debug!("realtime update without live session");
            return 0;
        };

        let mut bars = normalize_batch(raws);
        if let Some(latest) = session.series.latest_time() {
            let before = bars.len();
            bars.retain(|b| b.time >= latest);
            if bars.len() < before {
                debug!(discarded = before - bars.len(), latest, "dropping out-of-order bars");
            }
        }
        if bars.is_empty() {
            return 0;
        }

        let outcome = session.series.upsert_many(&bars);
        self.after_live_merge(outcome, now, true)
    }

    /// Feeds a last-traded-price tick into the minute aggregator.
    ///
    /// Ticks for other symbols, without a usable price, or before the
    /// session is live are ignored.
    pub fn apply_ltp(&mut self, update: &LtpUpdate, now: i64) {
        let Some(session) = self.live_mut() else {
            return;
        };
        if session.symbol().as_str() != update.symbol {
            return;
        }
        let Some(price) = update.price() else {
            if let Some(error) = &update.error {
                debug!(symbol = %update.symbol, %error, "ltp unavailable");
            }
            return;
        };

        let time = update.time_or(now);
        let outcome = session.aggregator.on_tick(price, time);
        let id = session.id();
        let symbol = session.symbol().clone();

        self.events.push(EngineEvent::Ltp {
            symbol,
            price,
            time,
        });
        if let Some(flushed) = outcome.flushed() {
            self.merge_synthetic(flushed, now);
        }
        if let Some(bar) = outcome.pending() {
            self.events.push(EngineEvent::PendingBar { session: id, bar });
        }
    }

    /// Flushes the pending minute bar if its minute has elapsed.
    pub fn on_minute_timer(&mut self, now: i64) {
        let flushed = self
            .live_mut()
            .and_then(|s| s.aggregator.flush_if_stale(now));
        if let Some(bar) = flushed {
            debug!(time = bar.time, "flushing stale minute bar");
            self.merge_synthetic(bar, now);
        }
    }

    fn merge_synthetic(&mut self, bar: Bar, now: i64) {
        let Some(session) = self.live_mut() else {
            return;
        };
        let outcome = session.series.upsert_many(&[bar]);
        self.after_live_merge(outcome, now, false);
    }

    /// Publishes the effects of a live merge. `announce` sends the
    /// `DataPulled` notice, which only fetched or pushed bars carry.
    fn after_live_merge(&mut self, outcome: UpsertOutcome, now: i64, announce: bool) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        session.cursor.sync(&session.series);

        let count = outcome.changed_candles();
        if count > 0 {
            let id = session.id();
            self.events.push(EngineEvent::CandlesChanged { session: id, count });
            if announce {
                let notice =
                    ClientMessage::data_pulled(session.symbol(), session.timeframe(), now);
                self.events.push(EngineEvent::Push(notice));
            }
        }
        if !outcome.is_noop() {
            self.emit_series();
            self.bands_requested = true;
        }
        count
    }

    /// Recomputes both bands over the live series.
    pub fn recompute_bands(&mut self) {
        let Some(session) = self.live() else {
            return;
        };
        let bands = self.bands.compute(session.series().bars());
        let id = session.id();
        self.events.push(EngineEvent::BandsUpdated { session: id, bands });
    }

    /// Replaces the band parameters and requests a recompute.
    pub fn set_band_settings(&mut self, bands: BandSettings) {
        self.bands = bands;
        self.bands_requested = self.live().is_some();
    }

    /// Looks up the stored bar nearest to `time`.
    #[must_use]
    pub fn find_nearest(&self, time: i64) -> Option<Bar> {
        self.series()?
            .find_nearest(time, self.config.nearest_tolerance)
            .copied()
    }

    /// Toggles data-pull mode. Enabling it on a live session returns a
    /// fetch for the latest bars.
    pub fn set_data_pull(&mut self, enabled: bool) -> Option<FetchTask> {
        if self.data_pull != enabled {
            info!(enabled, "data pull toggled");
            self.data_pull = enabled;
            self.events.push(EngineEvent::DataPull { enabled });
        }
        if !enabled {
            return None;
        }
        let session = self.live()?;
        let request = PageRequest::latest(
            session.symbol().clone(),
            session.timeframe(),
            self.config.pull_page_size,
        );
        Some(self.task_for(session, FetchKind::Pull, request))
    }

    /// Re-announces the live subscription after the push channel connects.
    pub fn on_push_connected(&mut self, now: i64) {
        let Some(session) = self.live() else {
            return;
        };
        let messages = [
            ClientMessage::symbol_subscribed(session.symbol(), now),
            ClientMessage::subscribe(session.symbol(), session.timeframe()),
        ];
        self.events.extend(messages.map(EngineEvent::Push));
    }

    /// Disables data-pull mode after the push channel drops.
    pub fn on_push_disconnected(&mut self) {
        self.set_data_pull(false);
    }

    /// Requests fresh data.
    ///
    /// A live session fetches the latest page and merges it like a live
    /// update; after a failed subscribe the initial load is retried.
    pub fn begin_refresh(&mut self) -> Option<FetchTask> {
        if let Some(session) = self.live() {
            let request = PageRequest::latest(
                session.symbol().clone(),
                session.timeframe(),
                self.config.refresh_page_size,
            );
            return Some(self.task_for(session, FetchKind::Refresh, request));
        }
        if self.session.is_none() {
            let (symbol, timeframe) = self.last_failed.take()?;
            return self.begin_subscribe(symbol, timeframe);
        }
        None
    }

    /// Routes a finished fetch to the matching completion.
    ///
    /// # Errors
    ///
    /// Propagates the error of the completion; pull and refresh fetches
    /// report [`EngineError::StaleResponse`] and [`EngineError::Fetch`].
    pub fn complete_fetch(
        &mut self,
        task: &FetchTask,
        result: Result<Vec<RawBar>, FetchError>,
        now: i64,
    ) -> Result<(), EngineError> {
        match task.kind {
            FetchKind::Initial => self.complete_subscribe(task.session, result, now),
            FetchKind::Backfill => self.complete_backfill(task.session, result).map(|_| ()),
            FetchKind::Pull | FetchKind::Refresh => {
                if self.live().is_none_or(|s| s.id() != task.session) {
                    debug!(session = %task.session, "discarding stale latest page");
                    return Err(EngineError::StaleResponse {
                        session: task.session,
                    });
                }
                let raws = result?;
                self.apply_realtime(&raws, now);
                Ok(())
            }
        }
    }

    fn live(&self) -> Option<&Session> {
        self.session.as_ref().filter(|s| s.is_live())
    }

    fn live_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut().filter(|s| s.is_live())
    }

    fn emit_series(&mut self) {
        if let Some(session) = self.session.as_ref() {
            self.events.push(EngineEvent::SeriesUpdated {
                session: session.id(),
                bars: Arc::from(session.series().bars()),
            });
        }
    }

    fn task_for(&self, session: &Session, kind: FetchKind, request: PageRequest) -> FetchTask {
        FetchTask {
            session: session.id(),
            kind,
            request,
            cancel: session.token().clone(),
        }
    }
}
