//! Subscription engine for candlesync.
//!
//! - [`Series`] - Bounded, time-ordered bar store with upsert and prepend
//! - [`BackfillCursor`] - Offset paging of older history with exhaustion
//! - [`SubscriptionController`] - Sans-IO session state machine
//! - [`EngineRuntime`] - Tokio driver for commands, push events and fetches

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod backfill;
mod config;
mod controller;
mod debounce;
mod error;
mod event;
mod runtime;
mod series;
mod session;

pub use backfill::{BackfillCursor, BackfillOutcome, BackfillTrigger, VisibleRange};
pub use config::EngineConfig;
pub use controller::{SubscriptionController, SubscriptionState};
pub use debounce::Debouncer;
pub use error::EngineError;
pub use event::{EngineEvent, FetchKind, FetchTask};
pub use runtime::{EngineCommand, EngineHandle, EngineRuntime};
pub use series::{DEFAULT_MAX_RETAINED, PrependOutcome, Series, UpsertOutcome};
pub use session::{Session, SessionId, SessionPhase};
