//! steep — an in-memory feed aggregation engine.
//!
//! A user submits feed URLs; the engine fetches and parses the documents,
//! merges entries into a single deduplicated collection keyed by entry
//! link, tracks per-entry read status, and polls every subscription on a
//! fixed interval with per-source failure isolation.
//!
//! The pieces:
//!
//! - [`Aggregator`] — façade: submission state machine, read tracking,
//!   unsubscribe
//! - [`Store`] — explicit state container with [`Store::snapshot`] and
//!   [`Store::subscribe_changes`]; the reconciliation engine
//!   ([`Store::ingest_initial`], [`Store::reconcile`]) lives on it
//! - [`Poller`] — the repeating fetch-all → reconcile → re-arm loop
//! - [`feed`] — the fetch (reqwest) and parse (feed-rs) adapters
//!
//! Nothing persists across restarts and nothing is ever evicted: the entry
//! collection grows without bound for the lifetime of the process.

pub mod app;
pub mod config;
pub mod error;
pub mod feed;
pub mod poll;
pub mod reconcile;
pub mod state;
pub mod validate;

pub use app::Aggregator;
pub use config::Config;
pub use error::FeedError;
pub use poll::{Poller, Shutdown, TickReport};
pub use reconcile::{IngestOutcome, ReconcileOutcome, SourceBatch};
pub use state::{ChangeKind, Entry, EntryId, Feed, FeedId, FormState, FormStatus, Snapshot, Store};
pub use validate::validate_subscription;
