//! The engine façade: ties the store, the feed adapters, and the
//! submission state machine together behind one handle.

use crate::config::Config;
use crate::error::FeedError;
use crate::feed::{build_client, fetch_document, parse_feed};
use crate::state::{ChangeKind, Feed, FormState, Snapshot, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// The aggregation engine.
///
/// Owns the state [`Store`] and the shared HTTP client. Cloning is cheap and
/// all clones share state, so the same `Aggregator` can serve the
/// submission path and any number of observers while a [`crate::Poller`]
/// runs against its store.
#[derive(Clone)]
pub struct Aggregator {
    store: Store,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl Aggregator {
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        Ok(Self {
            store: Store::new(),
            client: build_client()?,
            request_timeout: config.request_timeout(),
        })
    }

    /// The underlying state store, e.g. for constructing a [`crate::Poller`].
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The shared HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Read-only snapshot of the whole engine state.
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Subscribe to change notifications; see [`Store::subscribe_changes`].
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeKind> {
        self.store.subscribe_changes()
    }

    /// Submit a candidate URL as a new subscription.
    ///
    /// Drives the form state machine through one full attempt:
    ///
    /// - validation failure → form stays `Filling` with the error payload
    /// - valid input → form moves to `Sending` and the document is fetched
    /// - fetch+parse success → subscription recorded, feed and entries
    ///   ingested, form moves to `Added`
    /// - fetch or parse failure → form moves to `Error` with the classified
    ///   error
    ///
    /// A later submission re-enters here from validation whatever state the
    /// form was left in; there is no separate reset step.
    ///
    /// # Errors
    ///
    /// The same [`FeedError`] recorded in the form state, so callers can
    /// either inspect the return value or observe the `Form` change.
    pub async fn submit_new_subscription(&self, raw_url: &str) -> Result<Arc<Feed>, FeedError> {
        let candidate = raw_url.trim();

        if let Err(e) =
            crate::validate::validate_subscription(candidate, &self.store.subscriptions())
        {
            tracing::debug!(url = candidate, kind = e.kind(), "Submission rejected");
            self.store.set_form(FormState::filling_with(e.clone()));
            return Err(e);
        }

        self.store.set_form(FormState::sending());

        let fetched = async {
            let bytes = fetch_document(&self.client, candidate, self.request_timeout).await?;
            parse_feed(&bytes)
        }
        .await;

        match fetched.and_then(|parsed| self.store.ingest_initial(candidate, parsed)) {
            Ok(outcome) => {
                self.store.set_form(FormState::added());
                Ok(outcome.feed)
            }
            Err(e) => {
                tracing::warn!(url = candidate, kind = e.kind(), error = %e, "Submission failed");
                self.store.set_form(FormState::failed(e.clone()));
                Err(e)
            }
        }
    }

    /// Mark the entry identified by `link` as read. See
    /// [`Store::mark_entry_read`].
    pub fn mark_entry_read(&self, link: &str) -> bool {
        self.store.mark_entry_read(link)
    }

    /// Remove a subscription; polling stops for that source on the next
    /// tick. See [`Store::unsubscribe`].
    pub fn unsubscribe(&self, url: &str) -> bool {
        self.store.unsubscribe(url)
    }
}
