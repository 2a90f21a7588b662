//! The reconciliation engine: merges freshly fetched entries into the
//! store without duplication.
//!
//! Entry identity is the `link`. The classify-and-merge step runs entirely
//! under the store's write lock, so the "no two entries share a link"
//! invariant holds even when the submission path and the polling task race.
//!
//! Ordering rule: newly discovered entries for one pass form a single block
//! ordered by source (subscription order) and then by document order within
//! each source; the block is prepended ahead of everything already held, so
//! the entry list stays most-recent-first by construction. Completion order
//! of the underlying fetches never influences entry order.

use crate::error::FeedError;
use crate::feed::parser::{ParsedEntry, ParsedFeed};
use crate::state::{ChangeKind, Entry, Feed, FeedId, Store};
use std::sync::Arc;

/// Fetched and parsed entries for one source, fed to [`Store::reconcile`].
#[derive(Debug, Clone)]
pub struct SourceBatch {
    /// The subscription the batch was fetched from.
    pub subscription_url: Arc<str>,
    /// Entries in document order.
    pub entries: Vec<ParsedEntry>,
}

/// Result of ingesting a brand-new subscription.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub feed: Arc<Feed>,
    /// Entries created from the initial document, in document order.
    pub new_entries: Vec<Arc<Entry>>,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Entries discovered this pass, in the order they were prepended.
    pub new_entries: Vec<Arc<Entry>>,
    /// Size of the merged entry collection after the pass.
    pub total_entries: usize,
}

impl Store {
    /// Ingest a new subscription's first successful fetch+parse.
    ///
    /// Called exactly once per subscription, from the submission path:
    /// appends the subscription URL, assigns a fresh [`Feed`] identity,
    /// prepends the feed, and prepends entries for every item whose link is
    /// not already held. Feed metadata is fixed here; later fetches only
    /// contribute entries.
    ///
    /// # Errors
    ///
    /// [`FeedError::AlreadySubscribed`] if the URL is already in the
    /// subscription list. Validation runs before the fetch, but the fetch is
    /// a suspension point, so the check is repeated under the lock to close
    /// the race between two concurrent submissions of the same URL.
    pub fn ingest_initial(
        &self,
        subscription_url: &str,
        parsed: ParsedFeed,
    ) -> Result<IngestOutcome, FeedError> {
        let (outcome, added_entries) = {
            let mut state = self.write();

            if state
                .subscriptions
                .iter()
                .any(|u| u.as_ref() == subscription_url)
            {
                return Err(FeedError::AlreadySubscribed(subscription_url.to_owned()));
            }

            let url: Arc<str> = Arc::from(subscription_url);
            let feed = Arc::new(Feed {
                id: self.next_feed_id(),
                title: Arc::from(parsed.title),
                description: Arc::from(parsed.description),
                subscription_url: Arc::clone(&url),
            });

            let new_entries = admit_entries(self, &mut state, feed.id, parsed.entries);

            state.subscriptions.push(url);
            state.feeds.insert(0, Arc::clone(&feed));
            let added = !new_entries.is_empty();
            state.entries.splice(0..0, new_entries.iter().cloned());

            (IngestOutcome { feed, new_entries }, added)
        };

        self.notify(ChangeKind::Subscriptions);
        self.notify(ChangeKind::Feeds);
        if added_entries {
            self.notify(ChangeKind::Entries);
        }

        tracing::info!(
            feed = %outcome.feed.id,
            source = %outcome.feed.subscription_url,
            entries = outcome.new_entries.len(),
            "Subscription ingested"
        );
        Ok(outcome)
    }

    /// Merge one polling pass's fetched batches into the store.
    ///
    /// For every batch (given in subscription order), entries whose link is
    /// already held are discarded; their stale metadata is accepted as-is
    /// and never overwrites the stored entry. The remainder are assigned
    /// fresh identities and prepended as one block. Batches for sources
    /// with no ingested feed (e.g. unsubscribed mid-flight) are dropped.
    ///
    /// Never touches the read set, and never removes an entry: the entry
    /// collection only grows.
    ///
    /// Reconciling the same batches twice in a row yields an empty outcome
    /// the second time.
    pub fn reconcile(&self, batches: Vec<SourceBatch>) -> ReconcileOutcome {
        let outcome = {
            let mut state = self.write();

            let mut new_entries: Vec<Arc<Entry>> = Vec::new();
            for batch in batches {
                let feed_id = state
                    .feeds
                    .iter()
                    .find(|f| f.subscription_url == batch.subscription_url)
                    .map(|f| f.id);
                let Some(feed_id) = feed_id else {
                    tracing::debug!(
                        source = %batch.subscription_url,
                        "Dropping batch for source with no ingested feed"
                    );
                    continue;
                };
                new_entries.extend(admit_entries(self, &mut state, feed_id, batch.entries));
            }

            state.entries.splice(0..0, new_entries.iter().cloned());
            ReconcileOutcome {
                new_entries,
                total_entries: state.entries.len(),
            }
        };

        if !outcome.new_entries.is_empty() {
            self.notify(ChangeKind::Entries);
        }
        outcome
    }
}

/// Classify candidates against the dedup index, admit the new ones.
///
/// Builds entries for every candidate link not yet in `known_links`, in the
/// order given, registering each admitted link so duplicates within the
/// same pass collapse too. Caller prepends the returned block.
fn admit_entries(
    store: &Store,
    state: &mut crate::state::State,
    feed_id: FeedId,
    candidates: Vec<ParsedEntry>,
) -> Vec<Arc<Entry>> {
    let mut admitted = Vec::new();
    for candidate in candidates {
        if state.known_links.contains(candidate.link.as_str()) {
            continue;
        }
        let link: Arc<str> = Arc::from(candidate.link);
        state.known_links.insert(Arc::clone(&link));
        admitted.push(Arc::new(Entry {
            id: store.next_entry_id(),
            feed_id,
            title: Arc::from(candidate.title),
            description: Arc::from(candidate.description),
            link,
        }));
    }
    admitted
}
