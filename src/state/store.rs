use super::types::{ChangeKind, Entry, EntryId, Feed, FeedId, FormState, Snapshot};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Capacity of the change-notification channel. Observers that fall more
/// than this far behind see a `Lagged` error and should re-snapshot.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// All mutable engine state behind the store's lock.
///
/// `known_links` is a dedup index over `entries`: it holds exactly the set
/// of links currently present in the entry collection, so reconciliation
/// classifies candidates in O(1) instead of scanning the list.
#[derive(Default)]
pub(crate) struct State {
    pub(crate) form: FormState,
    pub(crate) subscriptions: Vec<Arc<str>>,
    pub(crate) feeds: Vec<Arc<Feed>>,
    pub(crate) entries: Vec<Arc<Entry>>,
    pub(crate) known_links: HashSet<Arc<str>>,
    pub(crate) read_links: HashSet<Arc<str>>,
}

struct Shared {
    state: RwLock<State>,
    changes: broadcast::Sender<ChangeKind>,
    next_id: AtomicU64,
}

/// The engine's state container.
///
/// Replaces ambient global state with an explicit store: reads go through
/// [`Store::snapshot`], writes only through defined methods, and every
/// mutation publishes a [`ChangeKind`] to subscribers identifying which
/// facet changed.
///
/// Cloning is cheap (a reference-count bump); all clones share the same
/// state. Access is serialized by an interior lock, so the store is safe to
/// share between the submission path and the polling task on a
/// multi-threaded runtime.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Shared>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Shared {
                state: RwLock::new(State::default()),
                changes,
                // Start at 1 so ids are never zero, which makes accidental
                // Default::default() ids stand out in logs.
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribe to change notifications.
    ///
    /// Each mutation sends one [`ChangeKind`] per facet it touched. There is
    /// no replay: a new subscriber should take a [`Store::snapshot`] first,
    /// then apply notifications on top.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeKind> {
        self.inner.changes.subscribe()
    }

    /// Take a read-only, point-in-time copy of the whole store.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.read();
        Snapshot {
            form: state.form.clone(),
            subscriptions: state.subscriptions.clone(),
            feeds: state.feeds.clone(),
            entries: state.entries.clone(),
            read_links: state.read_links.clone(),
        }
    }

    /// Current form state.
    pub fn form(&self) -> FormState {
        self.read().form.clone()
    }

    /// Current subscription list, oldest first.
    ///
    /// The polling scheduler reads this at the start of every tick, so a
    /// subscription added mid-tick is picked up at the next tick boundary.
    pub fn subscriptions(&self) -> Vec<Arc<str>> {
        self.read().subscriptions.clone()
    }

    /// Replace the form state and notify observers.
    pub(crate) fn set_form(&self, form: FormState) {
        self.write().form = form;
        self.notify(ChangeKind::Form);
    }

    /// Mark the entry identified by `link` as read.
    ///
    /// Returns `true` if the link was newly marked. Links that do not match
    /// any entry in the store are ignored, and already-read links stay read:
    /// the read set only ever grows.
    pub fn mark_entry_read(&self, link: &str) -> bool {
        let marked = {
            let mut state = self.write();
            // Reuse the Arc already held by the dedup index instead of
            // allocating a second copy of the link.
            let known = match state.known_links.get(link) {
                Some(known) if !state.read_links.contains(link) => Some(Arc::clone(known)),
                _ => None,
            };
            match known {
                Some(known) => state.read_links.insert(known),
                None => false,
            }
        };
        if marked {
            self.notify(ChangeKind::ReadLinks);
        }
        marked
    }

    /// Remove a subscription so the polling scheduler stops fetching it.
    ///
    /// Returns `true` if the URL was present. Feeds and entries already
    /// ingested from the source are retained; entries are never deleted.
    pub fn unsubscribe(&self, url: &str) -> bool {
        let removed = {
            let mut state = self.write();
            let before = state.subscriptions.len();
            state.subscriptions.retain(|u| u.as_ref() != url);
            state.subscriptions.len() != before
        };
        if removed {
            self.notify(ChangeKind::Subscriptions);
        }
        removed
    }

    /// Number of entries currently held. Primarily for logging and tests.
    pub fn entry_count(&self) -> usize {
        self.read().entries.len()
    }

    // ------------------------------------------------------------------
    // Internals shared with the reconciliation engine
    // ------------------------------------------------------------------

    pub(crate) fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        // Lock poisoning only happens if a writer panicked; the state is
        // value-consistent (mutations build locally, then assign), so
        // recover the guard rather than propagate the panic.
        self.inner
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.inner
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn notify(&self, change: ChangeKind) {
        // Err means no live subscribers, which is fine.
        let _ = self.inner.changes.send(change);
    }

    pub(crate) fn next_feed_id(&self) -> FeedId {
        FeedId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn next_entry_id(&self) -> EntryId {
        EntryId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }
}
