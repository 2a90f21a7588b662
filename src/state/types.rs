use crate::error::FeedError;
use std::collections::HashSet;
use std::sync::Arc;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque surrogate identifier for a feed, assigned once at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedId(pub(crate) u64);

/// Opaque surrogate identifier for an entry, assigned once at ingestion.
///
/// Exists for UI indirection only; entry identity for deduplication is the
/// entry's `link`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u64);

impl std::fmt::Display for FeedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "feed_{}", self.0)
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entry_{}", self.0)
    }
}

// ============================================================================
// Data model
// ============================================================================

/// Metadata for one subscription's content source.
///
/// Created when a subscription is first successfully ingested and immutable
/// thereafter; re-fetches contribute entries only. String fields use
/// `Arc<str>` so snapshots clone by reference count.
#[derive(Debug, Clone)]
pub struct Feed {
    pub id: FeedId,
    pub title: Arc<str>,
    pub description: Arc<str>,
    /// The subscription URL this feed was ingested from.
    pub subscription_url: Arc<str>,
}

/// A single item belonging to a feed.
///
/// `link` is the stable identity key: no two entries in the store ever share
/// a link. Entries are never mutated after creation; read status lives in
/// the store's read set, keyed by link.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    pub feed_id: FeedId,
    pub title: Arc<str>,
    pub description: Arc<str>,
    pub link: Arc<str>,
}

// ============================================================================
// Form state machine
// ============================================================================

/// Lifecycle status of the add-subscription form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStatus {
    /// Awaiting user input. May carry a validation error from the last
    /// attempt.
    #[default]
    Filling,
    /// A submission passed validation and the fetch is in flight.
    Sending,
    /// The last submission succeeded; the subscription was added.
    Added,
    /// The last submission failed after validation (fetch or parse).
    Error,
}

/// Transient state of the single add-subscription workflow.
///
/// Re-created on every submission attempt. The error payload is only
/// meaningful in `Filling` (validation failure) and `Error` (fetch/parse
/// failure).
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub status: FormStatus,
    pub error: Option<FeedError>,
}

impl FormState {
    pub(crate) fn sending() -> Self {
        Self {
            status: FormStatus::Sending,
            error: None,
        }
    }

    pub(crate) fn added() -> Self {
        Self {
            status: FormStatus::Added,
            error: None,
        }
    }

    pub(crate) fn filling_with(error: FeedError) -> Self {
        Self {
            status: FormStatus::Filling,
            error: Some(error),
        }
    }

    pub(crate) fn failed(error: FeedError) -> Self {
        Self {
            status: FormStatus::Error,
            error: Some(error),
        }
    }
}

// ============================================================================
// Snapshots and change notification
// ============================================================================

/// Which facet of the store changed, carried by every change notification
/// so observers can re-render selectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Form,
    Subscriptions,
    Feeds,
    Entries,
    ReadLinks,
}

/// Read-only, point-in-time copy of the whole store.
///
/// Cheap to take: collections hold `Arc`'d records, so a snapshot clones
/// reference counts, not strings.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub form: FormState,
    /// Subscription URLs in submission order (oldest first).
    pub subscriptions: Vec<Arc<str>>,
    /// Feeds, most recently added first.
    pub feeds: Vec<Arc<Feed>>,
    /// Entries, most recently discovered first.
    pub entries: Vec<Arc<Entry>>,
    /// Links of entries the user has opened.
    pub read_links: HashSet<Arc<str>>,
}
