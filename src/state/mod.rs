//! The engine's state container and data model.
//!
//! All mutable state lives in a single [`Store`]: the add-subscription form,
//! the subscription list, ingested feeds and entries, and the set of links
//! the user has read. Observers take a [`Snapshot`] and follow
//! [`ChangeKind`] notifications to re-render selectively.

mod store;
mod types;

pub use store::Store;
pub(crate) use store::State;
pub use types::{ChangeKind, Entry, EntryId, Feed, FeedId, FormState, FormStatus, Snapshot};
