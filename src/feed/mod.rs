//! Feed adapters: HTTP retrieval and RSS/Atom parsing.
//!
//! The rest of the engine treats these as opaque operations with a defined
//! contract:
//!
//! - [`fetcher::fetch_document`] — URL to raw bytes, failing with
//!   [`crate::FeedError::Network`]
//! - [`parser::parse_feed`] — raw bytes to a structured feed + entries
//!   pair, failing with [`crate::FeedError::InvalidFeedFormat`]

pub mod fetcher;
pub mod parser;

pub use fetcher::{build_client, fetch_document};
pub use parser::{parse_feed, ParsedEntry, ParsedFeed};
