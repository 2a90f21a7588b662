use thiserror::Error;

/// The single error type surfaced by the engine.
///
/// Every failure in the subscribe/poll pipeline collapses into one of four
/// kinds, each carrying a human-readable message. Validation errors are
/// produced synchronously on submission; `Network` and `InvalidFeedFormat`
/// come from the fetch and parse adapters and are surfaced to the user only
/// on the initial-submission path. On the polling path they are logged and
/// the affected source is skipped for that tick.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The candidate is not a well-formed absolute http(s) URL.
    #[error("not a valid URL: {0}")]
    NotAUrl(String),
    /// The exact URL string is already in the subscription list.
    #[error("feed already subscribed: {0}")]
    AlreadySubscribed(String),
    /// Transport-level failure: connection, TLS, timeout, non-2xx status,
    /// or an oversized response body.
    #[error("network error: {0}")]
    Network(String),
    /// The fetched document is not a recognizable RSS or Atom feed.
    #[error("not a valid RSS/Atom feed: {0}")]
    InvalidFeedFormat(String),
}

impl FeedError {
    /// Stable kind name for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::NotAUrl(_) => "not_a_url",
            FeedError::AlreadySubscribed(_) => "already_subscribed",
            FeedError::Network(_) => "network",
            FeedError::InvalidFeedFormat(_) => "invalid_feed_format",
        }
    }
}
