use crate::error::FeedError;
use std::sync::Arc;
use url::Url;

/// Validates a candidate URL for use as a new subscription.
///
/// Two checks, in order:
///
/// 1. The candidate must parse as an absolute URL with an `http` or `https`
///    scheme, otherwise [`FeedError::NotAUrl`].
/// 2. The candidate must not already be present in `existing` (exact string
///    match, no normalization), otherwise [`FeedError::AlreadySubscribed`].
///
/// Pure and synchronous; no side effects. The parsed [`Url`] is returned for
/// callers that want host/scheme introspection, but the subscription list
/// stores the candidate string as submitted.
pub fn validate_subscription(candidate: &str, existing: &[Arc<str>]) -> Result<Url, FeedError> {
    let url = Url::parse(candidate).map_err(|e| FeedError::NotAUrl(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedError::NotAUrl(format!(
                "unsupported scheme '{scheme}' (only http/https)"
            )))
        }
    }

    if existing.iter().any(|u| u.as_ref() == candidate) {
        return Err(FeedError::AlreadySubscribed(candidate.to_owned()));
    }

    Ok(url)
}
