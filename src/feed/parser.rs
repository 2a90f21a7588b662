use crate::error::FeedError;
use feed_rs::parser;

/// Structured result of parsing one feed document.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: String,
    pub description: String,
    pub entries: Vec<ParsedEntry>,
}

/// One item from a feed document, in document order.
#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub title: String,
    pub description: String,
    /// Canonical identity used for deduplication across re-fetches.
    pub link: String,
}

/// Parses raw feed-document bytes into a [`ParsedFeed`].
///
/// Accepts both RSS and Atom. Returns [`FeedError::InvalidFeedFormat`] when
/// the bytes are not well-formed XML or lack a recognizable feed/channel
/// element.
///
/// Items without a link carry no dedup identity, so they are skipped with a
/// warning rather than failing the whole document.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, FeedError> {
    let feed = parser::parse(bytes).map_err(|e| FeedError::InvalidFeedFormat(e.to_string()))?;

    let title = feed
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled".to_string());
    let description = feed.description.map(|d| d.content).unwrap_or_default();

    let total = feed.entries.len();
    let entries: Vec<ParsedEntry> = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone())?;
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());
            let description = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();
            Some(ParsedEntry {
                title,
                description,
                link,
            })
        })
        .collect();

    let skipped = total - entries.len();
    if skipped > 0 {
        tracing::warn!(skipped, "Feed items without links skipped");
    }

    Ok(ParsedFeed {
        title,
        description,
        entries,
    })
}
