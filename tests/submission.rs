//! Integration tests for the add-subscription pipeline: validation, the
//! form state machine, and initial ingestion against a mock HTTP server.

use pretty_assertions::assert_eq;
use steep::{Aggregator, ChangeKind, Config, FeedError, FormStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const THREE_ITEM_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example Feed</title>
    <description>Example description</description>
    <item><title>One</title><description>d1</description><link>https://example.com/1</link></item>
    <item><title>Two</title><description>d2</description><link>https://example.com/2</link></item>
    <item><title>Three</title><description>d3</description><link>https://example.com/3</link></item>
</channel></rss>"#;

fn aggregator() -> Aggregator {
    Aggregator::new(&Config::default()).unwrap()
}

async fn serve_rss(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/xml"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_submit_success_adds_feed_and_entries() {
    let server = MockServer::start().await;
    serve_rss(&server, "/rss", THREE_ITEM_RSS).await;

    let aggregator = aggregator();
    let url = format!("{}/rss", server.uri());
    let feed = aggregator.submit_new_subscription(&url).await.unwrap();
    assert_eq!(&*feed.title, "Example Feed");

    let snap = aggregator.snapshot();
    assert_eq!(snap.form.status, FormStatus::Added);
    assert!(snap.form.error.is_none());
    assert_eq!(snap.subscriptions.len(), 1);
    assert_eq!(&*snap.subscriptions[0], url.as_str());
    assert_eq!(snap.feeds.len(), 1);
    assert_eq!(snap.entries.len(), 3);
    assert!(snap.entries.iter().all(|e| e.feed_id == feed.id));
}

#[tokio::test]
async fn test_invalid_url_keeps_form_filling() {
    let aggregator = aggregator();

    let err = aggregator
        .submit_new_subscription("not-a-url")
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::NotAUrl(_)));

    let snap = aggregator.snapshot();
    assert_eq!(snap.form.status, FormStatus::Filling);
    assert!(matches!(snap.form.error, Some(FeedError::NotAUrl(_))));
    assert!(snap.subscriptions.is_empty());
    assert!(snap.feeds.is_empty());
}

#[tokio::test]
async fn test_invalid_url_never_reaches_sending() {
    let aggregator = aggregator();
    let mut rx = aggregator.subscribe_changes();

    let _ = aggregator.submit_new_subscription("::nope::").await;

    // Exactly one Form notification, and the recorded state is Filling.
    assert_eq!(rx.try_recv().unwrap(), ChangeKind::Form);
    assert!(rx.try_recv().is_err());
    assert_eq!(aggregator.snapshot().form.status, FormStatus::Filling);
}

#[tokio::test]
async fn test_duplicate_submission_rejected() {
    let server = MockServer::start().await;
    serve_rss(&server, "/rss", THREE_ITEM_RSS).await;

    let aggregator = aggregator();
    let url = format!("{}/rss", server.uri());
    aggregator.submit_new_subscription(&url).await.unwrap();

    let err = aggregator.submit_new_subscription(&url).await.unwrap_err();
    assert_eq!(err, FeedError::AlreadySubscribed(url));

    let snap = aggregator.snapshot();
    assert_eq!(snap.form.status, FormStatus::Filling);
    assert_eq!(snap.feeds.len(), 1);
    assert_eq!(snap.entries.len(), 3);
}

#[tokio::test]
async fn test_fetch_failure_moves_form_to_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let aggregator = aggregator();
    let url = format!("{}/rss", server.uri());
    let err = aggregator.submit_new_subscription(&url).await.unwrap_err();
    assert!(matches!(err, FeedError::Network(_)));

    let snap = aggregator.snapshot();
    assert_eq!(snap.form.status, FormStatus::Error);
    assert!(matches!(snap.form.error, Some(FeedError::Network(_))));
    // Nothing was ingested.
    assert!(snap.subscriptions.is_empty());
    assert!(snap.feeds.is_empty());
}

#[tokio::test]
async fn test_non_feed_body_is_distinct_from_network_error() {
    let server = MockServer::start().await;
    serve_rss(&server, "/page", "<html><body>not a feed</body></html>").await;

    let aggregator = aggregator();
    let url = format!("{}/page", server.uri());
    let err = aggregator.submit_new_subscription(&url).await.unwrap_err();
    assert!(matches!(err, FeedError::InvalidFeedFormat(_)));

    let snap = aggregator.snapshot();
    assert_eq!(snap.form.status, FormStatus::Error);
    assert!(snap.subscriptions.is_empty());
}

#[tokio::test]
async fn test_failed_submission_can_be_retried() {
    let server = MockServer::start().await;
    serve_rss(&server, "/rss", THREE_ITEM_RSS).await;

    let aggregator = aggregator();

    // First attempt fails outright (nothing listens on port 1).
    let _ = aggregator
        .submit_new_subscription("http://127.0.0.1:1/rss")
        .await;
    assert_eq!(aggregator.snapshot().form.status, FormStatus::Error);

    // The next submission re-enters from validation and succeeds.
    let url = format!("{}/rss", server.uri());
    aggregator.submit_new_subscription(&url).await.unwrap();
    assert_eq!(aggregator.snapshot().form.status, FormStatus::Added);
}

#[tokio::test]
async fn test_form_notifications_for_successful_submit() {
    let server = MockServer::start().await;
    serve_rss(&server, "/rss", THREE_ITEM_RSS).await;

    let aggregator = aggregator();
    let mut rx = aggregator.subscribe_changes();

    let url = format!("{}/rss", server.uri());
    aggregator.submit_new_subscription(&url).await.unwrap();

    // Sending, then the ingest facets, then Added.
    let mut kinds = Vec::new();
    while let Ok(kind) = rx.try_recv() {
        kinds.push(kind);
    }
    assert_eq!(
        kinds,
        vec![
            ChangeKind::Form,
            ChangeKind::Subscriptions,
            ChangeKind::Feeds,
            ChangeKind::Entries,
            ChangeKind::Form,
        ]
    );
}

#[tokio::test]
async fn test_second_feed_prepends() {
    let server = MockServer::start().await;
    serve_rss(&server, "/a", THREE_ITEM_RSS).await;
    serve_rss(
        &server,
        "/b",
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Second Feed</title>
    <item><title>B1</title><link>https://other.com/b1</link></item>
</channel></rss>"#,
    )
    .await;

    let aggregator = aggregator();
    aggregator
        .submit_new_subscription(&format!("{}/a", server.uri()))
        .await
        .unwrap();
    aggregator
        .submit_new_subscription(&format!("{}/b", server.uri()))
        .await
        .unwrap();

    let snap = aggregator.snapshot();
    assert_eq!(&*snap.feeds[0].title, "Second Feed");
    assert_eq!(&*snap.entries[0].link, "https://other.com/b1");
    assert_eq!(snap.entries.len(), 4);
}

#[tokio::test]
async fn test_mark_entry_read_via_facade() {
    let server = MockServer::start().await;
    serve_rss(&server, "/rss", THREE_ITEM_RSS).await;

    let aggregator = aggregator();
    aggregator
        .submit_new_subscription(&format!("{}/rss", server.uri()))
        .await
        .unwrap();

    assert!(aggregator.mark_entry_read("https://example.com/2"));
    let snap = aggregator.snapshot();
    assert!(snap.read_links.contains("https://example.com/2"));
    assert_eq!(snap.read_links.len(), 1);
}

#[tokio::test]
async fn test_submitted_url_is_trimmed() {
    let server = MockServer::start().await;
    serve_rss(&server, "/rss", THREE_ITEM_RSS).await;

    let aggregator = aggregator();
    let url = format!("  {}/rss  ", server.uri());
    aggregator.submit_new_subscription(&url).await.unwrap();

    let snap = aggregator.snapshot();
    assert_eq!(&*snap.subscriptions[0], url.trim());
}
