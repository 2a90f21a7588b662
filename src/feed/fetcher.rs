use crate::error::FeedError;
use futures::StreamExt;
use reqwest::redirect::Policy;
use std::time::Duration;

/// Response bodies above this size are rejected outright.
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Build the shared HTTP client used for all feed fetches.
///
/// - Limits redirects to 3 hops with loop detection
/// - Identifies itself with a stable user agent
///
/// The per-request timeout is applied at the call site so tests and the
/// poller can use the configured value.
pub fn build_client() -> Result<reqwest::Client, FeedError> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .user_agent(concat!("steep/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FeedError::Network(e.to_string()))
}

/// Redirect policy with loop detection and limited hops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Retrieves the raw document at `url`.
///
/// Fails with [`FeedError::Network`] on any transport-level outcome the
/// engine treats as a failed source: connection or TLS errors, the request
/// exceeding `timeout`, a non-2xx status, or a response body over the 10MB
/// cap. The body is read as a stream so an oversized response is abandoned
/// as soon as the limit is crossed.
pub async fn fetch_document(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, FeedError> {
    let response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| FeedError::Network(format!("request timed out after {timeout:?}")))?
        .map_err(|e| FeedError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Network(format!("HTTP status {status}")));
    }

    read_limited_bytes(response, MAX_FEED_SIZE).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FeedError> {
    // Fast path: check Content-Length before reading anything.
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FeedError::Network(format!(
                "response too large ({len} bytes, limit {limit})"
            )));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FeedError::Network(e.to_string()))?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FeedError::Network(format!(
                "response too large (limit {limit} bytes)"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&mock_server)
            .await;

        let client = build_client().unwrap();
        let bytes = fetch_document(&client, &format!("{}/feed", mock_server.uri()), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn test_fetch_404_is_network_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = build_client().unwrap();
        let err = fetch_document(&client, &format!("{}/feed", mock_server.uri()), TIMEOUT)
            .await
            .unwrap_err();
        match err {
            FeedError::Network(msg) => assert!(msg.contains("404"), "got: {msg}"),
            e => panic!("Expected Network error, got {e:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_network_error() {
        let client = build_client().unwrap();
        // Reserved port with nothing listening.
        let err = fetch_document(&client, "http://127.0.0.1:1/feed", TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Network(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_network_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&mock_server)
            .await;

        let client = build_client().unwrap();
        let err = fetch_document(
            &client,
            &format!("{}/feed", mock_server.uri()),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
        match err {
            FeedError::Network(msg) => assert!(msg.contains("timed out"), "got: {msg}"),
            e => panic!("Expected Network error, got {e:?}"),
        }
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mock_server = MockServer::start().await;
        let body = vec![b'x'; MAX_FEED_SIZE + 1];
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&mock_server)
            .await;

        let client = build_client().unwrap();
        let err = fetch_document(&client, &format!("{}/feed", mock_server.uri()), TIMEOUT)
            .await
            .unwrap_err();
        match err {
            FeedError::Network(msg) => assert!(msg.contains("too large"), "got: {msg}"),
            e => panic!("Expected Network error, got {e:?}"),
        }
    }
}
