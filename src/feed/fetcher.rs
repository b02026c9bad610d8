use crate::feed::article::{parse_articles, Article};
use crate::feed::parser::ParseError;
use crate::util::{validate_url, UrlValidationError};
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while retrieving a feed through the relay.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The feed URL is malformed or not allowed
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Relay endpoint is not HTTPS (localhost excepted)
    #[error("Insecure relay URL: HTTPS required (except localhost for testing)")]
    InsecureRelay,
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Relay answered with a non-2xx status
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Relay body is not the expected JSON wrapper
    #[error("Malformed relay response: {0}")]
    Envelope(#[from] serde_json::Error),
    /// Relay wrapper carries no document
    #[error("Relay response contains no document")]
    MissingContents,
    /// Relay reached the feed server, which answered with a non-2xx status
    #[error("Feed server returned status {0}")]
    UpstreamStatus(u16),
    /// Document could not be parsed as XML
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// JSON wrapper returned by the relay.
#[derive(Debug, Deserialize)]
struct RelayEnvelope {
    contents: Option<String>,
    #[serde(default)]
    status: Option<RelayStatus>,
}

#[derive(Debug, Deserialize)]
struct RelayStatus {
    http_code: Option<u16>,
}

/// A CORS relay that fetches a URL on our behalf and wraps the body in JSON.
///
/// The target is passed as the `url` query parameter; the document comes
/// back under `contents`.
#[derive(Debug, Clone)]
pub struct Relay {
    endpoint: Url,
    timeout: Duration,
}

impl Relay {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.allorigins.win/get";

    /// Creates a relay for `endpoint`.
    ///
    /// The relay sees every feed URL we request, so it must be reached over
    /// HTTPS. Plain HTTP is only allowed for `localhost`/`127.0.0.1`.
    pub fn new(endpoint: &str) -> Result<Self, FetchError> {
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| FetchError::InvalidUrl(UrlValidationError::InvalidUrl(e)))?;

        match endpoint.scheme() {
            "https" => {}
            "http" => {
                let is_localhost = matches!(endpoint.host_str(), Some("localhost" | "127.0.0.1"));
                if !is_localhost {
                    tracing::error!(relay = %endpoint, "Rejecting non-HTTPS relay URL");
                    return Err(FetchError::InsecureRelay);
                }
                tracing::warn!(relay = %endpoint, "Using non-HTTPS relay URL (localhost only)");
            }
            scheme => {
                return Err(FetchError::InvalidUrl(
                    UrlValidationError::UnsupportedScheme(scheme.to_owned()),
                ))
            }
        }

        Ok(Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The relay URL that fetches `feed_url`.
    pub fn request_url(&self, feed_url: &Url) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("url", feed_url.as_str());
        url
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(Self::DEFAULT_ENDPOINT).expect("default relay URL is valid"),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Fetches and parses a feed, reporting failures.
///
/// One GET through the relay, then the same pipeline as
/// [`parse_articles`]. Articles come back in feed order.
///
/// # Errors
///
/// - [`FetchError::InvalidUrl`] - feed URL rejected before any request
/// - [`FetchError::Network`] / [`FetchError::Timeout`] - transport failures
/// - [`FetchError::HttpStatus`] - relay answered non-2xx
/// - [`FetchError::ResponseTooLarge`] - body over 10MB
/// - [`FetchError::Envelope`] / [`FetchError::MissingContents`] - unusable relay body
/// - [`FetchError::UpstreamStatus`] - relay reports the feed server failed
/// - [`FetchError::Parse`] - malformed XML
pub async fn try_fetch_feed(
    client: &reqwest::Client,
    relay: &Relay,
    feed_url: &str,
) -> Result<Vec<Article>, FetchError> {
    let feed = validate_url(feed_url)?;
    let request_url = relay.request_url(&feed);

    tracing::debug!(feed = %feed, relay = %relay.endpoint, "Fetching feed through relay");

    let response = tokio::time::timeout(relay.timeout, client.get(request_url).send())
        .await
        .map_err(|_| FetchError::Timeout(relay.timeout))?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    let envelope: RelayEnvelope = serde_json::from_slice(&bytes)?;

    if let Some(code) = envelope.status.and_then(|s| s.http_code) {
        if !(200..300).contains(&code) {
            return Err(FetchError::UpstreamStatus(code));
        }
    }

    let xml = envelope.contents.ok_or(FetchError::MissingContents)?;
    let articles = parse_articles(&xml)?;

    tracing::info!(feed = %feed, count = articles.len(), "Feed loaded");
    Ok(articles)
}

/// Fetches and parses a feed for display, never failing.
///
/// Any error is logged and turned into an empty list, so an empty result is
/// ambiguous between "no articles" and "fetch failed". Use
/// [`try_fetch_feed`] when the difference matters.
pub async fn fetch_feed(client: &reqwest::Client, relay: &Relay, feed_url: &str) -> Vec<Article> {
    match try_fetch_feed(client, relay, feed_url).await {
        Ok(articles) => articles,
        Err(e) => {
            tracing::error!(feed = %feed_url, error = %e, "Error fetching or parsing RSS feed");
            Vec::new()
        }
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED_URL: &str = "https://www.shz.de/deutschland-welt/schleswig-holstein/klima/rss";

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><title>Erste</title><link>https://www.shz.de/1</link></item>
    <item><title>Zweite</title><link>https://www.shz.de/2</link></item>
</channel></rss>"#;

    fn relay_for(server: &MockServer) -> Relay {
        Relay::new(&format!("{}/get", server.uri())).unwrap()
    }

    fn envelope(contents: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": contents,
            "status": { "url": FEED_URL, "content_type": "application/rss+xml", "http_code": 200 }
        })
    }

    #[test]
    fn test_request_url_encodes_feed() {
        let relay = Relay::default();
        let feed = Url::parse("https://example.com/rss?cat=a&lang=de").unwrap();
        assert_eq!(
            relay.request_url(&feed).as_str(),
            "https://api.allorigins.win/get?url=https%3A%2F%2Fexample.com%2Frss%3Fcat%3Da%26lang%3Dde"
        );
    }

    #[test]
    fn test_relay_requires_https() {
        assert!(Relay::new("https://relay.example/get").is_ok());
        assert!(Relay::new("http://127.0.0.1:8080/get").is_ok());
        assert!(matches!(
            Relay::new("http://relay.example/get"),
            Err(FetchError::InsecureRelay)
        ));
        assert!(matches!(
            Relay::new("ftp://relay.example/get"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("url", FEED_URL))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(VALID_RSS)))
            .expect(1)
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let articles = try_fetch_feed(&reqwest::Client::new(), &relay, FEED_URL)
            .await
            .unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Erste");
        assert_eq!(articles[1].link, "https://www.shz.de/2");
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let result = try_fetch_feed(&reqwest::Client::new(), &relay, FEED_URL).await;
        match result {
            Err(FetchError::HttpStatus(502)) => {}
            other => panic!("Expected HttpStatus(502), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_soft_fetch_returns_empty_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let articles = fetch_feed(&reqwest::Client::new(), &relay, FEED_URL).await;
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_status_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "contents": null,
                "status": { "http_code": 404 }
            })))
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let result = try_fetch_feed(&reqwest::Client::new(), &relay, FEED_URL).await;
        assert!(matches!(result, Err(FetchError::UpstreamStatus(404))));
    }

    #[tokio::test]
    async fn test_missing_contents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let result = try_fetch_feed(&reqwest::Client::new(), &relay, FEED_URL).await;
        assert!(matches!(result, Err(FetchError::MissingContents)));
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let result = try_fetch_feed(&reqwest::Client::new(), &relay, FEED_URL).await;
        assert!(matches!(result, Err(FetchError::Envelope(_))));
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope("<not valid xml")))
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let result = try_fetch_feed(&reqwest::Client::new(), &relay, FEED_URL).await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn test_invalid_feed_url_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let result = try_fetch_feed(&reqwest::Client::new(), &relay, "file:///etc/passwd").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(VALID_RSS))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let relay = relay_for(&server).with_timeout(Duration::from_millis(50));
        let result = try_fetch_feed(&reqwest::Client::new(), &relay, FEED_URL).await;
        assert!(matches!(result, Err(FetchError::Timeout(_))));
    }
}
