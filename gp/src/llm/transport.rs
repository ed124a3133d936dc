//! Network seam for the request executor
//!
//! `Transport` performs exactly one POST and reports either the HTTP reply or
//! a classified transport failure. Retry, timeout and status policy live in
//! the executor so they can be exercised against a scripted transport.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

use super::error::{RequestError, TransportError, TransportErrorKind};

/// Raw HTTP reply from the completion endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
    /// Parsed `Retry-After` header (seconds form only)
    pub retry_after: Option<Duration>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }
}

/// One POST of a JSON body to the completion endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, body: &serde_json::Value) -> Result<HttpReply, TransportError>;
}

/// reqwest-backed transport with bearer authentication
pub struct HttpTransport {
    http: Client,
    url: Url,
    api_key: String,
}

impl HttpTransport {
    /// Build a transport for `endpoint`
    ///
    /// Fails with `InvalidEndpoint` unless the URL parses with an http(s) scheme.
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self, RequestError> {
        debug!(%endpoint, ?connect_timeout, ?timeout, "HttpTransport::new: called");
        let url = Url::parse(endpoint).map_err(|e| RequestError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(RequestError::InvalidEndpoint(format!(
                "{}: unsupported scheme '{}'",
                endpoint,
                url.scheme()
            )));
        }

        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| RequestError::InvalidInput(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url,
            api_key: api_key.into(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, body: &serde_json::Value) -> Result<HttpReply, TransportError> {
        debug!(url = %self.url, "HttpTransport::post: called");
        let response = self
            .http
            .post(self.url.clone())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());

        let body = response.text().await.map_err(|e| classify_reqwest_error(&e))?;
        debug!(status, body_len = body.len(), "HttpTransport::post: reply received");

        Ok(HttpReply {
            status,
            body,
            retry_after,
        })
    }
}

/// `Retry-After` in delay-seconds form; HTTP-date hints are ignored
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Map a reqwest failure onto the fixed transport categories
fn classify_reqwest_error(err: &reqwest::Error) -> TransportError {
    let message = error_chain(err);
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if let Some(kind) = io_kind(err) {
        kind
    } else {
        classify_message(&message, err.is_connect())
    };
    debug!(?kind, %message, "classify_reqwest_error: classified");
    TransportError::new(kind, message)
}

/// First io::Error in the source chain, mapped to a category
fn io_kind(err: &(dyn std::error::Error + 'static)) -> Option<TransportErrorKind> {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            use std::io::ErrorKind;
            return match io.kind() {
                ErrorKind::TimedOut => Some(TransportErrorKind::Timeout),
                ErrorKind::ConnectionReset => Some(TransportErrorKind::ConnectionReset),
                ErrorKind::ConnectionRefused => Some(TransportErrorKind::ConnectionRefused),
                ErrorKind::ConnectionAborted => Some(TransportErrorKind::ConnectionAborted),
                ErrorKind::NotConnected => Some(TransportErrorKind::NotConnected),
                ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof => Some(TransportErrorKind::NetworkLost),
                _ => None,
            };
        }
        source = e.source();
    }
    None
}

/// Fallback classification from the rendered error chain
fn classify_message(message: &str, is_connect: bool) -> TransportErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("dns error") || lower.contains("failed to lookup address") {
        TransportErrorKind::Dns
    } else if lower.contains("certificate") || lower.contains("tls") || lower.contains("ssl") {
        TransportErrorKind::Tls
    } else if lower.contains("connection reset") {
        TransportErrorKind::ConnectionReset
    } else if lower.contains("connection closed") || lower.contains("incomplete message") {
        TransportErrorKind::NetworkLost
    } else if is_connect {
        TransportErrorKind::NotConnected
    } else {
        TransportErrorKind::Other
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let err = HttpTransport::new("not a url", "k", Duration::from_secs(1), Duration::from_secs(1));
        assert!(matches!(err, Err(RequestError::InvalidEndpoint(_))));

        let err = HttpTransport::new("ftp://example.com/x", "k", Duration::from_secs(1), Duration::from_secs(1));
        assert!(matches!(err, Err(RequestError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_new_accepts_https() {
        let transport = HttpTransport::new(
            "https://api.groq.com/openai/v1/chat/completions",
            "k",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(transport.url().host_str(), Some("api.groq.com"));
    }

    #[test]
    fn test_classify_message() {
        assert_eq!(
            classify_message("error sending request: dns error: failed to lookup address", true),
            TransportErrorKind::Dns
        );
        assert_eq!(
            classify_message("invalid peer certificate: UnknownIssuer", true),
            TransportErrorKind::Tls
        );
        assert_eq!(
            classify_message("connection closed before message completed", false),
            TransportErrorKind::NetworkLost
        );
        assert_eq!(classify_message("tcp connect error", true), TransportErrorKind::NotConnected);
        assert_eq!(classify_message("builder error", false), TransportErrorKind::Other);
    }

    #[test]
    fn test_io_kind_walks_source_chain() {
        #[derive(Debug)]
        struct Wrapper(std::io::Error);
        impl std::fmt::Display for Wrapper {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "wrapped")
            }
        }
        impl std::error::Error for Wrapper {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Wrapper(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert_eq!(io_kind(&err), Some(TransportErrorKind::ConnectionReset));
        assert_eq!(error_chain(&err), "wrapped: connection reset");
    }

    #[test]
    fn test_parse_retry_after() {
        use reqwest::header::HeaderValue;

        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static(" 7 "));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }
}
