//! JSON-over-HTTP client used by the provider adapters.
//!
//! - One attempt per call unless retries are enabled; retries cover network
//!   errors, 429 and 5xx, honouring `Retry-After`
//! - No timeout unless the client or the request sets one; when set it also
//!   bounds connecting
//! - Secret headers are redacted from every log line
//! - `VERACITY_HTTP_RAW=1` additionally logs a curl repro and the raw
//!   response under the `http.raw` target
//!
//! ```no_run
//! # async fn demo() -> Result<(), veracity_http::HttpError> {
//! let client = veracity_http::HttpClient::new("https://api.example.com/v1/")?;
//! let got: serde_json::Value = client
//!     .post_json("items", &serde_json::json!({"q": 1}), veracity_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

const RAW_ENV: &str = "VERACITY_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;
const MIN_RATE_LIMIT_WAIT: Duration = Duration::from_millis(1100);
const REDACTED: &str = "<redacted>";

const SECRET_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "x-goog-api-key",
    "x-api-key",
    "cookie",
];

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for server-reported failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// How a request proves who it is.
///
/// ```
/// use veracity_http::Auth;
/// use reqwest::header::{HeaderName, HeaderValue};
///
/// let auth = Auth::Header {
///     name: HeaderName::from_static("x-goog-api-key"),
///     value: HeaderValue::from_static("secret"),
/// };
/// assert_eq!(auth.kind(), "header");
/// ```
#[derive(Clone, Debug)]
pub enum Auth {
    /// Credential in a named header, e.g. `x-goog-api-key`.
    Header {
        name: HeaderName,
        value: HeaderValue,
    },
    None,
}

impl Auth {
    /// Label used in logs in place of the secret.
    pub fn kind(&self) -> &'static str {
        match self {
            Auth::Header { .. } => "header",
            Auth::None => "none",
        }
    }
}

/// Per-request overrides of the client defaults.
///
/// ```
/// use veracity_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(1),
///     ..Default::default()
/// };
/// assert_eq!(opts.timeout, Some(Duration::from_secs(30)));
/// assert!(opts.auth.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth>,
    pub headers: Option<HeaderMap>,
}

/// Result of a single attempt that did not produce a value.
enum Failed {
    /// Worth another attempt; `wait` overrides the computed backoff.
    Transient { error: HttpError, wait: Option<Duration> },
    Final(HttpError),
}

/// Everything that stays fixed across the attempts of one call.
struct Call<'a> {
    req_id: String,
    url: Url,
    body: Vec<u8>,
    timeout: Option<Duration>,
    opts: &'a RequestOpts,
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Option<Duration>,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// Relative paths are joined onto `base`, so it should end with `/`.
    ///
    /// ```
    /// use veracity_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("https://api.example.com/v1/")?;
    /// assert_eq!(client.default_timeout, None);
    /// assert_eq!(client.max_retries, 0);
    /// assert_eq!(client.base().as_str(), "https://api.example.com/v1/");
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: None,
            max_retries: 0,
        })
    }

    /// Bound every request made through this client.
    ///
    /// ```
    /// use veracity_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Some(Duration::from_secs(2)));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = Some(dur);
        self
    }

    /// Allow up to `n` extra attempts on transient failures.
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// POST `body` as JSON to `path` (relative to the base) and decode the reply.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let call = Call {
            req_id: uuid::Uuid::new_v4().simple().to_string(),
            url: self
                .base
                .join(path)
                .map_err(|e| HttpError::Url(e.to_string()))?,
            body: serde_json::to_vec(body)
                .map_err(|e| HttpError::Build(format!("body serialization failed: {e}")))?,
            timeout: opts.timeout.or(self.default_timeout),
            opts: &opts,
        };
        let max_retries = opts.retries.unwrap_or(self.max_retries);

        if raw_enabled() {
            let curl = make_curl(&call.url, opts.headers.as_ref(), &call.body);
            tracing::debug!(target: "http.raw", req_id = %call.req_id, %curl, "request");
        }

        let mut attempt = 1usize;
        loop {
            match self.attempt(&call, attempt, max_retries).await {
                Ok(value) => return Ok(value),
                Err(Failed::Transient { error, wait }) if attempt <= max_retries => {
                    let delay = wait.unwrap_or_else(|| backoff(attempt));
                    tracing::warn!(
                        req_id = %call.req_id,
                        attempt,
                        max_retries,
                        backoff_ms = delay.as_millis() as u64,
                        error = %error,
                        "http.retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(Failed::Transient { error, .. } | Failed::Final(error)) => return Err(error),
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        call: &Call<'_>,
        attempt: usize,
        max_retries: usize,
    ) -> Result<T, Failed> {
        let mut rb = self
            .inner
            .post(call.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(call.body.clone());
        if let Some(t) = call.timeout {
            rb = rb.timeout(t);
        }
        if let Some(headers) = &call.opts.headers {
            rb = rb.headers(headers.clone());
        }
        if let Some(Auth::Header { name, value }) = &call.opts.auth {
            rb = rb.header(name, value);
        }

        tracing::debug!(
            req_id = %call.req_id,
            attempt,
            max_retries,
            host_path = %format!("{}{}", call.url.host_str().unwrap_or("-"), call.url.path()),
            timeout_ms = ?call.timeout.map(|t| t.as_millis() as u64),
            auth_kind = call.opts.auth.as_ref().map(Auth::kind).unwrap_or("none"),
            body_len = call.body.len(),
            "http.request.start"
        );

        let started = Instant::now();
        let received = match rb.send().await {
            Ok(resp) => {
                let status = resp.status();
                let headers = resp.headers().clone();
                resp.bytes().await.map(|bytes| (status, headers, bytes))
            }
            Err(e) => Err(e),
        };
        let (status, headers, bytes) = received.map_err(|e| {
            tracing::warn!(req_id = %call.req_id, attempt, error = %e, "http.network_error");
            Failed::Transient {
                error: HttpError::Network(e.to_string()),
                wait: None,
            }
        })?;

        let request_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("x-goog-request-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(
            req_id = %call.req_id,
            %status,
            elapsed_ms,
            body_len = bytes.len(),
            x_request_id = %request_id,
            "http.response.headers"
        );
        if raw_enabled() {
            let shown = &bytes[..bytes.len().min(RAW_MAX_BODY)];
            tracing::info!(
                target: "http.raw",
                req_id = %call.req_id,
                %status,
                elapsed_ms,
                headers = ?redact_headers(&headers),
                body = %String::from_utf8_lossy(shown),
                truncated = bytes.len() > RAW_MAX_BODY,
                "response"
            );
        }

        if status.is_success() {
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                let snippet = snip_body(&bytes);
                tracing::warn!(
                    req_id = %call.req_id,
                    serde_err = %e,
                    body_snippet = %snippet,
                    "http.response.decode_error"
                );
                Failed::Final(HttpError::Decode(e.to_string(), snippet))
            });
        }

        let message = extract_error_message(&bytes);
        tracing::warn!(
            req_id = %call.req_id,
            %status,
            message = %message,
            x_request_id = %request_id,
            "http.error"
        );
        let error = HttpError::Api {
            status,
            message,
            request_id,
        };

        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = retry_after(&headers)
                .unwrap_or_else(|| backoff(attempt).max(MIN_RATE_LIMIT_WAIT));
            Err(Failed::Transient { error, wait: Some(wait) })
        } else if status.is_server_error() {
            Err(Failed::Transient {
                error,
                wait: retry_after(&headers),
            })
        } else {
            Err(Failed::Final(error))
        }
    }
}

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// 200ms, 400ms, 800ms, ... capped at 2^10 steps.
fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(10) as u32;
    Duration::from_millis(200u64.saturating_mul(1u64 << shift))
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}

fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if SECRET_HEADERS.contains(&name.as_str()) {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

/// Shell-quoted curl command reproducing the request, secrets redacted.
fn make_curl(url: &Url, headers: Option<&HeaderMap>, body: &[u8]) -> String {
    let quote = |s: &str| format!("'{}'", s.replace('\'', r"'\''"));
    let mut parts = vec!["curl -XPOST".to_string()];
    for (name, value) in headers.map(redact_headers).unwrap_or_default() {
        parts.push(format!("-H {}", quote(&format!("{name}: {value}"))));
    }
    let mut text = String::from_utf8_lossy(body).into_owned();
    if text.len() > RAW_MAX_BODY {
        text.truncate(floor_char_boundary(&text, RAW_MAX_BODY));
        text.push('…');
    }
    parts.push(format!("-d {}", quote(&text)));
    parts.push(quote(url.as_str()));
    parts.join(" ")
}

/// Human-readable message from a provider error body.
///
/// Understands `{"error":{"message"|"status"}}` (Google, OpenAI) and flat
/// `{"message"|"detail"|"error": "..."}` bodies; anything else is snipped.
fn extract_error_message(body: &[u8]) -> String {
    let Ok(json) = serde_json::from_slice::<Value>(body) else {
        return snip_body(body);
    };
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };

    if let Some(detail) = json.get("error").filter(|e| e.is_object()) {
        let msg = non_empty(detail.get("message")).or_else(|| non_empty(detail.get("status")));
        if let Some(msg) = msg {
            return msg;
        }
    }
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| non_empty(json.get(*key)))
        .unwrap_or_else(|| snip_body(body))
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut idx = max.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).into_owned();
    if snip.len() > SNIPPET_MAX {
        snip.truncate(floor_char_boundary(&snip, SNIPPET_MAX));
        snip.push_str("...");
    }
    snip
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_envelope_message_is_extracted() {
        let body =
            br#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(extract_error_message(body), "API key not valid");
        let body = br#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(extract_error_message(body), "RESOURCE_EXHAUSTED");
    }

    #[test]
    fn flat_error_shapes_fall_through_in_order() {
        assert_eq!(extract_error_message(br#"{"detail":"nope"}"#), "nope");
        assert_eq!(extract_error_message(br#"{"error":"boom"}"#), "boom");
        assert_eq!(extract_error_message(b"plain text"), "plain text");
    }

    #[test]
    fn secret_headers_are_redacted() {
        let mut h = HeaderMap::new();
        h.insert("x-goog-api-key", HeaderValue::from_static("super-secret"));
        h.insert("accept", HeaderValue::from_static("application/json"));
        let shown = redact_headers(&h);
        assert!(shown.iter().all(|(_, v)| v != "super-secret"));
        assert!(shown.contains(&("accept".to_string(), "application/json".to_string())));
    }

    #[test]
    fn curl_quotes_body_and_hides_keys() {
        let url = Url::parse("https://example.com/v1/models/m:generateContent").unwrap();
        let mut h = HeaderMap::new();
        h.insert("x-goog-api-key", HeaderValue::from_static("super-secret"));
        let curl = make_curl(&url, Some(&h), br#"{"text":"it's"}"#);
        assert!(!curl.contains("super-secret"));
        assert!(curl.contains(r#"-d '{"text":"it'\''s"}'"#));
        assert!(curl.ends_with("'https://example.com/v1/models/m:generateContent'"));
    }

    #[test]
    fn snippets_respect_char_boundaries() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }

    #[test]
    fn retry_after_seconds_are_parsed() {
        let mut h = HeaderMap::new();
        assert_eq!(retry_after(&h), None);
        h.insert(RETRY_AFTER, HeaderValue::from_static(" 3 "));
        assert_eq!(retry_after(&h), Some(Duration::from_secs(3)));
        h.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&h), None);
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(2), Duration::from_millis(400));
        assert_eq!(backoff(3), Duration::from_millis(800));
    }
}
