//! # protowire-client
//!
//! Client runtime support consumed by generated proto clients.
//!
//! This crate provides:
//! - Endpoint configuration (programmatic, key-value pairs, literal endpoint)
//! - Named HTTP client profiles ([`HttpClientFactory`])
//! - The client-side error protocol ([`handle_errors`])
//! - Query-string escaping and form-body encoding
//! - Cancellation-aware request sending

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use protowire_core::{CancellationToken, ErrorDescriptor, ProtoError, GENERIC_ERROR};

/// Configuration for one generated client.
///
/// `http_client` selects a named client profile, `endpoint` is the base URI,
/// `path` overrides the generated service root path.
#[derive(Debug, Clone, Default)]
pub struct EndpointConfiguration {
    /// Named HTTP client profile; falls back to the generated default.
    pub http_client: Option<String>,
    /// Base URI of the remote service.
    pub endpoint: String,
    /// Service root path override.
    pub path: Option<String>,
}

impl EndpointConfiguration {
    /// Configuration pointing at a literal endpoint.
    #[must_use]
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from generic key-value pairs.
    ///
    /// Recognized keys: `HttpClient`, `Endpoint`, `Path`. Unknown keys are
    /// ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut configuration = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "HttpClient" => configuration.http_client = Some(value.into()),
                "Endpoint" => configuration.endpoint = value.into(),
                "Path" => configuration.path = Some(value.into()),
                _ => {}
            }
        }
        configuration
    }
}

/// Source of HTTP clients keyed by profile name.
pub trait HttpClientFactory: Send + Sync {
    fn client_for(&self, name: &str) -> reqwest::Client;
}

/// Factory handing out a single shared client regardless of profile name.
#[derive(Debug, Clone, Default)]
pub struct DefaultHttpClientFactory {
    client: reqwest::Client,
}

impl DefaultHttpClientFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory pinned to a pre-configured client (used by tests to inject an
    /// in-process test client).
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpClientFactory for DefaultHttpClientFactory {
    fn client_for(&self, _name: &str) -> reqwest::Client {
        self.client.clone()
    }
}

/// Escape set for query-string values: everything except unreserved
/// characters (ALPHA / DIGIT / `-` / `.` / `_` / `~`).
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-escape a query-string value.
#[must_use]
pub fn escape(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Encode key-value pairs as an `application/x-www-form-urlencoded` body.
#[must_use]
pub fn encode_form(pairs: &[(&str, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Media type attached to form-encoded request bodies.
pub const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Media type attached to JSON request bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Send a request, honoring an optional caller-supplied cancellation token.
///
/// Transport failures surface as generic service errors; cancellation
/// surfaces as [`ProtoError::Cancelled`].
pub async fn send(
    client: &reqwest::Client,
    request: reqwest::Request,
    token: Option<&CancellationToken>,
) -> Result<reqwest::Response, ProtoError> {
    let url = request.url().clone();
    let pending = client.execute(request);
    let outcome = match token {
        Some(token) => {
            tokio::select! {
                () = token.cancelled() => return Err(ProtoError::Cancelled),
                outcome = pending => outcome,
            }
        }
        None => pending.await,
    };
    outcome.map_err(|e| ProtoError::generic(format!("request failed [{url}]: {e}")))
}

/// Client-side error protocol.
///
/// Success statuses pass the response through untouched so the body remains
/// unread. Any other status is converted into a single typed [`ProtoError`]:
/// a parseable `{error, error_description}` body keeps its code (an empty
/// code is normalized to `generic_error`); an empty or unreadable body
/// synthesizes a generic error carrying the request URI and status for
/// diagnosability.
pub async fn handle_errors(response: reqwest::Response) -> Result<reqwest::Response, ProtoError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let url = response.url().clone();
    let body = response.bytes().await.unwrap_or_default();
    if body.is_empty() {
        return Err(ProtoError::generic(format!(
            "remote server responded with {status} without content [{url}]"
        )));
    }
    match serde_json::from_slice::<ErrorDescriptor>(&body) {
        Ok(descriptor) => {
            let code = if descriptor.error.is_empty() {
                GENERIC_ERROR.to_owned()
            } else {
                descriptor.error
            };
            let message = descriptor
                .error_description
                .unwrap_or_else(|| format!("remote server responded with {status}"));
            Err(ProtoError::service(code, message))
        }
        Err(_) => Err(ProtoError::generic(format!(
            "unable to read error response [{url}]"
        ))),
    }
}
