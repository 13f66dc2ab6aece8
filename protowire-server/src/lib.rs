//! # protowire-server
//!
//! Server runtime support consumed by generated proto dispatchers.
//!
//! This crate provides:
//! - Body/query/form readers feeding the generated argument readers
//! - JSON result writer and the tagged-union error writer
//! - The per-request cancellation guard ([`RequestAborted`])
//! - Route-table entry types and path joining

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, StatusCode, Uri};
use axum::response::Response;
use protowire_core::{CancellationToken, ErrorDescriptor, ProtoError, Verb};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::DropGuard;

/// One entry of a generated route table: method identity, verb and the full
/// path (service root joined with the method path segment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry<M> {
    pub method: M,
    pub verb: Verb,
    pub path: String,
}

/// Join a root path and a method path, trimming `/` on both segments.
#[must_use]
pub fn join_path(root: &str, leaf: &str) -> String {
    let root = root.trim_matches('/');
    let leaf = leaf.trim_matches('/');
    match (root.is_empty(), leaf.is_empty()) {
        (true, _) => leaf.to_owned(),
        (_, true) => root.to_owned(),
        _ => format!("{root}/{leaf}"),
    }
}

/// Per-request cancellation signal.
///
/// The token is handed to the service implementation; the drop guard fires
/// it when the request future is dropped, which is how client disconnection
/// manifests on this side.
#[derive(Debug)]
pub struct RequestAborted {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestAborted {
    #[must_use]
    pub fn new() -> Self {
        let token = CancellationToken::new();
        let guard = token.clone().drop_guard();
        Self {
            token,
            _guard: guard,
        }
    }

    /// Token observed by the implementation and downstream awaits.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for RequestAborted {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect a request body into memory.
pub async fn collect_body(body: Body) -> Result<axum::body::Bytes, ProtoError> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| ProtoError::generic(format!("unable to read request body: {e}")))
}

/// Deserialize a JSON request body as the method's input DTO.
///
/// Deserialization failures (malformed JSON, null where a value is required)
/// are promoted to the generic structured error, never a raw fault.
pub fn read_json_body<T: DeserializeOwned>(bytes: &[u8], context: &str) -> Result<T, ProtoError> {
    serde_json::from_slice(bytes)
        .map_err(|_| ProtoError::generic(format!("unable to deserialize JSON arguments for {context}")))
}

/// Parse the request query string into a key-value map.
#[must_use]
pub fn query_map(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .map(|query| {
            form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// Parse an `application/x-www-form-urlencoded` body into a key-value map.
#[must_use]
pub fn form_map(bytes: &[u8]) -> HashMap<String, String> {
    form_urlencoded::parse(bytes).into_owned().collect()
}

/// Serialize a method result as the JSON response body.
pub fn write_json_result<T: Serialize>(result: &T) -> Result<Response, ProtoError> {
    let body = serde_json::to_vec(result)
        .map_err(|e| ProtoError::generic(format!("unable to serialize result: {e}")))?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .map_err(|e| ProtoError::generic(format!("unable to build response: {e}")))
}

/// Empty success response for void methods.
#[must_use]
pub fn empty_response() -> Response {
    Response::new(Body::empty())
}

/// Server-side error protocol.
///
/// `StatusCoded` errors supply their own status and payload; every other
/// error is logged and written as a 500 whose structured payload keeps the
/// error's own code and message.
#[must_use]
pub fn write_error(error: ProtoError) -> Response {
    let (status, descriptor) = match error {
        ProtoError::StatusCoded { status, descriptor } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            descriptor,
        ),
        other => {
            tracing::error!(error = %other, "proto operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDescriptor::with_description(
                    other.error_code().to_owned(),
                    other.message().to_owned(),
                ),
            )
        }
    };
    let body = serde_json::to_vec(&descriptor).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
}

/// Response used when cancellation coincides with client disconnection: the
/// connection is already gone, so no structured error is written.
#[must_use]
pub fn abort_response() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() =
        StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
}
