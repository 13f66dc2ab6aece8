//! Error types for the protowire framework.

use serde::{Deserialize, Serialize};

/// Error code used whenever a more specific code is unavailable.
pub const GENERIC_ERROR: &str = "generic_error";

/// Structured wire error payload: `{"error": ..., "error_description": ...}`.
///
/// `error_description` is omitted from the serialized form when `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// Stable error code.
    #[serde(rename = "error")]
    pub error: String,

    /// Optional human-readable description.
    #[serde(
        rename = "error_description",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub error_description: Option<String>,
}

impl ErrorDescriptor {
    /// Create a descriptor with an error code only.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_description: None,
        }
    }

    /// Create a descriptor with an error code and a description.
    #[must_use]
    pub fn with_description(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_description: Some(description.into()),
        }
    }
}

/// Unified error type crossing the client/server boundary.
///
/// Server-side failures are a closed tagged union: `Service` is the generic
/// path (logged, written as a 500 with a structured payload), `StatusCoded`
/// carries its own HTTP status and payload and overrides the generic path.
/// `Cancelled` is the only variant the server may decline to convert into a
/// written error response (when it coincides with client disconnection).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtoError {
    /// Service-level error with a stable code and a human message.
    #[error("{code}: {message}")]
    Service {
        /// Error code for programmatic handling.
        code: String,
        /// Human-readable error message.
        message: String,
    },

    /// Error supplying its own HTTP status and wire payload.
    #[error("status {status}: {}", descriptor.error)]
    StatusCoded {
        /// HTTP status code to respond with.
        status: u16,
        /// Payload written to the error body.
        descriptor: ErrorDescriptor,
    },

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl ProtoError {
    /// Create a service error with a code and a message.
    #[must_use]
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a service error under the generic code.
    #[must_use]
    pub fn generic(message: impl Into<String>) -> Self {
        Self::service(GENERIC_ERROR, message)
    }

    /// Create a status-coded error.
    #[must_use]
    pub fn status_coded(status: u16, descriptor: ErrorDescriptor) -> Self {
        Self::StatusCoded { status, descriptor }
    }

    /// Stable error code of this error.
    #[must_use]
    pub fn error_code(&self) -> &str {
        match self {
            Self::Service { code, .. } => code,
            Self::StatusCoded { descriptor, .. } => &descriptor.error,
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable message of this error.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Service { message, .. } => message,
            Self::StatusCoded { descriptor, .. } => {
                descriptor.error_description.as_deref().unwrap_or_default()
            }
            Self::Cancelled => "operation cancelled",
        }
    }

    /// Whether this error was caused by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtoError::service("not_found", "user missing");
        assert_eq!(err.to_string(), "not_found: user missing");
        assert_eq!(err.error_code(), "not_found");
        assert_eq!(err.message(), "user missing");
    }

    #[test]
    fn test_generic_error_code() {
        let err = ProtoError::generic("boom");
        assert_eq!(err.error_code(), GENERIC_ERROR);
    }

    #[test]
    fn test_descriptor_serialization_omits_null_description() {
        let json = serde_json::to_string(&ErrorDescriptor::new("generic_error")).unwrap();
        assert_eq!(json, r#"{"error":"generic_error"}"#);

        let json =
            serde_json::to_string(&ErrorDescriptor::with_description("not_found", "missing"))
                .unwrap();
        assert_eq!(
            json,
            r#"{"error":"not_found","error_description":"missing"}"#
        );
    }

    #[test]
    fn test_descriptor_roundtrip() {
        let parsed: ErrorDescriptor =
            serde_json::from_str(r#"{"error":"not_found","error_description":"missing"}"#).unwrap();
        assert_eq!(parsed.error, "not_found");
        assert_eq!(parsed.error_description.as_deref(), Some("missing"));

        let parsed: ErrorDescriptor = serde_json::from_str(r#"{"error":"x"}"#).unwrap();
        assert_eq!(parsed.error_description, None);
    }
}
