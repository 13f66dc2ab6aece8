//! Encoding enums shared by the resolver, the emitters and the runtimes.

/// Request payload encoding for one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    /// Not yet resolved; the resolver replaces this with a computed default.
    #[default]
    Default,
    /// JSON request body.
    Json,
    /// Query-string parameters (implies GET).
    Query,
    /// `application/x-www-form-urlencoded` body.
    Form,
    /// Caller-supplied request construction.
    Custom,
}

/// Response payload encoding for one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    /// Not yet resolved, or no payload (void methods).
    #[default]
    Default,
    /// JSON response body.
    Json,
    /// Caller-supplied response handling.
    Custom,
}

/// Error payload encoding for one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorType {
    #[default]
    Default,
    /// Structured JSON error payload.
    Json,
    /// Caller-supplied error handling.
    Custom,
}

/// Identifier naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Naming {
    #[default]
    SnakeCase,
    CamelCase,
    PascalCase,
    KebabCase,
}

/// Policy for a method with exactly one JSON parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleJsonParameterWrapping {
    /// The parameter name is ignored and its type is the payload type.
    #[default]
    DoNotWrap,
    /// The parameter is wrapped in a synthetic argument object.
    Wrap,
}

/// HTTP verb derived from the input encoding: Query implies GET,
/// everything else implies POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
