//! # Protowire
//!
//! Contract-first HTTP services generated from plain Rust traits.
//!
//! Protowire provides:
//! - **`#[proto_service]` proc macro** turning a service trait into a typed
//!   HTTP client, a server-side dispatcher and shared wire metadata
//! - **Configurable encodings**: JSON bodies, query strings and form bodies,
//!   resolved per method through an attribute cascade
//! - **A structured error protocol** (`{error, error_description}`) shared
//!   by both sides of the wire
//! - **Cancellation support**: a trailing [`CancellationToken`] parameter is
//!   wired to request abortion on the server and cancels in-flight requests
//!   on the client
//! - **Server streaming** via `BoxStream` methods
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use protowire::{proto_service, ProtoError};
//!
//! #[proto_service]
//! pub trait Math {
//!     async fn add(&self, a: i32, b: i32) -> Result<i32, ProtoError>;
//! }
//!
//! // Server: MathServer::new(impl).into_router() yields an axum Router.
//! // Client: MathClient::with_endpoint("http://localhost:8080") implements
//! // the Math trait over HTTP.
//! ```
//!
//! ## Architecture
//!
//! Protowire is composed of several crates:
//!
//! - [`protowire-core`] - Encoding enums, errors, naming conventions and
//!   argument conversion traits
//! - [`protowire-client`] - Client runtime (endpoint configuration, HTTP
//!   client profiles, the client-side error protocol)
//! - [`protowire-server`] - Server runtime (request readers, result/error
//!   writers, cancellation guard)
//! - [`protowire-macros`] - The `#[proto_service]` proc macro

// Re-export core types
pub use protowire_core::{
    ArgumentCodec, CancellationToken, ErrorDescriptor, ErrorType, FromArgument, InputType, Naming,
    OutputType, ProtoError, SingleJsonParameterWrapping, ToArgument, Verb, GENERIC_ERROR,
};

// Re-export the naming convention engine
pub use protowire_core::{
    convention, CamelCase, KebabCase, NamingConvention, PascalCase, SizeError, SnakeCase,
};

// Re-export runtimes under stable module names used by generated code
pub use protowire_client as client;
pub use protowire_server as server;

pub use protowire_client::{
    DefaultHttpClientFactory, EndpointConfiguration, HttpClientFactory,
};
pub use protowire_server::{RequestAborted, RouteEntry};

// Re-export macros
pub use protowire_macros::proto_service;

// Re-export the stream alias used by streaming contract methods
pub use futures_core::stream::BoxStream;

// Re-export third-party crates for user convenience; generated code refers
// to them through this crate only.
pub use async_stream;
pub use async_trait;
pub use axum;
pub use futures_core;
pub use futures_util;
pub use reqwest;
pub use serde;
pub use serde_json;

/// Prelude module for convenient imports.
///
/// ```rust
/// use protowire::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        proto_service, BoxStream, CancellationToken, DefaultHttpClientFactory,
        EndpointConfiguration, ErrorDescriptor, HttpClientFactory, ProtoError,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
