//! # protowire-macros
//!
//! Proc macros for the protowire framework.
//!
//! This crate provides the `#[proto_service]` attribute macro that turns a
//! service trait into three cooperating artifacts: shared method metadata, a
//! typed HTTP client and a server-side dispatcher/router.
//!
//! ## Generated Items
//!
//! For a trait named `Math`, the macro generates:
//! - `math_proto` - shared method metadata (ids, paths, verbs, encodings)
//!   and the synthetic argument DTO types
//! - `MathClient` - typed client implementing the trait over HTTP
//! - `MathServer<S>` - dispatcher mapping routes to a trait implementation

mod generate;
mod parse;
mod resolve;

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemTrait};

use crate::parse::ServiceArgs;

/// Define an HTTP proto service from a trait.
///
/// ## Usage
///
/// Apply this attribute to a trait describing the service contract. Every
/// method must be `async fn` returning `Result<T, ProtoError>`, or a plain
/// `fn` returning `BoxStream<'static, Result<T, ProtoError>>` for streaming
/// methods. A trailing `CancellationToken` parameter is passed through to
/// the transport instead of the wire.
///
/// ## Configuration cascade
///
/// Options resolve method-level override -> service-level override ->
/// computed default. Service-level options are arguments to the attribute
/// (`path`, `input`, `output`, `error`, `naming`, `parameter_naming`,
/// `wrap_single_json`, `keep_async_suffix`, `http_client`); method-level
/// overrides use `#[proto(...)]` on the method; a per-parameter converter
/// uses `#[proto(with = Path)]` on the argument.
#[proc_macro_attribute]
pub fn proto_service(attr: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ServiceArgs);
    let item = parse_macro_input!(input as ItemTrait);

    match generate::generate_service(args, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
