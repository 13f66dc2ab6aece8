//! # protowire-core
//!
//! Shared wire-level types for the protowire framework.
//!
//! This crate provides:
//! - Encoding enums (`InputType`, `OutputType`, `ErrorType`, `Verb`, ...)
//! - Error types (`ProtoError`, `ErrorDescriptor`)
//! - The naming convention engine (snake/camel/pascal/kebab)
//! - Argument conversion traits used by Query and Form encodings

mod args;
mod encoding;
mod error;
mod naming;

pub use args::{ArgumentCodec, FromArgument, ToArgument};
pub use encoding::{ErrorType, InputType, Naming, OutputType, SingleJsonParameterWrapping, Verb};
pub use error::{ErrorDescriptor, ProtoError, GENERIC_ERROR};
pub use naming::{
    CamelCase, KebabCase, NamingConvention, PascalCase, SizeError, SnakeCase, convention,
};

// Re-exported so service contracts can name the cancellation parameter type
// without a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
