//! Code generation for proto services.
//!
//! The generator emits four cooperating artifacts from one service trait:
//! the trait itself (re-emitted with its proto attributes stripped and
//! wrapped for async dispatch), a metadata module, a typed HTTP client and
//! a server-side dispatcher.

mod client;
mod metadata;
mod server;

use proc_macro2::TokenStream;
use protowire_core::{ErrorType, InputType, NamingConvention, OutputType, SnakeCase, Verb};
use quote::{format_ident, quote};
use syn::{parse_quote, Ident, ItemTrait, Result};

use crate::parse::{ServiceArgs, ServiceDefinition};
use crate::resolve::{resolve, validate_encodings};

pub fn generate_service(args: ServiceArgs, item: ItemTrait) -> Result<TokenStream> {
    let service = ServiceDefinition::parse(item)?;
    let descriptor = resolve(&args, &service)?;
    validate_encodings(&descriptor, &service)?;

    let trait_item = emit_trait(&service);
    let metadata = metadata::generate(&service, &descriptor);
    let client = client::generate(&service, &descriptor);
    let server = server::generate(&service, &descriptor);

    Ok(quote! {
        #trait_item
        #metadata
        #client
        #server
    })
}

/// Re-emit the service trait with proto attributes stripped, `Send + Sync`
/// supertraits and async dispatch support.
fn emit_trait(service: &ServiceDefinition) -> TokenStream {
    let mut item = service.original.clone();
    if item.colon_token.is_none() {
        item.colon_token = Some(Default::default());
    }
    item.supertraits.push(parse_quote!(::std::marker::Send));
    item.supertraits.push(parse_quote!(::std::marker::Sync));
    quote! {
        #[::protowire::async_trait::async_trait]
        #item
    }
}

/// Name of the generated metadata module for a service trait.
pub(crate) fn metadata_module(service: &ServiceDefinition) -> Ident {
    format_ident!("{}_proto", SnakeCase.apply(&service.name.to_string()))
}

pub(crate) fn verb_tokens(verb: Verb) -> TokenStream {
    match verb {
        Verb::Get => quote!(::protowire::Verb::Get),
        Verb::Post => quote!(::protowire::Verb::Post),
    }
}

pub(crate) fn input_tokens(input: InputType) -> TokenStream {
    match input {
        InputType::Default => quote!(::protowire::InputType::Default),
        InputType::Json => quote!(::protowire::InputType::Json),
        InputType::Query => quote!(::protowire::InputType::Query),
        InputType::Form => quote!(::protowire::InputType::Form),
        InputType::Custom => quote!(::protowire::InputType::Custom),
    }
}

pub(crate) fn output_tokens(output: OutputType) -> TokenStream {
    match output {
        OutputType::Default => quote!(::protowire::OutputType::Default),
        OutputType::Json => quote!(::protowire::OutputType::Json),
        OutputType::Custom => quote!(::protowire::OutputType::Custom),
    }
}

pub(crate) fn error_tokens(error: ErrorType) -> TokenStream {
    match error {
        ErrorType::Default => quote!(::protowire::ErrorType::Default),
        ErrorType::Json => quote!(::protowire::ErrorType::Json),
        ErrorType::Custom => quote!(::protowire::ErrorType::Custom),
    }
}
