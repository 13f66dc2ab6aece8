//! Emits the per-service metadata module: method enum, resolved wire
//! constants and the synthetic argument DTO types.

use proc_macro2::{Literal, TokenStream};
use quote::quote;

use crate::parse::ServiceDefinition;
use crate::resolve::{InputDto, MethodDescriptor, ServiceDescriptor};

use super::{error_tokens, input_tokens, metadata_module, output_tokens, verb_tokens};

pub fn generate(service: &ServiceDefinition, descriptor: &ServiceDescriptor) -> TokenStream {
    let vis = &service.vis;
    let module = metadata_module(service);
    let service_path = &descriptor.root_path;
    let http_client = &descriptor.http_client;

    let count = descriptor.methods.len();
    let variants: Vec<_> = descriptor.methods.iter().map(|m| &m.variant).collect();
    let discriminants: Vec<_> = (0..count).map(Literal::usize_unsuffixed).collect();

    let id_arms = accessor_arms(descriptor, |m| {
        let id = &m.method_id;
        quote!(#id)
    });
    let path_arms = accessor_arms(descriptor, |m| {
        let path = &m.path;
        quote!(#path)
    });
    let verb_arms = accessor_arms(descriptor, |m| verb_tokens(m.verb));
    let input_arms = accessor_arms(descriptor, |m| input_tokens(m.input));
    let output_arms = accessor_arms(descriptor, |m| output_tokens(m.output));
    let error_arms = accessor_arms(descriptor, |m| error_tokens(m.error));
    let no_return_arms = accessor_arms(descriptor, |m| {
        let no_return = m.no_return;
        quote!(#no_return)
    });

    let dtos = descriptor.methods.iter().filter_map(synthetic_dto);

    quote! {
        #vis mod #module {
            #[allow(unused_imports)]
            use super::*;

            /// Root path segment of the service.
            pub const SERVICE_PATH: &str = #service_path;

            /// Named profile used to obtain an HTTP client.
            pub const HTTP_CLIENT_PROFILE: &str = #http_client;

            /// Wire methods of the service, in declaration order.
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            #[repr(usize)]
            pub enum Methods {
                #(#variants = #discriminants,)*
            }

            impl Methods {
                /// All methods, in declaration order.
                pub const ALL: [Methods; #count] = [#(Methods::#variants),*];

                /// Number of wire methods.
                pub const COUNT: usize = #count;

                /// Stable method identifier.
                #[must_use]
                pub fn method_id(self) -> &'static str {
                    match self { #(#id_arms,)* }
                }

                /// Path segment relative to the service path.
                #[must_use]
                pub fn path(self) -> &'static str {
                    match self { #(#path_arms,)* }
                }

                #[must_use]
                pub fn verb(self) -> ::protowire::Verb {
                    match self { #(#verb_arms,)* }
                }

                #[must_use]
                pub fn input(self) -> ::protowire::InputType {
                    match self { #(#input_arms,)* }
                }

                #[must_use]
                pub fn output(self) -> ::protowire::OutputType {
                    match self { #(#output_arms,)* }
                }

                #[must_use]
                pub fn error(self) -> ::protowire::ErrorType {
                    match self { #(#error_arms,)* }
                }

                /// True when the method produces no response payload.
                #[must_use]
                pub fn no_return(self) -> bool {
                    match self { #(#no_return_arms,)* }
                }
            }

            #(#dtos)*
        }
    }
}

fn accessor_arms(
    descriptor: &ServiceDescriptor,
    value: impl Fn(&MethodDescriptor) -> TokenStream,
) -> Vec<TokenStream> {
    descriptor
        .methods
        .iter()
        .map(|m| {
            let variant = &m.variant;
            let value = value(m);
            quote!(Methods::#variant => #value)
        })
        .collect()
}

/// Synthetic argument DTO for wrapped JSON input, if the method has one.
fn synthetic_dto(method: &MethodDescriptor) -> Option<TokenStream> {
    let Some(InputDto::Synthetic(name)) = &method.input_dto else {
        return None;
    };
    // JSON field names are the source parameter names; only Query and Form
    // use the naming-convention-cased wire key.
    let fields = method.parameters.iter().map(|parameter| {
        let field = &parameter.name;
        let ty = &parameter.ty;
        quote! { pub #field: #ty }
    });
    Some(quote! {
        #[derive(
            Debug,
            Clone,
            ::protowire::serde::Serialize,
            ::protowire::serde::Deserialize,
        )]
        #[serde(crate = "::protowire::serde")]
        pub struct #name {
            #(#fields,)*
        }
    })
}
