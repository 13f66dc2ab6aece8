//! Emits the server-side dispatcher for a service trait.
//!
//! The dispatcher maps resolved routes onto an axum router. Each method
//! handler decodes the request per the resolved input encoding, invokes the
//! trait implementation and writes the result or the structured error. A
//! per-request cancellation guard distinguishes client disconnection from
//! ordinary failures.

use proc_macro2::TokenStream;
use protowire_core::{InputType, Verb};
use quote::{format_ident, quote};
use syn::Ident;

use crate::parse::{ReturnShape, ServiceDefinition};
use crate::resolve::{InputDto, MethodDescriptor, ParameterDescriptor, ServiceDescriptor};

use super::metadata_module;

pub fn generate(service: &ServiceDefinition, descriptor: &ServiceDescriptor) -> TokenStream {
    let vis = &service.vis;
    let trait_name = &service.name;
    let server_name = format_ident!("{}Server", trait_name);
    let module = metadata_module(service);

    let route_arms = descriptor.methods.iter().map(|method| {
        let variant = &method.variant;
        let invoke = invoke_fn_name(method);
        let routing = match method.verb {
            Verb::Get => quote!(::protowire::axum::routing::get),
            Verb::Post => quote!(::protowire::axum::routing::post),
        };
        quote! {
            #module::Methods::#variant => #routing(
                move |request: ::protowire::axum::extract::Request| {
                    Self::#invoke(service, request)
                },
            )
        }
    });

    let invoke_fns = descriptor
        .methods
        .iter()
        .map(|method| invoke_fn(trait_name, &module, method));
    let server_doc = format!("Server-side dispatcher for [`{trait_name}`].");

    quote! {
        #[doc = #server_doc]
        #[derive(Debug)]
        #vis struct #server_name<S> {
            service: ::std::sync::Arc<S>,
            path: ::std::option::Option<::std::string::String>,
            routes: ::std::sync::OnceLock<
                ::std::vec::Vec<::protowire::server::RouteEntry<#module::Methods>>,
            >,
        }

        impl<S> #server_name<S> {
            #[must_use]
            pub fn new(service: S) -> Self {
                Self::from_arc(::std::sync::Arc::new(service))
            }

            #[must_use]
            pub fn from_arc(service: ::std::sync::Arc<S>) -> Self {
                Self {
                    service,
                    path: ::std::option::Option::None,
                    routes: ::std::sync::OnceLock::new(),
                }
            }

            /// Override the generated service root path.
            #[must_use]
            pub fn with_path(mut self, path: impl ::std::convert::Into<::std::string::String>) -> Self {
                self.path = ::std::option::Option::Some(path.into());
                self.routes = ::std::sync::OnceLock::new();
                self
            }

            /// Resolved route table: one entry per wire method, built on
            /// first access.
            #[must_use]
            pub fn route_entries(&self) -> &[::protowire::server::RouteEntry<#module::Methods>] {
                self.routes
                    .get_or_init(|| {
                        let root = self.path.as_deref().unwrap_or(#module::SERVICE_PATH);
                        #module::Methods::ALL
                            .iter()
                            .map(|method| ::protowire::server::RouteEntry {
                                method: *method,
                                verb: method.verb(),
                                path: ::protowire::server::join_path(root, method.path()),
                            })
                            .collect()
                    })
                    .as_slice()
            }
        }

        impl<S: #trait_name + 'static> #server_name<S> {
            /// Build an axum router dispatching to the service implementation.
            #[must_use]
            pub fn into_router(self) -> ::protowire::axum::Router {
                let mut router = ::protowire::axum::Router::new();
                for entry in self.route_entries() {
                    let service = ::std::sync::Arc::clone(&self.service);
                    let route = match entry.method {
                        #(#route_arms,)*
                    };
                    router = router.route(&::std::format!("/{}", entry.path), route);
                }
                router
            }

            #(#invoke_fns)*
        }
    }
}

fn invoke_fn_name(method: &MethodDescriptor) -> Ident {
    format_ident!("invoke_{}", method.method_id)
}

/// One request handler: decode arguments, call the implementation, write
/// the result or the error. Cancellation that coincides with client
/// disconnection aborts the response instead of writing an error payload.
fn invoke_fn(trait_name: &Ident, module: &Ident, method: &MethodDescriptor) -> TokenStream {
    let name = invoke_fn_name(method);
    let context = format!("{}::{}", trait_name, method.name);
    let read_args = read_arguments(module, method, &context);
    let call = call_service(method);
    let bind_token = method
        .uses_cancellation
        .then(|| quote!(let cancellation = aborted.token();));

    quote! {
        async fn #name(
            service: ::std::sync::Arc<S>,
            request: ::protowire::axum::extract::Request,
        ) -> ::protowire::axum::response::Response {
            let aborted = ::protowire::server::RequestAborted::new();
            #bind_token
            let outcome = async move {
                #read_args
                #call
            }
            .await;
            match outcome {
                ::std::result::Result::Ok(response) => response,
                ::std::result::Result::Err(error) => {
                    if error.is_cancelled() && aborted.is_cancelled() {
                        ::protowire::server::abort_response()
                    } else {
                        ::protowire::server::write_error(error)
                    }
                }
            }
        }
    }
}

/// Argument decoding statements for the resolved input encoding. Binds one
/// local per wire parameter, named after the parameter.
fn read_arguments(module: &Ident, method: &MethodDescriptor, context: &str) -> TokenStream {
    if method.parameters.is_empty() {
        return quote! {
            let _ = request;
        };
    }
    match method.input {
        InputType::Query => {
            let reads = method.parameters.iter().map(read_map_value);
            quote! {
                let data = ::protowire::server::query_map(request.uri());
                #(#reads)*
            }
        }
        InputType::Form => {
            let reads = method.parameters.iter().map(read_map_value);
            quote! {
                let bytes = ::protowire::server::collect_body(request.into_body()).await?;
                let data = ::protowire::server::form_map(&bytes);
                #(#reads)*
            }
        }
        // Json (Default and Custom never survive resolution).
        _ => match &method.input_dto {
            None => quote! {
                let _ = request;
            },
            Some(InputDto::Bare(ty)) => {
                let pname = &method.parameters[0].name;
                quote! {
                    let bytes = ::protowire::server::collect_body(request.into_body()).await?;
                    let #pname: #ty = ::protowire::server::read_json_body(&bytes, #context)?;
                }
            }
            Some(InputDto::Synthetic(dto)) => {
                let fields: Vec<_> = method.parameters.iter().map(|p| &p.name).collect();
                quote! {
                    let bytes = ::protowire::server::collect_body(request.into_body()).await?;
                    let #module::#dto { #(#fields),* } =
                        ::protowire::server::read_json_body(&bytes, #context)?;
                }
            }
        },
    }
}

fn read_map_value(parameter: &ParameterDescriptor) -> TokenStream {
    let pname = &parameter.name;
    let key = &parameter.key;
    let ty = &parameter.ty;
    let raw = quote!(data.get(#key).map(::std::string::String::as_str));
    match &parameter.converter {
        Some(converter) => quote! {
            let #pname = <#converter as ::protowire::ArgumentCodec<#ty>>::decode(#key, #raw)?;
        },
        None => quote! {
            let #pname = <#ty as ::protowire::FromArgument>::from_argument(#key, #raw)?;
        },
    }
}

/// Invocation and result writing for the resolved return shape.
fn call_service(method: &MethodDescriptor) -> TokenStream {
    let name = &method.name;
    let args = method.parameters.iter().map(|p| &p.name);
    let token = method
        .uses_cancellation
        .then(|| quote!(cancellation,));

    match &method.shape {
        ReturnShape::Future { no_return, .. } => {
            if *no_return {
                quote! {
                    service.#name(#(#args,)* #token).await?;
                    ::std::result::Result::<_, ::protowire::ProtoError>::Ok(
                        ::protowire::server::empty_response(),
                    )
                }
            } else {
                quote! {
                    let result = service.#name(#(#args,)* #token).await?;
                    ::protowire::server::write_json_result(&result)
                }
            }
        }
        // Streams are drained before the response is written.
        ReturnShape::Stream { item } => quote! {
            let items: ::std::vec::Vec<#item> =
                ::protowire::futures_util::TryStreamExt::try_collect(
                    service.#name(#(#args,)* #token),
                )
                .await?;
            ::protowire::server::write_json_result(&items)
        },
    }
}

#[cfg(test)]
mod tests {
    use crate::parse::{ServiceArgs, ServiceDefinition};
    use crate::resolve::resolve;
    use quote::quote;
    use syn::ItemTrait;

    fn emit(args: proc_macro2::TokenStream, tokens: proc_macro2::TokenStream) -> String {
        let item: ItemTrait = syn::parse2(tokens).unwrap();
        let service = ServiceDefinition::parse(item).unwrap();
        let args: ServiceArgs = syn::parse2(args).unwrap();
        let descriptor = resolve(&args, &service).unwrap();
        super::generate(&service, &descriptor).to_string()
    }

    #[test]
    fn test_server_routes_json_methods_as_post() {
        let emitted = emit(
            quote! {},
            quote! {
                trait Math {
                    async fn add(&self, a: i32, b: i32) -> Result<i32, ProtoError>;
                }
            },
        );
        assert!(emitted.contains("MathServer"));
        assert!(emitted.contains("routing :: post"));
        assert!(emitted.contains("invoke_add"));
    }

    #[test]
    fn test_server_routes_query_methods_as_get() {
        let emitted = emit(
            quote! { input = query },
            quote! {
                trait Math {
                    async fn add(&self, a: i32, b: i32) -> Result<i32, ProtoError>;
                }
            },
        );
        assert!(emitted.contains("routing :: get"));
        assert!(emitted.contains("query_map"));
    }

    #[test]
    fn test_cancellation_token_is_forwarded() {
        let emitted = emit(
            quote! {},
            quote! {
                trait Math {
                    async fn add(&self, a: i32, token: CancellationToken) -> Result<i32, ProtoError>;
                }
            },
        );
        // The token is taken before the handler body so the guard stays
        // observable after the body completes.
        assert!(emitted.contains("let cancellation = aborted . token ()"));
        assert!(emitted.contains("cancellation ,"));
    }

    #[test]
    fn test_handler_body_owns_the_request() {
        let emitted = emit(
            quote! {},
            quote! {
                trait Math {
                    async fn add(&self, a: i32, b: i32) -> Result<i32, ProtoError>;
                }
            },
        );
        assert!(emitted.contains("async move"));
        assert!(!emitted.contains("let outcome = async {"));
    }

    #[test]
    fn test_void_method_annotates_handler_result() {
        let emitted = emit(
            quote! {},
            quote! {
                trait Math {
                    async fn inc(&self) -> Result<(), ProtoError>;
                }
            },
        );
        // Nothing else in the body pins the error type for void methods.
        assert!(emitted.contains("ProtoError > :: Ok"));
        assert!(emitted.contains("empty_response"));
    }
}
