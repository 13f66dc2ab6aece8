//! Emits the typed HTTP client for a service trait.
//!
//! The client implements the service trait over reqwest. Absolute method
//! URLs are computed once per method and cached; request bodies follow the
//! resolved input encoding and the response path runs through the shared
//! error protocol before the payload is read.

use proc_macro2::TokenStream;
use protowire_core::InputType;
use quote::{format_ident, quote};
use syn::Ident;

use crate::parse::{ReturnShape, ServiceDefinition};
use crate::resolve::{InputDto, MethodDescriptor, ServiceDescriptor};

use super::metadata_module;

pub fn generate(service: &ServiceDefinition, descriptor: &ServiceDescriptor) -> TokenStream {
    let vis = &service.vis;
    let trait_name = &service.name;
    let client_name = format_ident!("{}Client", trait_name);
    let module = metadata_module(service);
    let count = descriptor.methods.len();

    let build_fns = descriptor
        .methods
        .iter()
        .map(|method| build_request_fn(&module, method));
    let trait_methods = descriptor.methods.iter().map(trait_method);
    let client_doc = format!("Typed HTTP client for [`{trait_name}`].");

    quote! {
        #[doc = #client_doc]
        #[derive(Debug, Clone)]
        #vis struct #client_name {
            http: ::protowire::reqwest::Client,
            endpoint: ::std::string::String,
            service_path: ::std::string::String,
            method_urls: [::std::sync::OnceLock<::std::string::String>; #count],
        }

        impl #client_name {
            /// Create a client from an endpoint configuration, obtaining the
            /// HTTP client from `factory` under the configured profile.
            #[must_use]
            pub fn new(
                configuration: &::protowire::client::EndpointConfiguration,
                factory: &dyn ::protowire::client::HttpClientFactory,
            ) -> Self {
                let profile = configuration
                    .http_client
                    .as_deref()
                    .unwrap_or(#module::HTTP_CLIENT_PROFILE);
                let service_path = match &configuration.path {
                    ::std::option::Option::Some(path) => path.trim_matches('/').to_owned(),
                    ::std::option::Option::None => #module::SERVICE_PATH.to_owned(),
                };
                Self {
                    http: factory.client_for(profile),
                    endpoint: configuration.endpoint.trim_end_matches('/').to_owned(),
                    service_path,
                    method_urls: ::std::array::from_fn(|_| ::std::sync::OnceLock::new()),
                }
            }

            /// Create a client for a literal endpoint with a default HTTP
            /// client.
            #[must_use]
            pub fn with_endpoint(endpoint: impl ::std::convert::Into<::std::string::String>) -> Self {
                Self::new(
                    &::protowire::client::EndpointConfiguration::for_endpoint(endpoint.into()),
                    &::protowire::client::DefaultHttpClientFactory::new(),
                )
            }

            fn method_url(&self, method: #module::Methods) -> &str {
                self.method_urls[method as usize].get_or_init(|| {
                    if self.service_path.is_empty() {
                        ::std::format!("{}/{}", self.endpoint, method.path())
                    } else {
                        ::std::format!("{}/{}/{}", self.endpoint, self.service_path, method.path())
                    }
                })
            }

            #(#build_fns)*
        }

        #[::protowire::async_trait::async_trait]
        impl #trait_name for #client_name {
            #(#trait_methods)*
        }
    }
}

fn build_fn_name(method: &MethodDescriptor) -> Ident {
    format_ident!("build_{}_request", method.method_id)
}

/// Per-method request builder: encodes the wire parameters according to the
/// resolved input encoding.
fn build_request_fn(module: &Ident, method: &MethodDescriptor) -> TokenStream {
    let name = build_fn_name(method);
    let variant = &method.variant;
    let params = method.parameters.iter().map(|p| {
        let pname = &p.name;
        let ty = &p.ty;
        quote!(#pname: #ty)
    });
    let map_build_err = quote! {
        .map_err(|e| ::protowire::ProtoError::generic(
            ::std::format!("unable to build request: {e}")
        ))
    };

    let body = match method.input {
        InputType::Query => {
            if method.parameters.is_empty() {
                quote! {
                    self.http
                        .get(self.method_url(#module::Methods::#variant))
                        .build()
                        #map_build_err
                }
            } else {
                let appends = method.parameters.iter().map(|p| {
                    let key = &p.key;
                    let value = encode_value(p);
                    quote! {
                        if !query.is_empty() {
                            query.push('&');
                        }
                        query.push_str(#key);
                        query.push('=');
                        query.push_str(&::protowire::client::escape(&#value));
                    }
                });
                quote! {
                    let mut query = ::std::string::String::new();
                    #(#appends)*
                    let url = ::std::format!(
                        "{}?{}",
                        self.method_url(#module::Methods::#variant),
                        query,
                    );
                    self.http.get(url).build() #map_build_err
                }
            }
        }
        InputType::Form => {
            let body = if method.parameters.is_empty() {
                quote!(::std::string::String::new())
            } else {
                let pushes = method.parameters.iter().map(|p| {
                    let key = &p.key;
                    let pname = &p.name;
                    match &p.converter {
                        Some(converter) => {
                            let ty = &p.ty;
                            quote! {
                                pairs.push((
                                    #key,
                                    <#converter as ::protowire::ArgumentCodec<#ty>>::encode(&#pname),
                                ));
                            }
                        }
                        // Default-valued fields are omitted from form bodies.
                        None => quote! {
                            if !::protowire::ToArgument::is_omitted(&#pname) {
                                pairs.push((#key, ::protowire::ToArgument::to_argument(&#pname)));
                            }
                        },
                    }
                });
                quote! {{
                    let mut pairs: ::std::vec::Vec<(&str, ::std::string::String)> =
                        ::std::vec::Vec::new();
                    #(#pushes)*
                    ::protowire::client::encode_form(&pairs)
                }}
            };
            quote! {
                let body = #body;
                self.http
                    .post(self.method_url(#module::Methods::#variant))
                    .header(
                        ::protowire::reqwest::header::CONTENT_TYPE,
                        ::protowire::client::FORM_MEDIA_TYPE,
                    )
                    .body(body)
                    .build()
                    #map_build_err
            }
        }
        // Json (Default and Custom never survive resolution).
        _ => {
            let body = match &method.input_dto {
                None => quote!(::std::vec::Vec::<u8>::new()),
                Some(InputDto::Bare(_)) => {
                    let pname = &method.parameters[0].name;
                    quote! {
                        ::protowire::serde_json::to_vec(&#pname).map_err(|e| {
                            ::protowire::ProtoError::generic(
                                ::std::format!("unable to serialize arguments: {e}")
                            )
                        })?
                    }
                }
                Some(InputDto::Synthetic(dto)) => {
                    let fields = method.parameters.iter().map(|p| &p.name);
                    quote! {
                        ::protowire::serde_json::to_vec(&#module::#dto { #(#fields),* })
                            .map_err(|e| {
                                ::protowire::ProtoError::generic(
                                    ::std::format!("unable to serialize arguments: {e}")
                                )
                            })?
                    }
                }
            };
            quote! {
                let body = #body;
                self.http
                    .post(self.method_url(#module::Methods::#variant))
                    .header(
                        ::protowire::reqwest::header::CONTENT_TYPE,
                        ::protowire::client::JSON_MEDIA_TYPE,
                    )
                    .body(body)
                    .build()
                    #map_build_err
            }
        }
    };

    quote! {
        fn #name(
            &self,
            #(#params),*
        ) -> ::std::result::Result<::protowire::reqwest::Request, ::protowire::ProtoError> {
            #body
        }
    }
}

fn encode_value(parameter: &crate::resolve::ParameterDescriptor) -> TokenStream {
    let pname = &parameter.name;
    match &parameter.converter {
        Some(converter) => {
            let ty = &parameter.ty;
            quote!(<#converter as ::protowire::ArgumentCodec<#ty>>::encode(&#pname))
        }
        None => quote!(::protowire::ToArgument::to_argument(&#pname)),
    }
}

/// The trait implementation for one method: build, send (with optional
/// cancellation), run the error protocol, read the payload.
fn trait_method(method: &MethodDescriptor) -> TokenStream {
    let name = &method.name;
    let build_fn = build_fn_name(method);
    let params = method.parameters.iter().map(|p| {
        let pname = &p.name;
        let ty = &p.ty;
        quote!(#pname: #ty,)
    });
    let arg_names: Vec<_> = method.parameters.iter().map(|p| &p.name).collect();
    let cancel_param = method.uses_cancellation.then(|| {
        let cancel = method.cancel_param.as_ref().unwrap();
        quote!(#cancel: ::protowire::CancellationToken,)
    });
    let token_expr = match (&method.cancel_param, method.uses_cancellation) {
        (Some(cancel), true) => quote!(::std::option::Option::Some(&#cancel)),
        _ => quote!(::std::option::Option::None),
    };

    match &method.shape {
        ReturnShape::Future { ok, no_return } => {
            let read = if *no_return {
                quote! {
                    let _ = response;
                    ::std::result::Result::Ok(())
                }
            } else {
                quote! {
                    response.json::<#ok>().await.map_err(|e| {
                        ::protowire::ProtoError::generic(
                            ::std::format!("unable to read response: {e}")
                        )
                    })
                }
            };
            quote! {
                async fn #name(
                    &self,
                    #(#params)*
                    #cancel_param
                ) -> ::std::result::Result<#ok, ::protowire::ProtoError> {
                    let request = self.#build_fn(#(#arg_names),*)?;
                    let response =
                        ::protowire::client::send(&self.http, request, #token_expr).await?;
                    let response = ::protowire::client::handle_errors(response).await?;
                    #read
                }
            }
        }
        ReturnShape::Stream { item } => {
            quote! {
                fn #name(
                    &self,
                    #(#params)*
                    #cancel_param
                ) -> ::protowire::futures_core::stream::BoxStream<
                    'static,
                    ::std::result::Result<#item, ::protowire::ProtoError>,
                > {
                    let request = self.#build_fn(#(#arg_names),*);
                    let http = self.http.clone();
                    ::std::boxed::Box::pin(::protowire::async_stream::try_stream! {
                        let request = request?;
                        let response =
                            ::protowire::client::send(&http, request, #token_expr).await?;
                        let response = ::protowire::client::handle_errors(response).await?;
                        let items = response
                            .json::<::std::vec::Vec<#item>>()
                            .await
                            .map_err(|e| {
                                ::protowire::ProtoError::generic(::std::format!(
                                    "unable to read streaming response: {e}"
                                ))
                            })?;
                        for item in items {
                            yield item;
                        }
                    })
                }
            }
        }
    }
}
