//! Contract resolution: turns a parsed service definition plus the
//! attribute cascade into immutable wire descriptors.
//!
//! Every option resolves as method override, then service override, then
//! computed default. The computed defaults are: an input of `Default`
//! becomes `Query` when the method has no wire parameters and `Json`
//! otherwise; an output of `Default` becomes `Json` when the method has a
//! return value.

use std::collections::HashSet;

use protowire_core::{
    convention, ErrorType, InputType, NamingConvention, OutputType, PascalCase,
    SingleJsonParameterWrapping, Verb,
};
use quote::format_ident;
use syn::{Error, Ident, Result, Type};

use crate::parse::{MethodDefinition, ReturnShape, ServiceArgs, ServiceDefinition};

/// Fully resolved service descriptor.
pub struct ServiceDescriptor {
    /// Service path segment prefixed to every method path.
    pub root_path: String,
    /// Named client profile used to obtain an HTTP client.
    pub http_client: String,
    /// Resolved methods, in declaration order.
    pub methods: Vec<MethodDescriptor>,
}

/// Fully resolved method descriptor.
pub struct MethodDescriptor {
    /// Source method name.
    pub name: Ident,
    /// Stable method identifier (source name minus the async suffix).
    pub method_id: String,
    /// Pascal-cased identifier used for enum variants and DTO names.
    pub variant: Ident,
    /// Path segment relative to the service path.
    pub path: String,
    /// HTTP verb.
    pub verb: Verb,
    pub input: InputType,
    pub output: OutputType,
    pub error: ErrorType,
    /// Wire parameters, in declaration order.
    pub parameters: Vec<ParameterDescriptor>,
    /// Shape of the request payload, if any.
    pub input_dto: Option<InputDto>,
    pub uses_cancellation: bool,
    /// Declared name of the cancellation parameter, if any.
    pub cancel_param: Option<Ident>,
    pub shape: ReturnShape,
    /// True for `Result<(), _>` methods: no response payload is written.
    pub no_return: bool,
}

/// Resolved wire parameter.
pub struct ParameterDescriptor {
    /// Source argument name.
    pub name: Ident,
    /// Wire key after applying the parameter naming convention.
    pub key: String,
    pub ty: Type,
    pub converter: Option<syn::Path>,
}

/// Shape of the request payload for JSON input.
pub enum InputDto {
    /// Single unwrapped parameter: its type is the payload type.
    Bare(Type),
    /// Synthetic struct carrying the parameters as fields.
    Synthetic(Ident),
}

/// Resolve the attribute cascade into a service descriptor.
pub fn resolve(args: &ServiceArgs, service: &ServiceDefinition) -> Result<ServiceDescriptor> {
    let service_naming = args.naming.unwrap_or_default();
    let root_path = match &args.path {
        Some(path) => path.trim_matches('/').to_owned(),
        None => convention(service_naming).apply(&service.name.to_string()),
    };
    let http_client = args
        .http_client
        .clone()
        .unwrap_or_else(|| service.name.to_string());

    let mut methods = Vec::with_capacity(service.methods.len());
    let mut seen = HashSet::new();
    for method in &service.methods {
        let descriptor = resolve_method(args, method)?;
        if !seen.insert(descriptor.method_id.clone()) {
            return Err(Error::new_spanned(
                &method.name,
                format!("duplicate method id `{}`", descriptor.method_id),
            ));
        }
        methods.push(descriptor);
    }

    Ok(ServiceDescriptor {
        root_path,
        http_client,
        methods,
    })
}

fn resolve_method(args: &ServiceArgs, method: &MethodDefinition) -> Result<MethodDescriptor> {
    let opts = &method.options;

    let input = match opts.input.or(args.input).unwrap_or_default() {
        InputType::Default if method.args.is_empty() => InputType::Query,
        InputType::Default => InputType::Json,
        other => other,
    };
    let no_return = match &method.shape {
        ReturnShape::Future { no_return, .. } => *no_return,
        ReturnShape::Stream { .. } => false,
    };
    let output = match opts.output.or(args.output).unwrap_or_default() {
        OutputType::Default if !no_return => OutputType::Json,
        other => other,
    };
    let error = opts.error.or(args.error).unwrap_or_default();
    let wrapping = opts.wrapping.or(args.wrapping).unwrap_or_default();
    let keep_suffix = opts.keep_async_suffix.unwrap_or(args.keep_async_suffix);

    let source_name = method.name.to_string();
    let method_id = source_name
        .strip_suffix("_async")
        .unwrap_or(&source_name)
        .to_owned();
    let path_source = if keep_suffix { &source_name } else { &method_id };
    let path = match &opts.path {
        Some(path) => path.trim_matches('/').to_owned(),
        None => {
            let naming = opts.naming.or(args.naming).unwrap_or_default();
            convention(naming).apply(path_source)
        }
    };
    let verb = match input {
        InputType::Query => Verb::Get,
        _ => Verb::Post,
    };

    let parameter_naming = opts.parameter_naming.or(args.parameter_naming);
    let parameters = method
        .args
        .iter()
        .map(|arg| {
            let source = arg.name.to_string();
            let key = match parameter_naming {
                Some(naming) => convention(naming).apply(&source),
                None => source,
            };
            ParameterDescriptor {
                name: arg.name.clone(),
                key,
                ty: arg.ty.clone(),
                converter: arg.converter.clone(),
            }
        })
        .collect::<Vec<_>>();

    let variant = pascal_ident(&method_id);
    let input_dto = match (input, parameters.len(), wrapping) {
        (InputType::Json, 0, _) => None,
        (InputType::Json, 1, SingleJsonParameterWrapping::DoNotWrap) => {
            Some(InputDto::Bare(parameters[0].ty.clone()))
        }
        (InputType::Json, _, _) => Some(InputDto::Synthetic(format_ident!("Dto{}Args", variant))),
        _ => None,
    };

    Ok(MethodDescriptor {
        name: method.name.clone(),
        method_id,
        variant,
        path,
        verb,
        input,
        output,
        error,
        parameters,
        input_dto,
        uses_cancellation: method.uses_cancellation,
        cancel_param: method.cancel_param.clone(),
        shape: clone_shape(&method.shape),
        no_return,
    })
}

fn clone_shape(shape: &ReturnShape) -> ReturnShape {
    match shape {
        ReturnShape::Future { ok, no_return } => ReturnShape::Future {
            ok: ok.clone(),
            no_return: *no_return,
        },
        ReturnShape::Stream { item } => ReturnShape::Stream { item: item.clone() },
    }
}

fn pascal_ident(method_id: &str) -> Ident {
    format_ident!("{}", PascalCase.apply(method_id))
}

/// Reject encodings that require hand-written glue at emission time.
pub fn validate_encodings(descriptor: &ServiceDescriptor, service: &ServiceDefinition) -> Result<()> {
    for method in &descriptor.methods {
        if method.input == InputType::Custom
            || method.output == OutputType::Custom
            || method.error == ErrorType::Custom
        {
            return Err(Error::new_spanned(
                &service.name,
                format!(
                    "method `{}` uses a custom encoding, which cannot be generated",
                    method.method_id
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use syn::ItemTrait;

    fn service(tokens: proc_macro2::TokenStream) -> ServiceDefinition {
        let item: ItemTrait = syn::parse2(tokens).unwrap();
        ServiceDefinition::parse(item).unwrap()
    }

    fn service_args(tokens: proc_macro2::TokenStream) -> ServiceArgs {
        syn::parse2(tokens).unwrap()
    }

    #[test]
    fn test_default_resolution() {
        let def = service(quote! {
            trait MathService {
                async fn add(&self, a: i32, b: i32) -> Result<i32, ProtoError>;
                async fn inc(&self) -> Result<(), ProtoError>;
            }
        });
        let descriptor = resolve(&ServiceArgs::default(), &def).unwrap();

        assert_eq!(descriptor.root_path, "math_service");
        assert_eq!(descriptor.http_client, "MathService");

        let add = &descriptor.methods[0];
        assert_eq!(add.input, InputType::Json);
        assert_eq!(add.output, OutputType::Json);
        assert_eq!(add.verb, Verb::Post);
        assert_eq!(add.path, "add");
        assert!(matches!(add.input_dto, Some(InputDto::Synthetic(_))));

        // No parameters: GET with no payload.
        let inc = &descriptor.methods[1];
        assert_eq!(inc.input, InputType::Query);
        assert_eq!(inc.output, OutputType::Default);
        assert_eq!(inc.verb, Verb::Get);
        assert!(inc.input_dto.is_none());
        assert!(inc.no_return);
    }

    #[test]
    fn test_cancellation_parameter_survives_resolution() {
        let def = service(quote! {
            trait Math {
                async fn add(
                    &self,
                    a: i32,
                    b: i32,
                    cancellation: CancellationToken,
                ) -> Result<i32, ProtoError>;
                async fn inc(&self) -> Result<(), ProtoError>;
            }
        });
        let descriptor = resolve(&ServiceArgs::default(), &def).unwrap();

        let add = &descriptor.methods[0];
        assert!(add.uses_cancellation);
        assert_eq!(add.cancel_param.as_ref().unwrap().to_string(), "cancellation");
        // The cancellation parameter never reaches the wire.
        assert_eq!(add.parameters.len(), 2);

        let inc = &descriptor.methods[1];
        assert!(!inc.uses_cancellation);
        assert!(inc.cancel_param.is_none());
    }

    #[test]
    fn test_async_suffix_stripped() {
        let def = service(quote! {
            trait Math {
                async fn add_async(&self, a: i32) -> Result<i32, ProtoError>;
            }
        });
        let descriptor = resolve(&ServiceArgs::default(), &def).unwrap();
        let add = &descriptor.methods[0];
        assert_eq!(add.method_id, "add");
        assert_eq!(add.path, "add");
        assert_eq!(add.variant.to_string(), "Add");
    }

    #[test]
    fn test_keep_async_suffix_affects_path_only() {
        let def = service(quote! {
            trait Math {
                async fn add_async(&self, a: i32) -> Result<i32, ProtoError>;
            }
        });
        let descriptor =
            resolve(&service_args(quote! { keep_async_suffix }), &def).unwrap();
        let add = &descriptor.methods[0];
        assert_eq!(add.method_id, "add");
        assert_eq!(add.path, "add_async");
    }

    #[test]
    fn test_service_overrides_and_method_overrides() {
        let def = service(quote! {
            trait Math {
                async fn plain(&self, a: i32) -> Result<i32, ProtoError>;
                #[proto(input = query, path = "sum")]
                async fn overridden(&self, a: i32) -> Result<i32, ProtoError>;
            }
        });
        let descriptor = resolve(&service_args(quote! { input = form }), &def).unwrap();

        assert_eq!(descriptor.methods[0].input, InputType::Form);
        assert_eq!(descriptor.methods[0].verb, Verb::Post);
        assert_eq!(descriptor.methods[1].input, InputType::Query);
        assert_eq!(descriptor.methods[1].verb, Verb::Get);
        assert_eq!(descriptor.methods[1].path, "sum");
    }

    #[test]
    fn test_explicit_paths_trimmed() {
        let def = service(quote! {
            trait Math {
                #[proto(path = "/sum/")]
                async fn add(&self, a: i32) -> Result<i32, ProtoError>;
            }
        });
        let descriptor =
            resolve(&service_args(quote! { path = "/v1/math/" }), &def).unwrap();
        assert_eq!(descriptor.root_path, "v1/math");
        assert_eq!(descriptor.methods[0].path, "sum");
    }

    #[test]
    fn test_single_json_parameter_wrapping() {
        let def = service(quote! {
            trait Math {
                async fn bare(&self, data: MyData) -> Result<i32, ProtoError>;
                #[proto(wrap_single_json)]
                async fn wrapped(&self, data: MyData) -> Result<i32, ProtoError>;
            }
        });
        let descriptor = resolve(&ServiceArgs::default(), &def).unwrap();

        assert!(matches!(
            descriptor.methods[0].input_dto,
            Some(InputDto::Bare(_))
        ));
        assert!(matches!(
            descriptor.methods[1].input_dto,
            Some(InputDto::Synthetic(ref name)) if name == "DtoWrappedArgs"
        ));
    }

    #[test]
    fn test_parameter_naming() {
        let def = service(quote! {
            trait Math {
                async fn add(&self, first_value: i32) -> Result<i32, ProtoError>;
            }
        });
        let descriptor =
            resolve(&service_args(quote! { parameter_naming = camel_case }), &def).unwrap();
        assert_eq!(descriptor.methods[0].parameters[0].key, "firstValue");
    }

    #[test]
    fn test_duplicate_method_id_rejected() {
        let def = service(quote! {
            trait Math {
                async fn add(&self, a: i32) -> Result<i32, ProtoError>;
                async fn add_async(&self, a: i32) -> Result<i32, ProtoError>;
            }
        });
        assert!(resolve(&ServiceArgs::default(), &def).is_err());
    }

    #[test]
    fn test_custom_encoding_rejected() {
        let def = service(quote! {
            trait Math {
                #[proto(input = custom)]
                async fn add(&self, a: i32) -> Result<i32, ProtoError>;
            }
        });
        let descriptor = resolve(&ServiceArgs::default(), &def).unwrap();
        assert!(validate_encodings(&descriptor, &def).is_err());
    }

    #[test]
    fn test_kebab_naming_for_paths() {
        let def = service(quote! {
            trait UserDirectory {
                async fn find_user(&self, id: String) -> Result<String, ProtoError>;
            }
        });
        let descriptor = resolve(&service_args(quote! { naming = kebab_case }), &def).unwrap();
        assert_eq!(descriptor.root_path, "user-directory");
        assert_eq!(descriptor.methods[0].path, "find-user");
    }
}
