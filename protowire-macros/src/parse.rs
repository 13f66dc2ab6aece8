//! Parsing for the proto_service macro.

use protowire_core::{ErrorType, InputType, Naming, OutputType, SingleJsonParameterWrapping};
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Error, Expr, FnArg, GenericArgument, Ident, ItemTrait, Lit, Meta, Pat, PatType,
    PathArguments, Result, ReturnType, Token, TraitItem, TraitItemFn, Type,
};

/// Service-level arguments of the `#[proto_service(...)]` attribute.
#[derive(Debug, Default)]
pub struct ServiceArgs {
    pub path: Option<String>,
    pub input: Option<InputType>,
    pub output: Option<OutputType>,
    pub error: Option<ErrorType>,
    pub naming: Option<Naming>,
    pub parameter_naming: Option<Naming>,
    pub wrapping: Option<SingleJsonParameterWrapping>,
    pub keep_async_suffix: bool,
    pub http_client: Option<String>,
}

impl Parse for ServiceArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut args = Self::default();
        let metas = Punctuated::<Meta, Token![,]>::parse_terminated(input)?;
        for meta in metas {
            match &meta {
                Meta::Path(path) if path.is_ident("keep_async_suffix") => {
                    args.keep_async_suffix = true;
                }
                Meta::Path(path) if path.is_ident("wrap_single_json") => {
                    args.wrapping = Some(SingleJsonParameterWrapping::Wrap);
                }
                Meta::NameValue(nv) if nv.path.is_ident("path") => {
                    args.path = Some(string_value(&nv.value)?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("http_client") => {
                    args.http_client = Some(string_value(&nv.value)?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("input") => {
                    args.input = Some(input_value(&nv.value)?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("output") => {
                    args.output = Some(output_value(&nv.value)?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("error") => {
                    args.error = Some(error_value(&nv.value)?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("naming") => {
                    args.naming = Some(naming_value(&nv.value)?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("parameter_naming") => {
                    args.parameter_naming = Some(naming_value(&nv.value)?);
                }
                other => {
                    return Err(Error::new_spanned(other, "unrecognized proto_service option"));
                }
            }
        }
        Ok(args)
    }
}

/// Method-level overrides parsed from `#[proto(...)]` attributes.
#[derive(Debug, Default)]
pub struct MethodOptions {
    pub path: Option<String>,
    pub input: Option<InputType>,
    pub output: Option<OutputType>,
    pub error: Option<ErrorType>,
    pub naming: Option<Naming>,
    pub parameter_naming: Option<Naming>,
    pub wrapping: Option<SingleJsonParameterWrapping>,
    pub keep_async_suffix: Option<bool>,
}

impl MethodOptions {
    fn parse_attrs(attrs: &[Attribute]) -> Result<Self> {
        let mut options = Self::default();
        for attr in attrs {
            if !attr.path().is_ident("proto") {
                continue;
            }
            let metas =
                attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
            for meta in metas {
                match &meta {
                    Meta::Path(path) if path.is_ident("keep_async_suffix") => {
                        options.keep_async_suffix = Some(true);
                    }
                    Meta::Path(path) if path.is_ident("wrap_single_json") => {
                        options.wrapping = Some(SingleJsonParameterWrapping::Wrap);
                    }
                    Meta::NameValue(nv) if nv.path.is_ident("path") => {
                        options.path = Some(string_value(&nv.value)?);
                    }
                    Meta::NameValue(nv) if nv.path.is_ident("input") => {
                        options.input = Some(input_value(&nv.value)?);
                    }
                    Meta::NameValue(nv) if nv.path.is_ident("output") => {
                        options.output = Some(output_value(&nv.value)?);
                    }
                    Meta::NameValue(nv) if nv.path.is_ident("error") => {
                        options.error = Some(error_value(&nv.value)?);
                    }
                    Meta::NameValue(nv) if nv.path.is_ident("naming") => {
                        options.naming = Some(naming_value(&nv.value)?);
                    }
                    Meta::NameValue(nv) if nv.path.is_ident("parameter_naming") => {
                        options.parameter_naming = Some(naming_value(&nv.value)?);
                    }
                    other => {
                        return Err(Error::new_spanned(other, "unrecognized proto option"));
                    }
                }
            }
        }
        Ok(options)
    }
}

/// Parsed service definition.
#[derive(Debug)]
pub struct ServiceDefinition {
    /// Visibility of the trait.
    pub vis: syn::Visibility,
    /// Name of the service trait.
    pub name: Ident,
    /// Parsed methods.
    pub methods: Vec<MethodDefinition>,
    /// Trait item with proto attributes stripped (for re-emission).
    pub original: ItemTrait,
}

/// Parsed method definition.
#[derive(Debug)]
pub struct MethodDefinition {
    /// Method name.
    pub name: Ident,
    /// Method arguments (excluding self and the cancellation token).
    pub args: Vec<MethodArg>,
    /// Whether the method's last parameter is a cancellation token.
    pub uses_cancellation: bool,
    /// Declared name of the cancellation parameter, if any.
    pub cancel_param: Option<Ident>,
    /// Classified return shape.
    pub shape: ReturnShape,
    /// Method-level overrides.
    pub options: MethodOptions,
}

/// A wire-visible method argument.
#[derive(Debug)]
pub struct MethodArg {
    /// Argument name.
    pub name: Ident,
    /// Argument type.
    pub ty: Type,
    /// Custom serialization override for this argument only.
    pub converter: Option<syn::Path>,
}

/// Recognized asynchronous return shapes.
#[derive(Debug)]
pub enum ReturnShape {
    /// `async fn ... -> Result<T, ProtoError>`.
    Future { ok: Type, no_return: bool },
    /// `fn ... -> BoxStream<'static, Result<T, ProtoError>>`.
    Stream { item: Type },
}

impl ServiceDefinition {
    /// Parse a trait into a service definition.
    pub fn parse(item: ItemTrait) -> Result<Self> {
        let mut methods = Vec::new();

        for trait_item in &item.items {
            if let TraitItem::Fn(method) = trait_item {
                methods.push(MethodDefinition::parse(method)?);
            }
        }

        if methods.is_empty() {
            return Err(Error::new_spanned(
                &item,
                "proto service trait must have at least one method",
            ));
        }

        let mut original = item.clone();
        strip_proto_attrs(&mut original);

        Ok(Self {
            vis: item.vis.clone(),
            name: item.ident.clone(),
            methods,
            original,
        })
    }
}

impl MethodDefinition {
    /// Parse a trait method into a method definition.
    pub fn parse(method: &TraitItemFn) -> Result<Self> {
        let sig = &method.sig;

        match sig.inputs.first() {
            Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() => {}
            _ => {
                return Err(Error::new_spanned(
                    sig,
                    "proto methods must take &self",
                ));
            }
        }

        let options = MethodOptions::parse_attrs(&method.attrs)?;
        let shape = Self::parse_return_shape(sig)?;

        let mut args = Vec::new();
        let mut uses_cancellation = false;
        let mut cancel_param = None;
        let last_index = sig.inputs.len() - 1;
        for (index, input) in sig.inputs.iter().enumerate().skip(1) {
            let FnArg::Typed(PatType { pat, ty, attrs, .. }) = input else {
                continue;
            };
            let name = match pat.as_ref() {
                Pat::Ident(ident) => ident.ident.clone(),
                _ => {
                    return Err(Error::new_spanned(
                        pat,
                        "expected identifier pattern for argument",
                    ));
                }
            };
            // The cancellation token must be the last parameter; it is
            // excluded from the wire parameter list.
            if index == last_index && is_cancellation_token(ty) {
                uses_cancellation = true;
                cancel_param = Some(name);
                continue;
            }
            let converter = parse_converter(attrs)?;
            args.push(MethodArg {
                name,
                ty: ty.as_ref().clone(),
                converter,
            });
        }

        Ok(Self {
            name: sig.ident.clone(),
            args,
            uses_cancellation,
            cancel_param,
            shape,
            options,
        })
    }

    fn parse_return_shape(sig: &syn::Signature) -> Result<ReturnShape> {
        if sig.asyncness.is_some() {
            let ty = match &sig.output {
                ReturnType::Type(_, ty) => ty.as_ref(),
                ReturnType::Default => {
                    return Err(Error::new_spanned(
                        sig,
                        "proto methods must return Result<T, ProtoError>",
                    ));
                }
            };
            if let Some((ok, err)) = result_types(ty) {
                require_proto_error(&err)?;
                let no_return = is_unit(&ok);
                return Ok(ReturnShape::Future { ok, no_return });
            }
            return Err(Error::new_spanned(
                &sig.output,
                "proto methods must return Result<T, ProtoError>",
            ));
        }

        // Non-async methods must produce a stream shape.
        if let ReturnType::Type(_, ty) = &sig.output {
            if let Some(item) = box_stream_item(ty)? {
                return Ok(ReturnShape::Stream { item });
            }
        }
        Err(Error::new_spanned(
            sig,
            "unsupported return type: expected `async fn -> Result<T, ProtoError>` \
             or `fn -> BoxStream<'static, Result<T, ProtoError>>`",
        ))
    }
}

/// Extract `(T, E)` from a `Result<T, E>` type.
fn result_types(ty: &Type) -> Option<(Type, Type)> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(t) => Some(t.clone()),
        _ => None,
    });
    let ok = types.next()?;
    let err = types.next()?;
    Some((ok, err))
}

/// Extract `T` from `BoxStream<'static, Result<T, ProtoError>>`.
fn box_stream_item(ty: &Type) -> Result<Option<Type>> {
    let Type::Path(type_path) = ty else {
        return Ok(None);
    };
    let Some(segment) = type_path.path.segments.last() else {
        return Ok(None);
    };
    if segment.ident != "BoxStream" {
        return Ok(None);
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return Ok(None);
    };
    let Some(item_ty) = args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(t) => Some(t),
        _ => None,
    }) else {
        return Ok(None);
    };
    let Some((ok, err)) = result_types(item_ty) else {
        return Err(Error::new_spanned(
            item_ty,
            "streaming methods must yield Result<T, ProtoError> items",
        ));
    };
    require_proto_error(&err)?;
    Ok(Some(ok))
}

fn require_proto_error(err: &Type) -> Result<()> {
    if let Type::Path(type_path) = err {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "ProtoError" {
                return Ok(());
            }
        }
    }
    Err(Error::new_spanned(
        err,
        "proto methods must use ProtoError as their error type",
    ))
}

fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}

fn is_cancellation_token(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "CancellationToken";
        }
    }
    false
}

/// Read `#[proto(with = Path)]` from a parameter's attributes.
fn parse_converter(attrs: &[Attribute]) -> Result<Option<syn::Path>> {
    for attr in attrs {
        if !attr.path().is_ident("proto") {
            continue;
        }
        let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in metas {
            match &meta {
                Meta::NameValue(nv) if nv.path.is_ident("with") => {
                    if let Expr::Path(expr_path) = &nv.value {
                        return Ok(Some(expr_path.path.clone()));
                    }
                    return Err(Error::new_spanned(&nv.value, "expected a converter path"));
                }
                other => {
                    return Err(Error::new_spanned(other, "unrecognized parameter option"));
                }
            }
        }
    }
    Ok(None)
}

/// Remove `#[proto(...)]` from methods and parameters before re-emission.
fn strip_proto_attrs(item: &mut ItemTrait) {
    for trait_item in &mut item.items {
        if let TraitItem::Fn(method) = trait_item {
            method.attrs.retain(|attr| !attr.path().is_ident("proto"));
            for input in &mut method.sig.inputs {
                if let FnArg::Typed(pat_type) = input {
                    pat_type.attrs.retain(|attr| !attr.path().is_ident("proto"));
                }
            }
        }
    }
}

fn string_value(expr: &Expr) -> Result<String> {
    if let Expr::Lit(lit) = expr {
        if let Lit::Str(s) = &lit.lit {
            return Ok(s.value());
        }
    }
    Err(Error::new_spanned(expr, "expected a string literal"))
}

fn option_ident(expr: &Expr) -> Result<Ident> {
    if let Expr::Path(path) = expr {
        if let Some(ident) = path.path.get_ident() {
            return Ok(ident.clone());
        }
    }
    Err(Error::new_spanned(expr, "expected an identifier"))
}

fn input_value(expr: &Expr) -> Result<InputType> {
    let ident = option_ident(expr)?;
    match ident.to_string().as_str() {
        "default" => Ok(InputType::Default),
        "json" => Ok(InputType::Json),
        "query" => Ok(InputType::Query),
        "form" => Ok(InputType::Form),
        "custom" => Ok(InputType::Custom),
        _ => Err(Error::new_spanned(
            expr,
            "expected one of: default, json, query, form, custom",
        )),
    }
}

fn output_value(expr: &Expr) -> Result<OutputType> {
    let ident = option_ident(expr)?;
    match ident.to_string().as_str() {
        "default" => Ok(OutputType::Default),
        "json" => Ok(OutputType::Json),
        "custom" => Ok(OutputType::Custom),
        _ => Err(Error::new_spanned(
            expr,
            "expected one of: default, json, custom",
        )),
    }
}

fn error_value(expr: &Expr) -> Result<ErrorType> {
    let ident = option_ident(expr)?;
    match ident.to_string().as_str() {
        "default" => Ok(ErrorType::Default),
        "json" => Ok(ErrorType::Json),
        "custom" => Ok(ErrorType::Custom),
        _ => Err(Error::new_spanned(
            expr,
            "expected one of: default, json, custom",
        )),
    }
}

fn naming_value(expr: &Expr) -> Result<Naming> {
    let ident = option_ident(expr)?;
    match ident.to_string().as_str() {
        "snake_case" => Ok(Naming::SnakeCase),
        "camel_case" => Ok(Naming::CamelCase),
        "pascal_case" => Ok(Naming::PascalCase),
        "kebab_case" => Ok(Naming::KebabCase),
        _ => Err(Error::new_spanned(
            expr,
            "expected one of: snake_case, camel_case, pascal_case, kebab_case",
        )),
    }
}
