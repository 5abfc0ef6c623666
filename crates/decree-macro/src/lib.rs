//! # Decree Procedural Macros
//!
//! This crate provides the `#[command_container]` attribute, which turns an
//! inherent `impl` block into a Decree command container. It generates the
//! container metadata the compiler reads, the type-erased invokers that call
//! the annotated methods, and a registration entry in the global container
//! inventory.
//!
//! ## Container Definition
//!
//! ```ignore
//! #[decree::command_container]
//! #[permission("${root}.moderation")]
//! impl Moderation {
//!     pub fn new() -> Self {
//!         Self::default()
//!     }
//!
//!     /// Bans a player from the server.
//!     #[command("ban <target> [reason]")]
//!     #[proxied_by("b")]
//!     fn ban(
//!         &self,
//!         sender: &Admin,
//!         #[argument] target: Player,
//!         #[argument(default = "no reason given")] reason: Option<String>,
//!         #[flag(alias = "s")] silent: bool,
//!     ) -> anyhow::Result<()> {
//!         // ...
//!     }
//!
//!     #[parser]
//!     fn player(&self, ctx: &CommandContext, input: &mut CommandInput) -> Result<Player, ArgumentParseError> {
//!         // ...
//!     }
//!
//!     #[suggestions("players")]
//!     fn players(&self, ctx: &CommandContext, input: &str) -> Vec<Suggestion> {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Attributes
//!
//! On the `impl` block: `permission`, `hidden`, `confirmation`, `description`
//! and `annotate`.
//!
//! On methods: `command`, `parser`, `suggestions`, `proxied_by`, plus the
//! `impl` block attributes. A command method without `description` takes the
//! first paragraph of its doc comment.
//!
//! On parameters: `argument`, `flag`, `flags`, `regex` and `annotate`.
//! Parameters without an attribute are injected from the command context by
//! type; `&CommandContext` receives the context itself.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Error, Expr, FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl, Lit, LitStr,
    Meta, Pat, PathArguments, Result, ReturnType, Token, Type, meta::ParseNestedMeta,
    parse::{Parse, ParseStream},
    parse_macro_input,
    spanned::Spanned,
};

/// Attributes read from the `impl` block itself.
const CONTAINER_ATTRIBUTES: &[&str] =
    &["permission", "hidden", "confirmation", "description", "annotate"];

/// Attributes read from methods.
const METHOD_ATTRIBUTES: &[&str] = &[
    "command",
    "parser",
    "suggestions",
    "proxied_by",
    "permission",
    "hidden",
    "confirmation",
    "description",
    "annotate",
];

/// Attributes read from method parameters.
const PARAMETER_ATTRIBUTES: &[&str] = &["argument", "flag", "flags", "regex", "annotate"];

/// Options passed to `#[command_container(...)]`.
#[derive(Default)]
struct ContainerOptions {
    /// Overrides the registered name (defaults to `module_path!()::Type`).
    name: Option<LitStr>,
    /// Construct the container through `Default`.
    default: bool,
}

impl ContainerOptions {
    fn parse(&mut self, meta: &ParseNestedMeta<'_>) -> Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("default") {
            self.default = true;
            Ok(())
        } else {
            Err(meta.error("unsupported command_container option, expected `name` or `default`"))
        }
    }
}

/// Attribute macro declaring an `impl` block as a command container.
///
/// Options:
/// - `name = "..."` - register the container under this name instead of
///   `module_path!()::Type`
/// - `default` - construct the container through `Default::default()`
///
/// Without `default`, the container is constructed through an associated
/// `fn new(compiler: &AnnotationCompiler) -> Self` or `fn new() -> Self`.
///
/// # Errors
///
/// Returns a compile error if:
/// - The `impl` block is generic or implements a trait
/// - An annotated method does not take `&self`
/// - A method combines `#[command]`, `#[parser]` and `#[suggestions]`
/// - An attribute is malformed
#[proc_macro_attribute]
pub fn command_container(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut options = ContainerOptions::default();
    let options_parser = syn::meta::parser(|meta| options.parse(&meta));
    parse_macro_input!(attr with options_parser);

    let item = parse_macro_input!(item as ItemImpl);

    match expand_container(&options, item) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Expands a `#[command_container]` attribute into generated code.
///
/// 1. Strips Decree attributes from the block, its methods and parameters
/// 2. Builds a `ContainerMetadata` expression for every annotated method
/// 3. Implements `CommandContainer` for the self type
/// 4. Submits a `ContainerEntry` to the global inventory
fn expand_container(options: &ContainerOptions, mut item: ItemImpl) -> Result<TokenStream2> {
    if !item.generics.params.is_empty() {
        return Err(Error::new(
            item.generics.span(),
            "command containers cannot be generic",
        ));
    }
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new(
            path.span(),
            "#[command_container] must be placed on an inherent impl block",
        ));
    }

    let self_ty = (*item.self_ty).clone();
    let type_ident = type_ident(&self_ty)?;

    let container_attrs = take_attributes(&mut item.attrs, CONTAINER_ATTRIBUTES);
    let mut container_annotations = Vec::new();
    for attr in &container_attrs {
        container_annotations.push(shared_annotation(attr)?);
    }

    let mut methods = Vec::new();
    let mut with_compiler = false;
    let mut no_args = false;
    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        match constructor_kind(method) {
            Some(Constructor::WithCompiler) => with_compiler = true,
            Some(Constructor::NoArgs) => no_args = true,
            None => {}
        }
        if let Some(metadata) = expand_method(&self_ty, method)? {
            methods.push(metadata);
        }
    }

    let name = match &options.name {
        Some(name) => quote!(#name),
        None => {
            let ident = type_ident.to_string();
            quote!(::core::concat!(::core::module_path!(), "::", #ident))
        }
    };

    let with_compiler = if with_compiler {
        quote! {
            ::core::option::Option::Some(
                |compiler: &::decree::AnnotationCompiler| -> ::std::sync::Arc<dyn ::decree::CommandContainer> {
                    ::std::sync::Arc::new(<#self_ty>::new(compiler))
                }
            )
        }
    } else {
        quote!(::core::option::Option::None)
    };

    let no_args = if options.default {
        quote! {
            ::core::option::Option::Some(
                || -> ::std::sync::Arc<dyn ::decree::CommandContainer> {
                    ::std::sync::Arc::new(<#self_ty as ::core::default::Default>::default())
                }
            )
        }
    } else if no_args {
        quote! {
            ::core::option::Option::Some(
                || -> ::std::sync::Arc<dyn ::decree::CommandContainer> {
                    ::std::sync::Arc::new(<#self_ty>::new())
                }
            )
        }
    } else {
        quote!(::core::option::Option::None)
    };

    let expanded = quote! {
        #item

        impl ::decree::CommandContainer for #self_ty {
            fn metadata(&self) -> ::decree::ContainerMetadata {
                ::decree::ContainerMetadata::new(#name)
                    #(.annotate(#container_annotations))*
                    #(.method(#methods))*
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }
        }

        // Sealed token prevents external construction of ContainerEntry
        ::decree::__private::inventory::submit! {
            ::decree::__private::ContainerEntry {
                name: #name,
                with_compiler: #with_compiler,
                no_args: #no_args,
                __sealed: ::decree::__private::sealed(),
            }
        }
    };

    Ok(expanded)
}

/// The identifier of the container type, e.g. `Moderation`.
fn type_ident(ty: &Type) -> Result<&syn::Ident> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => type_path
            .path
            .segments
            .last()
            .map(|segment| &segment.ident)
            .ok_or_else(|| Error::new(ty.span(), "expected a named container type")),
        _ => Err(Error::new(ty.span(), "expected a named container type")),
    }
}

enum Constructor {
    WithCompiler,
    NoArgs,
}

/// Recognizes `fn new(compiler: &AnnotationCompiler) -> Self` and `fn new() -> Self`.
fn constructor_kind(method: &ImplItemFn) -> Option<Constructor> {
    let sig = &method.sig;
    if sig.ident != "new" || !sig.generics.params.is_empty() {
        return None;
    }
    let ReturnType::Type(_, output) = &sig.output else {
        return None;
    };
    if !matches!(&**output, Type::Path(path) if path.path.is_ident("Self")) {
        return None;
    }

    let inputs: Vec<&FnArg> = sig.inputs.iter().collect();
    match inputs.as_slice() {
        [] => Some(Constructor::NoArgs),
        [FnArg::Typed(arg)] => match &*arg.ty {
            Type::Reference(reference)
                if reference.mutability.is_none()
                    && last_segment_is(&reference.elem, "AnnotationCompiler") =>
            {
                Some(Constructor::WithCompiler)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Removes the attributes named in `names` from `attrs` and returns them.
fn take_attributes(attrs: &mut Vec<Attribute>, names: &[&str]) -> Vec<Attribute> {
    let (taken, kept) = std::mem::take(attrs)
        .into_iter()
        .partition(|attr| names.iter().any(|name| attr.path().is_ident(name)));
    *attrs = kept;
    taken
}

fn attribute_name(attr: &Attribute) -> String {
    attr.path()
        .get_ident()
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Annotations valid on both containers and methods.
fn shared_annotation(attr: &Attribute) -> Result<TokenStream2> {
    match attribute_name(attr).as_str() {
        "permission" => {
            let permission: LitStr = attr.parse_args()?;
            Ok(quote!(::decree::annotation::Permission(::std::string::String::from(#permission))))
        }
        "hidden" => {
            attr.meta.require_path_only()?;
            Ok(quote!(::decree::annotation::Hidden))
        }
        "confirmation" => {
            attr.meta.require_path_only()?;
            Ok(quote!(::decree::annotation::Confirmation))
        }
        "description" => {
            let description: LitStr = attr.parse_args()?;
            Ok(quote! {
                ::decree::annotation::CommandDescription(::std::string::String::from(#description))
            })
        }
        "annotate" => {
            let annotation: Expr = attr.parse_args()?;
            Ok(quote!(#annotation))
        }
        name => Err(Error::new(
            attr.span(),
            format!("#[{name}] is not supported here"),
        )),
    }
}

/// Joins the first paragraph of a doc comment.
fn doc_summary(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| {
            if let Meta::NameValue(nv) = &attr.meta
                && let Expr::Lit(lit) = &nv.value
                && let Lit::Str(s) = &lit.lit
            {
                return Some(s.value().trim().to_string());
            }
            None
        })
        .skip_while(String::is_empty)
        .take_while(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

/// Parsed `#[command("syntax", ..., sender = Type)]`.
struct CommandArgs {
    syntax: Vec<LitStr>,
    sender: Option<Type>,
}

impl Parse for CommandArgs {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        let mut syntax = Vec::new();
        let mut sender = None;
        while !input.is_empty() {
            if input.peek(LitStr) {
                syntax.push(input.parse()?);
            } else {
                let key: syn::Ident = input.parse()?;
                if key != "sender" {
                    return Err(Error::new(key.span(), "expected a syntax string or `sender = Type`"));
                }
                input.parse::<Token![=]>()?;
                sender = Some(input.parse()?);
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(Self { syntax, sender })
    }
}

/// Parsed `#[proxied_by("alias", hidden)]`.
struct ProxyArgs {
    alias: LitStr,
    hidden: bool,
}

impl Parse for ProxyArgs {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        let alias = input.parse()?;
        let mut hidden = false;
        if input.parse::<Option<Token![,]>>()?.is_some() && !input.is_empty() {
            let flag: syn::Ident = input.parse()?;
            if flag != "hidden" {
                return Err(Error::new(flag.span(), "expected `hidden`"));
            }
            hidden = true;
        }
        Ok(Self { alias, hidden })
    }
}

/// Parsed `#[regex("pattern", message = "...")]`.
struct RegexArgs {
    pattern: LitStr,
    message: Option<LitStr>,
}

impl Parse for RegexArgs {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        let pattern = input.parse()?;
        let mut message = None;
        if input.parse::<Option<Token![,]>>()?.is_some() && !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            if key != "message" {
                return Err(Error::new(key.span(), "expected `message = \"...\"`"));
            }
            input.parse::<Token![=]>()?;
            message = Some(input.parse()?);
        }
        Ok(Self { pattern, message })
    }
}

/// Reads `key = "value"` pairs of a list attribute; a bare path yields nothing.
fn string_options(
    attr: &Attribute,
    mut accept: impl FnMut(&str, LitStr) -> Result<()>,
) -> Result<()> {
    if matches!(attr.meta, Meta::Path(_)) {
        return Ok(());
    }
    attr.parse_nested_meta(|meta| {
        let key = meta
            .path
            .get_ident()
            .map(ToString::to_string)
            .ok_or_else(|| meta.error("expected an option name"))?;
        let value: LitStr = meta.value()?.parse()?;
        accept(&key, value).map_err(|e| meta.error(e.to_string()))
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Role {
    Command,
    Parser,
    Suggestions,
}

/// Builds the `MethodMetadata` expression for an annotated method.
///
/// Returns `None` for methods without Decree attributes.
fn expand_method(self_ty: &Type, method: &mut ImplItemFn) -> Result<Option<TokenStream2>> {
    let attrs = take_attributes(&mut method.attrs, METHOD_ATTRIBUTES);
    let parameters_annotated = method.sig.inputs.iter().any(|input| {
        matches!(input, FnArg::Typed(arg)
            if arg.attrs.iter().any(|attr| PARAMETER_ATTRIBUTES.iter().any(|name| attr.path().is_ident(name))))
    });
    if attrs.is_empty() {
        if parameters_annotated {
            return Err(Error::new(
                method.sig.ident.span(),
                "parameter attributes require the method to be annotated with #[command]",
            ));
        }
        return Ok(None);
    }

    let mut role = None;
    let mut annotations = Vec::new();
    let mut has_description = false;
    for attr in &attrs {
        let name = attribute_name(attr);
        let this_role = match name.as_str() {
            "command" => Some(Role::Command),
            "parser" => Some(Role::Parser),
            "suggestions" => Some(Role::Suggestions),
            _ => None,
        };
        if let Some(this_role) = this_role {
            if role.is_some() {
                return Err(Error::new(
                    attr.span(),
                    "a method can only be one of #[command], #[parser] or #[suggestions]",
                ));
            }
            role = Some(this_role);
        }

        let annotation = match name.as_str() {
            "command" => {
                let args: CommandArgs = attr.parse_args()?;
                if args.syntax.is_empty() {
                    return Err(Error::new(
                        attr.span(),
                        "#[command] requires at least one syntax string",
                    ));
                }
                let syntax = &args.syntax;
                let sender = match &args.sender {
                    Some(sender) => quote! {
                        ::core::option::Option::Some(::decree::TypeKey::of::<#sender>())
                    },
                    None => quote!(::core::option::Option::None),
                };
                quote! {
                    ::decree::annotation::CommandMethod {
                        syntax: ::std::vec![#(::std::string::String::from(#syntax)),*],
                        required_sender: #sender,
                    }
                }
            }
            "parser" => {
                let mut parser_name = String::new();
                let mut suggestions = String::new();
                string_options(attr, |key, value| match key {
                    "name" => {
                        parser_name = value.value();
                        Ok(())
                    }
                    "suggestions" => {
                        suggestions = value.value();
                        Ok(())
                    }
                    _ => Err(Error::new(value.span(), "expected `name` or `suggestions`")),
                })?;
                quote! {
                    ::decree::annotation::Parser {
                        name: ::std::string::String::from(#parser_name),
                        suggestions: ::std::string::String::from(#suggestions),
                    }
                }
            }
            "suggestions" => {
                let suggestions: LitStr = attr.parse_args()?;
                quote! {
                    ::decree::annotation::Suggestions {
                        name: ::std::string::String::from(#suggestions),
                    }
                }
            }
            "proxied_by" => {
                let ProxyArgs { alias, hidden } = attr.parse_args()?;
                let hidden = hidden.then(|| quote!(.hidden()));
                quote!(::decree::annotation::ProxiedBy::new(#alias) #hidden)
            }
            _ => {
                has_description |= name == "description";
                shared_annotation(attr)?
            }
        };
        annotations.push(annotation);
    }

    if role == Some(Role::Command)
        && !has_description
        && let Some(summary) = doc_summary(&method.attrs)
    {
        annotations.push(quote! {
            ::decree::annotation::CommandDescription(::std::string::String::from(#summary))
        });
    }

    match method.sig.inputs.first() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(Error::new(
                method.sig.span(),
                "command container methods must take `&self`",
            ));
        }
    }

    let mut parameters = Vec::new();
    for input in method.sig.inputs.iter_mut().skip(1) {
        let FnArg::Typed(arg) = input else {
            continue;
        };
        let param_attrs = take_attributes(&mut arg.attrs, PARAMETER_ATTRIBUTES);
        let Pat::Ident(pat) = &*arg.pat else {
            return Err(Error::new(
                arg.pat.span(),
                "command container method parameters must be plain identifiers",
            ));
        };
        parameters.push(expand_parameter(
            pat.ident.clone(),
            (*arg.ty).clone(),
            &param_attrs,
            role == Some(Role::Parser),
        )?);
    }

    let method_ident = &method.sig.ident;
    let method_name = method_ident.to_string();
    let parameter_metadata: Vec<&TokenStream2> =
        parameters.iter().map(|parameter| &parameter.metadata).collect();

    let (return_type, body) = match role {
        Some(Role::Command) => (None, Some(command_body(self_ty, method_ident, &parameters)?)),
        Some(Role::Parser) => {
            let ok_type = match &method.sig.output {
                ReturnType::Type(_, ty) => extract_result_ok_type(ty).ok(),
                ReturnType::Default => None,
            };
            let body = ok_type
                .filter(|_| parser_shape(&parameters))
                .map(|_| parser_body(self_ty, method_ident));
            (ok_type.cloned(), body)
        }
        Some(Role::Suggestions) => (None, suggestions_body(self_ty, method_ident, &parameters)),
        None => (None, None),
    };

    let returns = return_type.map(|ty| quote!(.returns(::decree::TypeKey::of::<#ty>())));
    let body = body.map(|body| quote!(.body(#body)));

    Ok(Some(quote! {
        ::decree::MethodMetadata::new(#method_name)
            #(.annotate(#annotations))*
            #(.parameter(#parameter_metadata))*
            #returns
            #body
    }))
}

/// How a command method parameter receives its value.
enum Binding {
    Context,
    /// The `&mut CommandInput` of a parser method.
    Input,
    InjectRef(Type),
    Inject(Type),
    Argument(Type),
    ArgumentRef(Type),
    OptionalArgument(Type),
    FlagPresent,
    FlagValue(Type),
    FlagGroup(Type),
}

struct Parameter {
    ident: syn::Ident,
    ty: Type,
    binding: Binding,
    metadata: TokenStream2,
}

fn expand_parameter(
    ident: syn::Ident,
    ty: Type,
    attrs: &[Attribute],
    parser: bool,
) -> Result<Parameter> {
    let name = ident.to_string();
    let mut annotations = Vec::new();
    let mut binding = None;

    for attr in attrs {
        match attribute_name(attr).as_str() {
            "argument" => {
                let mut named = None;
                let mut options = TokenStream2::new();
                string_options(attr, |key, value| {
                    match key {
                        "name" => named = Some(value),
                        "parser" => options.extend(quote!(.parser(#value))),
                        "suggestions" => options.extend(quote!(.suggestions(#value))),
                        "default" => options.extend(quote!(.default_value(#value))),
                        "description" => options.extend(quote!(.description(#value))),
                        _ => {
                            return Err(Error::new(
                                value.span(),
                                "expected `name`, `parser`, `suggestions`, `default` or `description`",
                            ));
                        }
                    }
                    Ok(())
                })?;
                let argument = match named {
                    Some(named) => quote!(::decree::annotation::Argument::named(#named)),
                    None => quote!(::decree::annotation::Argument::inferred()),
                };
                annotations.push(quote!(#argument #options));
                binding = Some(argument_binding(&ty)?);
            }
            "flag" => {
                let mut flag_name = LitStr::new(&name, ident.span());
                let mut options = TokenStream2::new();
                string_options(attr, |key, value| {
                    match key {
                        "name" => flag_name = value,
                        "alias" => options.extend(quote!(.alias(#value))),
                        "permission" => options.extend(quote!(.permission(#value))),
                        "description" => options.extend(quote!(.description(#value))),
                        "parser" => options.extend(quote!(.parser(#value))),
                        "suggestions" => options.extend(quote!(.suggestions(#value))),
                        _ => {
                            return Err(Error::new(
                                value.span(),
                                "expected `name`, `alias`, `permission`, `description`, `parser` or `suggestions`",
                            ));
                        }
                    }
                    Ok(())
                })?;
                annotations.push(quote!(::decree::annotation::Flag::new(#flag_name) #options));
                binding = Some(flag_binding(&ty)?);
            }
            "flags" => {
                attr.meta.require_path_only()?;
                annotations.push(quote! {
                    ::decree::annotation::FlagGroup {
                        members: <#ty as ::decree::FlagSet>::flags(),
                    }
                });
                binding = Some(Binding::FlagGroup(ty.clone()));
            }
            "regex" => {
                let RegexArgs { pattern, message } = attr.parse_args()?;
                let message = message.map(|message| quote!(.failure_message(#message)));
                annotations.push(quote!(::decree::annotation::Regex::new(#pattern) #message));
            }
            _ => {
                let annotation: Expr = attr.parse_args()?;
                annotations.push(quote!(#annotation));
            }
        }
    }

    let binding = match binding {
        Some(binding) => binding,
        None if parser && is_mut_reference(&ty) => Binding::Input,
        None => injected_binding(&ty)?,
    };

    let key_type = match &binding {
        Binding::Context | Binding::Input => strip_reference(&ty).clone(),
        Binding::FlagPresent => syn::parse_quote!(bool),
        Binding::InjectRef(inner)
        | Binding::Inject(inner)
        | Binding::Argument(inner)
        | Binding::ArgumentRef(inner)
        | Binding::OptionalArgument(inner)
        | Binding::FlagValue(inner)
        | Binding::FlagGroup(inner) => inner.clone(),
    };

    let metadata = quote! {
        ::decree::ParameterMetadata::new(#name, ::decree::TypeKey::of::<#key_type>())
            #(.annotate(#annotations))*
    };

    Ok(Parameter {
        ident,
        ty,
        binding,
        metadata,
    })
}

fn argument_binding(ty: &Type) -> Result<Binding> {
    if let Type::Reference(reference) = ty {
        if reference.mutability.is_some() {
            return Err(Error::new(ty.span(), "arguments cannot be received by `&mut`"));
        }
        return Ok(Binding::ArgumentRef((*reference.elem).clone()));
    }
    Ok(match option_inner(ty) {
        Some(inner) => Binding::OptionalArgument(inner.clone()),
        None => Binding::Argument(ty.clone()),
    })
}

fn flag_binding(ty: &Type) -> Result<Binding> {
    if last_segment_is(ty, "bool") {
        return Ok(Binding::FlagPresent);
    }
    option_inner(ty)
        .map(|inner| Binding::FlagValue(inner.clone()))
        .ok_or_else(|| Error::new(ty.span(), "flag parameters must be `bool` or `Option<T>`"))
}

fn injected_binding(ty: &Type) -> Result<Binding> {
    match ty {
        Type::Reference(reference) if reference.mutability.is_some() => Err(Error::new(
            ty.span(),
            "`&mut` parameters are only supported on #[parser] methods",
        )),
        Type::Reference(reference) if last_segment_is(&reference.elem, "CommandContext") => {
            Ok(Binding::Context)
        }
        Type::Reference(reference) => Ok(Binding::InjectRef((*reference.elem).clone())),
        _ => Ok(Binding::Inject(ty.clone())),
    }
}

/// The invoker of a `#[command]` method.
fn command_body(
    self_ty: &Type,
    method: &syn::Ident,
    parameters: &[Parameter],
) -> Result<TokenStream2> {
    let mut bindings = Vec::new();
    let mut arguments = Vec::new();
    for (index, parameter) in parameters.iter().enumerate() {
        let local = format_ident!("decree_arg{}", index);
        let name = parameter.ident.to_string();
        let value = match &parameter.binding {
            Binding::Context => quote!(invocation.context()),
            Binding::Input => {
                return Err(Error::new(
                    parameter.ty.span(),
                    "`&mut CommandInput` is only available to #[parser] methods",
                ));
            }
            Binding::InjectRef(ty) => quote!(invocation.inject_ref::<#ty>()?),
            Binding::Inject(ty) => quote!(invocation.inject::<#ty>()?),
            Binding::Argument(ty) => quote!(invocation.argument::<#ty>(#name)?),
            Binding::ArgumentRef(ty) => quote!(invocation.argument_ref::<#ty>(#name)?),
            Binding::OptionalArgument(ty) => quote!(invocation.optional_argument::<#ty>(#name)?),
            Binding::FlagPresent => quote!(invocation.flag_present(#name)),
            Binding::FlagValue(ty) => quote!(invocation.flag_value::<#ty>(#name)?),
            Binding::FlagGroup(ty) => quote!(invocation.flag_group::<#ty>(#name)?),
        };
        bindings.push(quote!(let #local = #value;));
        arguments.push(local);
    }

    let type_name = quote!(#self_ty).to_string();
    Ok(quote! {
        ::decree::MethodBody::Command(::std::sync::Arc::new(
            |container: &dyn ::core::any::Any,
             invocation: &::decree::Invocation<'_>|
             -> ::core::result::Result<(), ::decree::ExecutionError> {
                let container = container
                    .downcast_ref::<#self_ty>()
                    .ok_or(::decree::ExecutionError::ContainerMismatch(#type_name))?;
                #(#bindings)*
                ::decree::__private::IntoCommandResult::into_command_result(
                    container.#method(#(#arguments),*)
                )
            }
        ))
    })
}

/// Whether a `#[parser]` method has the `(&CommandContext, &mut CommandInput)` shape.
fn parser_shape(parameters: &[Parameter]) -> bool {
    match parameters {
        [context, input] => {
            matches!(context.binding, Binding::Context)
                && matches!(input.binding, Binding::Input)
                && last_segment_is(strip_reference(&input.ty), "CommandInput")
        }
        _ => false,
    }
}

/// The invoker of a `#[parser]` method.
fn parser_body(self_ty: &Type, method: &syn::Ident) -> TokenStream2 {
    let type_name = quote!(#self_ty).to_string();
    quote! {
        ::decree::MethodBody::Parser(::std::sync::Arc::new(
            |container: &dyn ::core::any::Any,
             context: &::decree::CommandContext,
             input: &mut ::decree::CommandInput|
             -> ::core::result::Result<::decree::ArgumentValue, ::decree::ArgumentParseError> {
                let container = container.downcast_ref::<#self_ty>().ok_or_else(|| {
                    ::decree::ArgumentParseError::custom(::core::concat!(
                        "parser received a container that is not a ",
                        #type_name
                    ))
                })?;
                ::decree::__private::IntoParseResult::into_parse_result(
                    container.#method(context, input)
                )
            }
        ))
    }
}

/// The invoker of a `#[suggestions]` method, when it has the
/// `(&CommandContext, &str | String)` shape.
fn suggestions_body(
    self_ty: &Type,
    method: &syn::Ident,
    parameters: &[Parameter],
) -> Option<TokenStream2> {
    let [context, input] = parameters else {
        return None;
    };
    if !matches!(context.binding, Binding::Context) {
        return None;
    }
    let input = match &input.ty {
        Type::Reference(reference)
            if reference.mutability.is_none() && last_segment_is(&reference.elem, "str") =>
        {
            quote!(input)
        }
        ty if last_segment_is(ty, "String") => quote!(::std::string::String::from(input)),
        _ => return None,
    };

    let type_name = quote!(#self_ty).to_string();
    let method_name = method.to_string();
    Some(quote! {
        ::decree::MethodBody::Suggestions(::std::sync::Arc::new(
            |container: &dyn ::core::any::Any,
             context: &::decree::CommandContext,
             input: &str|
             -> ::std::vec::Vec<::decree::Suggestion> {
                match container.downcast_ref::<#self_ty>() {
                    ::core::option::Option::Some(container) => {
                        ::decree::__private::IntoSuggestions::into_suggestions(
                            container.#method(context, #input)
                        )
                    }
                    ::core::option::Option::None => {
                        ::decree::warn!(
                            container = #type_name,
                            method = #method_name,
                            "Suggestion provider received a container of another type"
                        );
                        ::std::vec::Vec::new()
                    }
                }
            }
        ))
    })
}

fn is_mut_reference(ty: &Type) -> bool {
    matches!(ty, Type::Reference(reference) if reference.mutability.is_some())
}

fn strip_reference(ty: &Type) -> &Type {
    match ty {
        Type::Reference(reference) => &reference.elem,
        _ => ty,
    }
}

fn last_segment_is(ty: &Type, ident: &str) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == ident),
        _ => false,
    }
}

/// The `T` of an `Option<T>` type.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

/// Extracts the `T` from a `Result<T, E>` type.
///
/// # Errors
///
/// Returns an error if the type is not a `Result` with type arguments.
fn extract_result_ok_type(ty: &Type) -> Result<&Type> {
    let Type::Path(type_path) = ty else {
        return Err(Error::new(ty.span(), "expected Result<T, E> return type"));
    };
    let segment = type_path
        .path
        .segments
        .last()
        .ok_or_else(|| Error::new(ty.span(), "expected Result<T, E> return type"))?;
    if segment.ident != "Result" {
        return Err(Error::new(ty.span(), "expected Result<T, E> return type"));
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(t)) => Ok(t),
            _ => Err(Error::new(ty.span(), "expected type argument")),
        },
        _ => Err(Error::new(
            ty.span(),
            "expected Result<T, E> with type arguments",
        )),
    }
}

#[cfg(test)]
mod tests {
    use quote::quote;

    use super::*;

    /// Removes all whitespace for easier content comparison in tests.
    fn strip_whitespace(input: &str) -> String {
        input.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn parse_item_impl(tokens: TokenStream2) -> ItemImpl {
        syn::parse2(tokens).expect("failed to parse ItemImpl")
    }

    fn expand(tokens: TokenStream2) -> Result<String> {
        expand_container(&ContainerOptions::default(), parse_item_impl(tokens))
            .map(|expanded| strip_whitespace(&expanded.to_string()))
    }

    #[test]
    fn test_expand_container_rejects_generic_impl() {
        // Arrange
        let item = parse_item_impl(quote!(
            impl<T> Moderation<T> {}
        ));

        // Act
        let err = expand_container(&ContainerOptions::default(), item)
            .expect_err("expected generic error");

        // Assert
        assert_eq!(err.to_string(), "command containers cannot be generic");
    }

    #[test]
    fn test_expand_container_rejects_trait_impl() {
        let item = parse_item_impl(quote!(
            impl Default for Moderation {}
        ));

        let err = expand_container(&ContainerOptions::default(), item)
            .expect_err("expected trait impl error");

        assert_eq!(
            err.to_string(),
            "#[command_container] must be placed on an inherent impl block"
        );
    }

    #[test]
    fn test_expand_command_method_builds_metadata_and_invoker() {
        // Arrange
        let tokens = quote!(
            #[permission("mod")]
            impl Moderation {
                /// Bans a player.
                ///
                /// Second paragraph.
                #[command("ban <target> [reason]", sender = Admin)]
                #[proxied_by("b", hidden)]
                fn ban(
                    &self,
                    sender: &Admin,
                    #[argument] target: String,
                    #[argument(name = "reason", default = "none")] why: Option<String>,
                    #[flag(alias = "s")] silent: bool,
                ) {}
            }
        );

        // Act
        let expanded = expand(tokens).expect("expected expansion to succeed");

        // Assert
        assert!(expanded.contains("impl::decree::CommandContainerforModeration"));
        assert!(expanded.contains(
            "ContainerMetadata::new(::core::concat!(::core::module_path!(),\"::\",\"Moderation\"))"
        ));
        assert!(expanded.contains("Permission(::std::string::String::from(\"mod\"))"));
        assert!(expanded.contains("syntax:::std::vec![::std::string::String::from(\"ban<target>[reason]\")]"));
        assert!(expanded.contains("required_sender:::core::option::Option::Some(::decree::TypeKey::of::<Admin>())"));
        assert!(expanded.contains("ProxiedBy::new(\"b\").hidden()"));
        assert!(expanded.contains("CommandDescription(::std::string::String::from(\"Bansaplayer.\"))"));
        assert!(expanded.contains("Argument::named(\"reason\").default_value(\"none\")"));
        assert!(expanded.contains("ParameterMetadata::new(\"why\",::decree::TypeKey::of::<String>())"));
        assert!(expanded.contains("Flag::new(\"silent\").alias(\"s\")"));
        assert!(expanded.contains("invocation.inject_ref::<Admin>()?"));
        assert!(expanded.contains("invocation.optional_argument::<String>(\"why\")?"));
        assert!(expanded.contains("invocation.flag_present(\"silent\")"));
        assert!(expanded.contains("container.ban(decree_arg0,decree_arg1,decree_arg2,decree_arg3)"));
        assert!(expanded.contains("ContainerEntry{name:"));
        assert!(expanded.contains("__sealed:::decree::__private::sealed()"));
    }

    #[test]
    fn test_expand_strips_decree_attributes_from_the_impl() {
        let tokens = quote!(
            #[hidden]
            impl Moderation {
                #[command("mute <target>")]
                #[inline]
                fn mute(&self, #[argument] #[regex("^[a-z]+$")] target: String) {}
            }
        );

        let expanded = expand(tokens).expect("expected expansion to succeed");

        let item_end = expanded
            .find("impl::decree::CommandContainer")
            .expect("container impl");
        let item = &expanded[..item_end];
        assert!(item.contains("#[inline]"));
        assert!(!item.contains("#[command"));
        assert!(!item.contains("#[argument]"));
        assert!(!item.contains("#[regex"));
        assert!(!item.contains("#[hidden]"));
        assert!(expanded.contains("Regex::new(\"^[a-z]+$\")"));
    }

    #[test]
    fn test_expand_parser_method_registers_return_type_and_invoker() {
        let tokens = quote!(
            impl Travel {
                #[parser(suggestions = "warps")]
                fn warp(&self, ctx: &CommandContext, input: &mut CommandInput) -> Result<Warp, ArgumentParseError> {}
            }
        );

        let expanded = expand(tokens).expect("expected expansion to succeed");

        assert!(expanded.contains(
            "Parser{name:::std::string::String::from(\"\"),suggestions:::std::string::String::from(\"warps\"),}"
        ));
        assert!(expanded.contains(".returns(::decree::TypeKey::of::<Warp>())"));
        assert!(expanded.contains("ParameterMetadata::new(\"input\",::decree::TypeKey::of::<CommandInput>())"));
        assert!(expanded.contains("::decree::MethodBody::Parser"));
        assert!(expanded.contains("IntoParseResult::into_parse_result(container.warp(context,input))"));
    }

    #[test]
    fn test_expand_suggestions_method_with_wrong_shape_is_unbound() {
        let tokens = quote!(
            impl Travel {
                #[suggestions("warps")]
                fn warps(&self, ctx: &CommandContext, input: &str, limit: usize) -> Vec<Suggestion> {}
            }
        );

        let expanded = expand(tokens).expect("expected expansion to succeed");

        assert!(expanded.contains("Suggestions{name:::std::string::String::from(\"warps\"),}"));
        assert!(expanded.contains("ParameterMetadata::new(\"limit\",::decree::TypeKey::of::<usize>())"));
        assert!(!expanded.contains("MethodBody::Suggestions"));
    }

    #[test]
    fn test_expand_suggestions_method_converts_string_input() {
        let tokens = quote!(
            impl Travel {
                #[suggestions("warps")]
                fn warps(&self, ctx: &CommandContext, input: String) -> Vec<String> {}
            }
        );

        let expanded = expand(tokens).expect("expected expansion to succeed");

        assert!(expanded.contains("container.warps(context,::std::string::String::from(input))"));
    }

    #[test]
    fn test_expand_suggestions_method_warns_on_foreign_container() {
        let tokens = quote!(
            impl Travel {
                #[suggestions("warps")]
                fn warps(&self, ctx: &CommandContext, input: &str) -> Vec<Suggestion> {}
            }
        );

        let expanded = expand(tokens).expect("expected expansion to succeed");

        assert!(expanded.contains(
            "::decree::warn!(container=\"Travel\",method=\"warps\",\"Suggestionproviderreceivedacontainerofanothertype\")"
        ));
        assert!(!expanded.contains("unwrap_or_default"));
    }

    #[test]
    fn test_expand_rejects_mut_input_on_command_methods() {
        let tokens = quote!(
            impl Travel {
                #[command("warp <target>")]
                fn warp(&self, input: &mut CommandInput, #[argument] target: String) {}
            }
        );

        let err = expand(tokens).expect_err("expected &mut error");

        assert_eq!(
            err.to_string(),
            "`&mut` parameters are only supported on #[parser] methods"
        );
    }

    #[test]
    fn test_expand_rejects_conflicting_roles() {
        let tokens = quote!(
            impl Travel {
                #[command("warp")]
                #[suggestions("warps")]
                fn warp(&self) {}
            }
        );

        let err = expand(tokens).expect_err("expected role error");

        assert_eq!(
            err.to_string(),
            "a method can only be one of #[command], #[parser] or #[suggestions]"
        );
    }

    #[test]
    fn test_expand_requires_shared_self_receiver() {
        let tokens = quote!(
            impl Travel {
                #[command("warp")]
                fn warp(&mut self) {}
            }
        );

        let err = expand(tokens).expect_err("expected receiver error");

        assert_eq!(err.to_string(), "command container methods must take `&self`");
    }

    #[test]
    fn test_expand_rejects_non_optional_valued_flag() {
        let tokens = quote!(
            impl Travel {
                #[command("warp")]
                fn warp(&self, #[flag] radius: u32) {}
            }
        );

        let err = expand(tokens).expect_err("expected flag type error");

        assert_eq!(err.to_string(), "flag parameters must be `bool` or `Option<T>`");
    }

    #[test]
    fn test_expand_rejects_parameter_attributes_on_plain_methods() {
        let tokens = quote!(
            impl Travel {
                fn helper(&self, #[argument] target: String) {}
            }
        );

        let err = expand(tokens).expect_err("expected missing command error");

        assert_eq!(
            err.to_string(),
            "parameter attributes require the method to be annotated with #[command]"
        );
    }

    #[test]
    fn test_expand_detects_constructors() {
        let tokens = quote!(
            impl Travel {
                pub fn new(compiler: &AnnotationCompiler) -> Self {}
            }
        );

        let expanded = expand(tokens).expect("expected expansion to succeed");

        assert!(expanded.contains("with_compiler:::core::option::Option::Some("));
        assert!(expanded.contains("<Travel>::new(compiler)"));
        assert!(expanded.contains("no_args:::core::option::Option::None"));
    }

    #[test]
    fn test_expand_default_option_and_name_override() {
        let options = ContainerOptions {
            name: Some(LitStr::new("travel", proc_macro2::Span::call_site())),
            default: true,
        };
        let item = parse_item_impl(quote!(
            impl Travel {}
        ));

        let expanded = expand_container(&options, item).expect("expected expansion to succeed");
        let expanded = strip_whitespace(&expanded.to_string());

        assert!(expanded.contains("ContainerMetadata::new(\"travel\")"));
        assert!(expanded.contains("<Travelas::core::default::Default>::default()"));
    }

    #[test]
    fn test_flag_group_parameter_uses_flag_set() {
        let tokens = quote!(
            impl Travel {
                #[command("warp")]
                fn warp(&self, #[flags] options: WarpOptions) {}
            }
        );

        let expanded = expand(tokens).expect("expected expansion to succeed");

        assert!(expanded.contains("members:<WarpOptionsas::decree::FlagSet>::flags()"));
        assert!(expanded.contains("invocation.flag_group::<WarpOptions>(\"options\")?"));
    }

    #[test]
    fn test_doc_summary_takes_first_paragraph() {
        let item: ImplItemFn = syn::parse2(quote!(
            /// Teleports a player
            /// to a target.
            ///
            /// Details.
            fn teleport(&self) {}
        ))
        .expect("failed to parse method");

        assert_eq!(
            doc_summary(&item.attrs).as_deref(),
            Some("Teleports a player to a target.")
        );
    }
}
