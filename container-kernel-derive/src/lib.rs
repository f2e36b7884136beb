//! Derive macro for container-kernel.
//!
//! - `#[derive(Injectable)]` — generate a [`Describable`](container_kernel::Describable)
//!   implementation for a plain struct, so a hand-written `service_prototype`/
//!   `construct`/`inject_properties` triple is rarely needed.
//!
//! # Attributes
//!
//! Per field, `#[injectable(...)]` controls how the field is populated:
//!
//! - no attribute — the field is left to `Default::default()`, not touched
//!   by resolution at all.
//! - `#[injectable]` — a required constructor dependency. The field must be
//!   `Arc<T>` (resolved by reference, `T` registered under an id equal to
//!   its short type name) or a plain `Clone` value (resolved from a literal
//!   default/override — there is nothing else that could produce a plain
//!   value here, so `#[injectable(default = "...")]` is normally paired with
//!   it).
//! - `#[injectable(id = "...")]` — resolve against an explicit service id
//!   instead of the field's short type name.
//! - `#[injectable(optional)]` — the dependency may be absent; the field
//!   type must be `Option<Arc<T>>`.
//! - `#[injectable(default = "<expr>")]` — fall back to `<expr>` (parsed as
//!   a Rust expression) when nothing else resolves the parameter.
//! - `#[injectable(property)]` — inject after construction instead of
//!   through the constructor (`Describable::inject_properties`), for fields
//!   that form a cycle with a constructor-injected dependency elsewhere.
//! - `#[injectable(skip)]` — explicitly the same as no attribute; spelled
//!   out for readers scanning a struct with otherwise-uniform
//!   `#[injectable]` fields.
//!
//! # Example
//!
//! ```rust,ignore
//! use container_kernel::Container;
//! use container_kernel_derive::Injectable;
//! use std::sync::Arc;
//!
//! struct Config;
//! struct Database;
//!
//! #[derive(Injectable)]
//! struct UserService {
//!     #[injectable]
//!     db: Arc<Database>,
//!     #[injectable(optional)]
//!     config: Option<Arc<Config>>,
//!     #[injectable(property)]
//!     logger: Arc<Config>,
//!     request_count: u64,
//! }
//!
//! let container = Container::new();
//! container.register_class::<UserService>();
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Expr, Fields, Type};

#[proc_macro_derive(Injectable, attributes(injectable))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return syn::Error::new_spanned(
                    &input,
                    "Injectable can only be derived for structs with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Injectable can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut plan = Vec::with_capacity(fields.len());
    for field in fields.iter() {
        let field_name = field.ident.clone().expect("named field");
        let spec = match FieldSpec::parse(&field.attrs, field_name, field.ty.clone()) {
            Ok(spec) => spec,
            Err(err) => return err.to_compile_error().into(),
        };
        plan.push(spec);
    }

    let mut parameter_exprs = Vec::new();
    let mut constructor_field_inits = Vec::new();
    let mut property_prototype_exprs = Vec::new();
    let mut property_assignments = Vec::new();
    let mut skipped_field_inits = Vec::new();

    for field in &plan {
        match &field.role {
            Role::Skipped => {
                let field_name = &field.name;
                skipped_field_inits.push(quote! {
                    #field_name: ::std::default::Default::default()
                });
            }
            Role::Constructor { id, optional, default } => {
                let field_name = &field.name;
                let field_name_str = field_name.to_string();

                let default_arg = match default {
                    Some(expr) => quote! {
                        .with_default(::container_kernel::value::ArgumentValue::literal(#expr))
                    },
                    None => quote! {},
                };
                let nullable = if *optional {
                    quote! { .nullable() }
                } else {
                    quote! {}
                };
                parameter_exprs.push(quote! {
                    ::container_kernel::prototype::ParameterPrototype::required_named(
                        #field_name_str, #id,
                    )
                    #default_arg
                    #nullable
                });

                constructor_field_inits.push(field_init(field_name, &field.ty, *optional));
            }
            Role::Property { id, optional, default } => {
                let field_name = &field.name;
                let field_name_str = field_name.to_string();
                let is_required = !*optional && default.is_none();
                let has_default = default.is_some();
                let default_expr = match default {
                    Some(expr) => quote! {
                        Some(::container_kernel::value::ArgumentValue::literal(#expr))
                    },
                    None => quote! { None },
                };
                let explicit_abstract = quote! {
                    Some(::container_kernel::id::ServiceId::from(#id))
                };

                property_prototype_exprs.push(quote! {
                    ::container_kernel::prototype::PropertyPrototype {
                        name: #field_name_str.to_string(),
                        type_name: Some(#id.to_string()),
                        is_required: #is_required,
                        has_default: #has_default,
                        default: #default_expr,
                        explicit_abstract: #explicit_abstract,
                    }
                });

                skipped_field_inits.push(quote! {
                    #field_name: ::std::default::Default::default()
                });
                property_assignments.push(property_assignment(field_name, &field.ty, field_name_str));
            }
        }
    }

    let all_field_inits: Vec<_> = constructor_field_inits
        .into_iter()
        .chain(skipped_field_inits)
        .collect();

    let expanded = quote! {
        impl #impl_generics ::container_kernel::Describable for #name #ty_generics #where_clause {
            fn service_prototype() -> ::container_kernel::prototype::ServicePrototype {
                ::container_kernel::prototype::ServicePrototype {
                    class: ::container_kernel::id::ClassId::of::<#name #ty_generics>(),
                    constructor: Some(::container_kernel::prototype::MethodPrototype::new(
                        "new",
                        vec![#(#parameter_exprs),*],
                    )),
                    injected_properties: vec![#(#property_prototype_exprs),*],
                    injected_methods: Vec::new(),
                    is_instantiable: true,
                }
            }

            fn construct(
                mut args: ::container_kernel::value::ConstructorArgs,
            ) -> ::container_kernel::error::Result<Self> {
                Ok(Self {
                    #(#all_field_inits),*
                })
            }

            fn inject_properties(
                &mut self,
                mut args: ::container_kernel::value::PropertyArgs,
            ) -> ::container_kernel::error::Result<()> {
                #(#property_assignments)*
                Ok(())
            }
        }
    };

    TokenStream::from(expanded)
}

enum Role {
    Skipped,
    Constructor {
        id: String,
        optional: bool,
        default: Option<Expr>,
    },
    Property {
        id: String,
        optional: bool,
        default: Option<Expr>,
    },
}

struct FieldSpec {
    name: syn::Ident,
    ty: Type,
    role: Role,
}

impl FieldSpec {
    fn parse(attrs: &[syn::Attribute], name: syn::Ident, ty: Type) -> syn::Result<Self> {
        let mut injectable = false;
        let mut property = false;
        let mut optional = false;
        let mut skip = false;
        let mut id: Option<String> = None;
        let mut default: Option<Expr> = None;

        for attr in attrs {
            if !attr.path().is_ident("injectable") {
                continue;
            }
            injectable = true;

            if attr.meta.require_path_only().is_ok() {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("property") {
                    property = true;
                } else if meta.path.is_ident("optional") {
                    optional = true;
                } else if meta.path.is_ident("skip") {
                    skip = true;
                } else if meta.path.is_ident("id") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    id = Some(value.value());
                } else if meta.path.is_ident("default") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    default = Some(syn::parse_str::<Expr>(&value.value())?);
                } else {
                    return Err(meta.error("unrecognized #[injectable(...)] argument"));
                }
                Ok(())
            })?;
        }

        let role = if skip || !injectable {
            Role::Skipped
        } else {
            let resolved_id = id.unwrap_or_else(|| default_service_id(&ty));
            if property {
                Role::Property {
                    id: resolved_id,
                    optional,
                    default,
                }
            } else {
                Role::Constructor {
                    id: resolved_id,
                    optional,
                    default,
                }
            }
        };

        Ok(Self { name, ty, role })
    }
}

/// The short name of a field's declared type (the last path segment, unwrapped
/// through `Arc<_>`/`Option<_>`), used as the default service id a
/// constructor-injected or property-injected field resolves against when no
/// explicit `#[injectable(id = "...")]` is given.
fn default_service_id(ty: &Type) -> String {
    let inner = arc_inner(option_inner(ty).unwrap_or(ty)).unwrap_or(ty);
    last_segment_ident(inner)
        .map(|ident| ident.to_string())
        .unwrap_or_else(|| quote::quote!(#ty).to_string())
}

fn last_segment_ident(ty: &Type) -> Option<&syn::Ident> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last().map(|seg| &seg.ident),
        _ => None,
    }
}

fn arc_inner(ty: &Type) -> Option<&Type> {
    type_arg_of(ty, "Arc")
}

fn option_inner(ty: &Type) -> Option<&Type> {
    type_arg_of(ty, "Option")
}

fn type_arg_of<'t>(ty: &'t Type, wrapper: &str) -> Option<&'t Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == wrapper {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                    return Some(inner);
                }
            }
        }
    }
    None
}

/// Build the `Self { field: ... }` initializer for one constructor-injected
/// field, dispatching on whether it is `Arc<T>`, `Option<Arc<T>>`, or a
/// plain `Clone` value.
fn field_init(field_name: &syn::Ident, ty: &Type, optional: bool) -> proc_macro2::TokenStream {
    let field_name_str = field_name.to_string();
    if optional {
        let inner = option_inner(ty).and_then(arc_inner).unwrap_or(ty);
        quote! {
            #field_name: args.take_arc::<#inner>()
        }
    } else if let Some(inner) = arc_inner(ty) {
        let missing = format!("missing constructor argument `{field_name_str}`");
        quote! {
            #field_name: args.take_arc::<#inner>().ok_or_else(|| {
                ::container_kernel::error::ContainerError::UnresolvableParameter {
                    param: #field_name_str.to_string(),
                    owner: ::container_kernel::id::ClassId::of::<Self>(),
                    reason: #missing.to_string(),
                }
            })?
        }
    } else {
        let missing = format!("missing constructor argument `{field_name_str}`");
        quote! {
            #field_name: args.take::<#ty>().ok_or_else(|| {
                ::container_kernel::error::ContainerError::UnresolvableParameter {
                    param: #field_name_str.to_string(),
                    owner: ::container_kernel::id::ClassId::of::<Self>(),
                    reason: #missing.to_string(),
                }
            })?
        }
    }
}

/// Injectable properties are resolved through `PropertyArgs::take_arc`, so
/// only `Arc<T>`/`Option<Arc<T>>` fields can actually be populated here; a
/// plain-value `#[injectable(property)]` field is accepted at parse time but
/// has nothing to assign, so it is left at its `Default::default()` value.
fn property_assignment(
    field_name: &syn::Ident,
    ty: &Type,
    field_name_str: String,
) -> proc_macro2::TokenStream {
    let inner = arc_inner(ty).or_else(|| option_inner(ty).and_then(arc_inner));
    match inner {
        Some(inner) => quote! {
            if let Some(value) = args.take_arc::<#inner>(#field_name_str) {
                self.#field_name = value;
            }
        },
        None => quote! {},
    }
}
