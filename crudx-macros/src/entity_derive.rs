use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type};

use crate::bind_codegen::bind_values_impl;
use crate::crate_path::crudx_data_path;

// ── Parsed types ─────────────────────────────────────────────────────────

struct EntityAttr {
    table: String,
    key: Option<syn::Path>,
}

struct ColumnField {
    ident: Ident,
    ty: Type,
    column: String,
    id: Option<IdAttr>,
}

#[derive(Default)]
struct IdAttr {
    generated: bool,
}

#[derive(Default)]
struct SqlxAttr {
    rename: Option<String>,
    skip: bool,
}

// ── Entry point ──────────────────────────────────────────────────────────

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let krate = crudx_data_path();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Entity can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Entity can only be derived for structs",
            ))
        }
    };

    let entity_attr = parse_entity_attr(input)?;

    let mut columns = Vec::new();
    for field in named {
        let ident = field.ident.clone().unwrap();
        let sqlx_attr = parse_sqlx_attr(&field.attrs)?;
        let id = parse_id_attr(&field.attrs)?;

        if sqlx_attr.skip {
            if id.is_some() {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "#[id] cannot be combined with #[sqlx(skip)]",
                ));
            }
            continue;
        }

        let column = sqlx_attr.rename.unwrap_or_else(|| ident.to_string());
        columns.push(ColumnField {
            ident,
            ty: field.ty.clone(),
            column,
            id,
        });
    }

    let keys: Vec<&ColumnField> = columns.iter().filter(|c| c.id.is_some()).collect();
    if keys.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "#[derive(Entity)] requires at least one #[id] field",
        ));
    }
    let generated: Vec<&&ColumnField> = keys
        .iter()
        .filter(|c| c.id.as_ref().is_some_and(|id| id.generated))
        .collect();
    if !generated.is_empty() && keys.len() > 1 {
        return Err(syn::Error::new_spanned(
            &generated[0].ident,
            "#[id(generated)] is only supported on a single-column key",
        ));
    }
    let generated = !generated.is_empty();

    let table = &entity_attr.table;
    let column_names = columns.iter().map(|c| &c.column);
    let key_names = keys.iter().map(|c| &c.column);

    let (id_ty, id_expr) = id_type_and_expr(&entity_attr, &keys);

    let bind_fields: Vec<(&Ident, &Type)> = columns.iter().map(|c| (&c.ident, &c.ty)).collect();
    let bind_impl = bind_values_impl(&krate, name, &bind_fields);

    Ok(quote! {
        impl #krate::Entity for #name {
            type Id = #id_ty;

            fn table_name() -> &'static str {
                #table
            }

            fn id_columns() -> &'static [&'static str] {
                &[#(#key_names),*]
            }

            fn columns() -> &'static [&'static str] {
                &[#(#column_names),*]
            }

            fn id(&self) -> Self::Id {
                #id_expr
            }

            fn generated_id() -> bool {
                #generated
            }
        }

        #bind_impl
    })
}

/// `Id` is the key struct when `key = ...` is given, the field type for a
/// single key, or a tuple of key field types.
fn id_type_and_expr(attr: &EntityAttr, keys: &[&ColumnField]) -> (TokenStream2, TokenStream2) {
    let idents: Vec<&Ident> = keys.iter().map(|c| &c.ident).collect();

    if let Some(path) = &attr.key {
        let expr = quote! {
            #path { #( #idents: ::core::clone::Clone::clone(&self.#idents) ),* }
        };
        return (quote!(#path), expr);
    }

    if keys.len() == 1 {
        let ty = &keys[0].ty;
        let ident = idents[0];
        return (quote!(#ty), quote!(::core::clone::Clone::clone(&self.#ident)));
    }

    let tys = keys.iter().map(|c| &c.ty);
    (
        quote!(( #(#tys,)* )),
        quote!(( #( ::core::clone::Clone::clone(&self.#idents), )* )),
    )
}

// ── Parsing ──────────────────────────────────────────────────────────────

fn parse_entity_attr(input: &DeriveInput) -> syn::Result<EntityAttr> {
    let mut table = None;
    let mut key = None;
    for attr in &input.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let lit: LitStr = meta.value()?.parse()?;
                    table = Some(lit.value());
                    Ok(())
                } else if meta.path.is_ident("key") {
                    key = Some(meta.value()?.parse::<syn::Path>()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `table` or `key` in #[entity(...)]"))
                }
            })?;
        }
    }
    match table {
        Some(table) => Ok(EntityAttr { table, key }),
        None => Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(Entity)] requires #[entity(table = \"...\")]\n\
             \n  example:\n  #[derive(Entity, sqlx::FromRow)]\n  #[entity(table = \"users\")]\n  pub struct User { #[id] id: i64, ... }",
        )),
    }
}

/// `#[id]` or `#[id(generated)]`.
fn parse_id_attr(attrs: &[Attribute]) -> syn::Result<Option<IdAttr>> {
    let mut result = None;
    for attr in attrs {
        if !attr.path().is_ident("id") {
            continue;
        }
        let mut id = IdAttr::default();
        if matches!(attr.meta, syn::Meta::List(_)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("generated") {
                    id.generated = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `generated` in #[id(...)]"))
                }
            })?;
        }
        result = Some(id);
    }
    Ok(result)
}

/// Reads the `#[sqlx(...)]` keys that change the column list, so the
/// generated columns agree with `sqlx::FromRow`.
fn parse_sqlx_attr(attrs: &[Attribute]) -> syn::Result<SqlxAttr> {
    let mut result = SqlxAttr::default();
    for attr in attrs {
        if !attr.path().is_ident("sqlx") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                result.rename = Some(lit.value());
            } else if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("flatten") {
                return Err(meta.error("#[sqlx(flatten)] fields are not supported by Entity"));
            } else if meta.input.peek(syn::Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(result)
}
