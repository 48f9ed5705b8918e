use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, Type};

use crate::bind_codegen::bind_values_impl;
use crate::crate_path::crudx_data_path;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Key cannot be derived for generic structs",
        ));
    }

    let fields: Vec<(&Ident, &Type)> = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) if !f.named.is_empty() => f
                .named
                .iter()
                .map(|f| (f.ident.as_ref().unwrap(), &f.ty))
                .collect(),
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Key can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Key can only be derived for structs",
            ))
        }
    };

    Ok(bind_values_impl(&crudx_data_path(), name, &fields))
}
