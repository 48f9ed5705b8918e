use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Index};

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
    let krate = crudx_data_path();

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "ZeroValue can only be derived for structs",
            ))
        }
    };

    let (accessors, types): (Vec<TokenStream2>, Vec<&syn::Type>) = match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .map(|f| {
                let ident = f.ident.as_ref().unwrap();
                (quote!(self.#ident), &f.ty)
            })
            .unzip(),
        Fields::Unnamed(unnamed) => unnamed
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let index = Index::from(i);
                (quote!(self.#index), &f.ty)
            })
            .unzip(),
        Fields::Unit => (Vec::new(), Vec::new()),
    };

    let mut generics = input.generics.clone();
    {
        let where_clause = generics.make_where_clause();
        for ty in &types {
            where_clause
                .predicates
                .push(syn::parse_quote!(#ty: #krate::ZeroValue));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // One level only: each field answers with its own `is_zero`.
    Ok(quote! {
        impl #impl_generics #krate::ZeroValue for #name #ty_generics #where_clause {
            fn is_zero(&self) -> bool {
                true #( && #krate::ZeroValue::is_zero(&#accessors) )*
            }

            fn contains_zero(&self) -> bool {
                false #( || #krate::ZeroValue::is_zero(&#accessors) )*
            }
        }
    })
}
