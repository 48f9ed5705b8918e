use proc_macro2::TokenStream;
use quote::quote;
use syn::{Ident, Type};

/// `impl<DB> BindValues<DB>` binding `fields` by position, generic over every
/// backend that can encode all field types.
pub fn bind_values_impl(
    krate: &TokenStream,
    name: &Ident,
    fields: &[(&Ident, &Type)],
) -> TokenStream {
    let bounds = fields.iter().map(|(_, ty)| {
        quote! {
            #ty: for<'__q> #krate::sqlx::Encode<'__q, __DB>
                + #krate::sqlx::Type<__DB>
                + ::core::clone::Clone
                + 'static
        }
    });
    let arms = fields.iter().enumerate().map(|(i, (ident, _))| {
        quote! {
            #i => {
                query.push_bind(::core::clone::Clone::clone(&self.#ident));
            }
        }
    });

    quote! {
        impl<__DB> #krate::BindValues<__DB> for #name
        where
            __DB: #krate::sqlx::Database,
            #(#bounds,)*
        {
            fn push_bind_at<'__args>(
                &self,
                index: usize,
                query: &mut #krate::Statement<'__args, __DB>,
            ) {
                match index {
                    #(#arms)*
                    _ => {}
                }
            }
        }
    }
}
