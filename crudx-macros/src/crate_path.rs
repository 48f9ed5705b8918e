//! Crate path resolution for generated code.
//!
//! Detects whether the user depends on `crudx` (facade) or `crudx-data`
//! directly, and returns the appropriate path prefix for generated code.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

/// Returns the token stream for accessing `crudx_data` items.
///
/// If the user depends on `crudx`, returns `::crudx`.
/// Otherwise returns `::crudx_data`.
///
/// `FoundCrate::Itself` also resolves to the absolute path: the derives are
/// only expanded in that package's integration tests, which link it as an
/// external crate.
pub fn crudx_data_path() -> TokenStream {
    if let Ok(found) = crate_name("crudx") {
        absolute(found, "crudx")
    } else if let Ok(found) = crate_name("crudx-data") {
        absolute(found, "crudx_data")
    } else {
        // Fallback - assume crudx_data is available (for error messages)
        quote!(::crudx_data)
    }
}

fn absolute(found: FoundCrate, own_name: &str) -> TokenStream {
    let name = match found {
        FoundCrate::Itself => own_name.to_string(),
        FoundCrate::Name(name) => name,
    };
    let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
    quote!(::#ident)
}
