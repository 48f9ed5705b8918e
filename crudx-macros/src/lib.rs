extern crate proc_macro;
use proc_macro::TokenStream;

pub(crate) mod bind_codegen;
pub(crate) mod crate_path;
pub(crate) mod entity_derive;
pub(crate) mod key_derive;
pub(crate) mod zero_value_derive;

/// Derive macro for the zero-value predicate.
///
/// Generates an explicit per-field `ZeroValue` implementation:
///
/// - `is_zero`: every field is zero.
/// - `contains_zero`: any field is zero. This is the check that gates key
///   lookups.
///
/// Each field answers with its own `is_zero`, so the inspection goes one
/// level deep: an `Option` field is zero only when `None`, and a nested
/// struct field is zero only when all of its fields are.
///
/// # Example
///
/// ```ignore
/// #[derive(ZeroValue)]
/// pub struct OrderLineKey {
///     pub order_id: i64,
///     pub line: i32,
/// }
/// ```
#[proc_macro_derive(ZeroValue)]
pub fn derive_zero_value(input: TokenStream) -> TokenStream {
    zero_value_derive::expand(input)
}

/// Derive macro implementing `Entity` and `BindValues<DB>` for a record struct.
///
/// # Struct-level attribute
///
/// `#[entity(...)]`:
///
/// | Parameter | Required | Description |
/// |-----------|----------|-------------|
/// | `table`   | **yes**  | Table name |
/// | `key`     | no       | Struct used as the composite `Id`; its fields must be named like the `#[id]` fields |
///
/// # Field attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[id]` | Part of the primary key. Key columns bind in field order. |
/// | `#[id(generated)]` | Single-column key assigned by the database; zero keys are left out of the INSERT. |
/// | `#[sqlx(rename = "...")]` | Column name, shared with `sqlx::FromRow`. |
/// | `#[sqlx(skip)]` | Not a column. |
///
/// Without `key`, `Id` is the key field's type, or a tuple of the key field
/// types when there are several.
///
/// # Example
///
/// ```ignore
/// #[derive(Entity, sqlx::FromRow)]
/// #[entity(table = "users")]
/// pub struct User {
///     #[id(generated)]
///     pub id: i64,
///     #[sqlx(rename = "display_name")]
///     pub name: String,
///     pub email: Option<String>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity, id))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity_derive::expand(input)
}

/// Derive macro implementing `BindValues<DB>` for a composite key struct.
///
/// Fields bind in declaration order, which must match the order of the
/// entity's `#[id]` fields. Usually paired with `#[derive(ZeroValue)]`.
///
/// ```ignore
/// #[derive(Clone, ZeroValue, Key)]
/// pub struct OrderLineKey {
///     pub order_id: i64,
///     pub line: i32,
/// }
///
/// #[derive(Entity, sqlx::FromRow)]
/// #[entity(table = "order_lines", key = OrderLineKey)]
/// pub struct OrderLine {
///     #[id] pub order_id: i64,
///     #[id] pub line: i32,
///     pub sku: String,
/// }
/// ```
#[proc_macro_derive(Key)]
pub fn derive_key(input: TokenStream) -> TokenStream {
    key_derive::expand(input)
}
