//! # crudx-data — abstractions for the crudx CRUD layer
//!
//! Backend-agnostic pieces shared by the `sqlx` client and the derive macros:
//!
//! | Item | Description |
//! |------|-------------|
//! | [`ZeroValue`] | Zero-value predicate gating every key lookup |
//! | [`Entity`] | Table, column and key metadata for a record type |
//! | [`BindValues`] | Binds column values into a [`Statement`] |
//! | [`Statement`] | Owned SQL text plus bound arguments, ready for `sqlx::query_as_with` |
//! | [`Crud`] | Async find/save operations over an entity |
//! | [`SqlBuilder`] | Generates the SELECT / upsert statements per dialect |
//! | [`CrudError`] | Error type; not-found is not an error |

pub mod crud;
pub mod entity;
pub mod error;
pub mod query;
pub mod statement;
pub mod zero;

pub use crud::Crud;
pub use entity::{BindValues, Entity};
pub use error::{CrudError, CrudResult};
pub use query::{CompositeKeyStrategy, Dialect, IdentifierPolicy, SqlBuilder};
pub use statement::Statement;
pub use zero::{contains_zero_values, not_contain_zero_values, ZeroValue};

// Generated code reaches sqlx through this path.
pub use sqlx;

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{BindValues, Crud, CrudError, Entity, ZeroValue};
}
