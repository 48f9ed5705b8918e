//! crudx — generic find/save operations over `sqlx`.
//!
//! This facade crate re-exports the crudx sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use crudx::prelude::*;
//!
//! #[derive(Debug, Entity, sqlx::FromRow)]
//! #[entity(table = "users")]
//! struct User {
//!     #[id(generated)]
//!     id: i64,
//!     name: String,
//! }
//!
//! let users = CrudClient::<User, sqlx::Sqlite>::new(pool);
//! let bob = users.save(User { id: 0, name: "bob".into() }).await?;
//! let none = users.find_by_id(&0).await?; // no query issued
//! ```
//!
//! # Feature flags
//!
//! | Feature    | Default | Crate                     |
//! |------------|---------|---------------------------|
//! | `client`   | **yes** | `crudx-sqlx`              |
//! | `macros`   | **yes** | `crudx-macros`            |
//! | `sqlite`   | no      | `crudx-sqlx/sqlite`       |
//! | `postgres` | no      | `crudx-sqlx/postgres`     |
//! | `mysql`    | no      | `crudx-sqlx/mysql`        |
//! | `uuid`     | no      | `uuid::Uuid` keys         |

// The derives use `proc-macro-crate` to detect whether the user depends on
// `crudx` (facade) or `crudx-data`, and generate the matching paths.
pub extern crate crudx_data;

pub use crudx_data::*;

#[cfg(feature = "client")]
pub use crudx_sqlx;

#[cfg(feature = "client")]
pub use crudx_sqlx::{CrudClient, DataSourceConfig, DataSourcePools, SqlxResultExt};

#[cfg(feature = "macros")]
pub use crudx_macros::{Entity, Key, ZeroValue};

pub mod prelude {
    //! Re-exports of the most commonly used types and derives.
    pub use crudx_data::prelude::*;

    #[cfg(feature = "client")]
    pub use crudx_sqlx::{CrudClient, DataSourceConfig, SqlxResultExt};

    #[cfg(feature = "macros")]
    pub use crudx_macros::{Entity, Key, ZeroValue};
}
