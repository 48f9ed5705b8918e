//! # crudx-sqlx — SQLx backend for the crudx CRUD layer
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CrudClient`] | find-all / find-by-id(s) / save / save-all over an `sqlx::Pool<DB>` |
//! | [`DataSourceConfig`] | YAML + environment configuration for the reader/writer pools |
//! | [`DataSourcePools`] | Connected pools plus statement options |
//! | [`SqlxResultExt`] | `.not_found_as_none()`: `RowNotFound` becomes `Ok(None)` |
//!
//! # Feature flags
//!
//! Enable the database drivers you need:
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! # Quick start
//!
//! ```ignore
//! use crudx_sqlx::{CrudClient, DataSourceConfig};
//! use sqlx::Postgres;
//!
//! let config = DataSourceConfig::load(".", None)?;
//! let pools = config.connect::<Postgres>().await?;
//! let users = CrudClient::<User, Postgres>::from_pools(&pools);
//!
//! let found = users.find_by_ids(&[1, 0, 2]).await?; // 0 is never queried
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::CrudClient;
pub use config::{DataSourceConfig, DataSourcePools};
pub use error::SqlxResultExt;

/// Re-exports of the most commonly used types from both `crudx-data` and this crate.
pub mod prelude {
    pub use crate::{CrudClient, DataSourceConfig, SqlxResultExt};
    pub use crudx_data::prelude::*;
}
