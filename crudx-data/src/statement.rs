//! Owned SQL text plus its bound arguments.
//!
//! Unlike `sqlx::QueryBuilder`, a [`Statement`] is taken apart with
//! [`Statement::into_parts`] before execution, so the caller owns both the
//! SQL string and the arguments and can hand them to `sqlx::query_as_with`.

use crate::error::CrudError;
use sqlx::error::BoxDynError;
use sqlx::{Arguments, Database, Encode, Type};

pub struct Statement<'args, DB: Database> {
    sql: String,
    arguments: DB::Arguments<'args>,
    bind_error: Option<BoxDynError>,
}

impl<'args, DB: Database> Statement<'args, DB> {
    pub fn new(init: impl Into<String>) -> Self {
        Self {
            sql: init.into(),
            arguments: Default::default(),
            bind_error: None,
        }
    }

    /// Append raw SQL.
    pub fn push(&mut self, sql: impl AsRef<str>) -> &mut Self {
        self.sql.push_str(sql.as_ref());
        self
    }

    /// Bind `value` and append the backend's placeholder for it (`?` or `$n`).
    ///
    /// The first encoding failure is kept and reported by [`Statement::into_parts`].
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: 'args + Encode<'args, DB> + Type<DB>,
    {
        if let Err(err) = self.arguments.add(value) {
            self.bind_error.get_or_insert(err);
        }
        // Writing into a `String` cannot fail.
        let _ = self.arguments.format_placeholder(&mut self.sql);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of values bound so far.
    pub fn bind_count(&self) -> usize {
        self.arguments.len()
    }

    pub fn into_parts(self) -> Result<(String, DB::Arguments<'args>), CrudError> {
        match self.bind_error {
            Some(err) => Err(CrudError::Database(sqlx::Error::Encode(err))),
            None => Ok((self.sql, self.arguments)),
        }
    }
}
