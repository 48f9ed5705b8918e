use crudx_data::CrudError;

/// Extension trait normalizing `sqlx` lookups into the CRUD result shape.
///
/// `RowNotFound` is not a failure for the CRUD layer, it becomes `Ok(None)`.
/// Every other error is wrapped unchanged in [`CrudError::Database`].
pub trait SqlxResultExt<T> {
    fn not_found_as_none(self) -> Result<Option<T>, CrudError>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn not_found_as_none(self) -> Result<Option<T>, CrudError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(sqlx::Error::RowNotFound) => Ok(None),
            Err(err) => Err(CrudError::Database(err)),
        }
    }
}
