/// Errors that can occur in the CRUD layer.
///
/// A lookup that finds nothing is not an error: it surfaces as `Ok(None)` or
/// an empty `Vec`.
#[derive(Debug)]
pub enum CrudError {
    /// Driver or database failure, passed through as `sqlx` reported it.
    Database(sqlx::Error),
    /// A table or column name failed validation before any query was sent.
    InvalidIdentifier { kind: &'static str, ident: String },
    /// Data source configuration could not be loaded or applied.
    Config(String),
}

impl CrudError {
    /// Returns the underlying `sqlx` error, if this is a database failure.
    pub fn as_database(&self) -> Option<&sqlx::Error> {
        match self {
            CrudError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for CrudError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrudError::Database(err) => write!(f, "Database error: {err}"),
            CrudError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            CrudError::Config(msg) => write!(f, "Data source config error: {msg}"),
        }
    }
}

impl std::error::Error for CrudError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrudError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for CrudError {
    fn from(err: sqlx::Error) -> Self {
        CrudError::Database(err)
    }
}

/// Convenience alias for CRUD results.
pub type CrudResult<T> = Result<T, CrudError>;
