//! SQL generation for the CRUD statements.
//!
//! Statements are emitted into a [`Statement`], so placeholders follow
//! whatever style the backend expects (`?` or `$n`).
//!
//! ```ignore
//! let sql = SqlBuilder::new(Dialect::Postgres);
//! let (query, args) = sql.select_by_ids::<User, Postgres>(&[&1, &2])?.into_parts()?;
//! // SELECT "id", "name" FROM "users" WHERE "id" IN ($1, $2)
//! let users = sqlx::query_as_with::<_, User, _>(&query, args).fetch_all(&pool).await?;
//! ```

use crate::entity::{BindValues, Entity};
use crate::error::CrudError;
use crate::statement::Statement;
use serde::Deserialize;
use sqlx::Database;

/// SQLite rejects expression trees deeper than 1000.
const MAX_OR_CHAIN_KEYS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `ON CONFLICT` upserts, double-quote identifiers.
    Generic,
    Sqlite,
    MySql,
    Postgres,
}

impl Dialect {
    /// Maps `sqlx::Database::NAME` to a dialect.
    pub fn from_database_name(name: &str) -> Self {
        match name {
            "SQLite" => Dialect::Sqlite,
            "PostgreSQL" => Dialect::Postgres,
            "MySQL" => Dialect::MySql,
            _ => Dialect::Generic,
        }
    }

    pub fn of<DB: Database>() -> Self {
        Self::from_database_name(DB::NAME)
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    /// Whether `INSERT ... RETURNING` is available.
    pub fn supports_returning(self) -> bool {
        !matches!(self, Dialect::MySql)
    }

    /// Upper bound on bind parameters in a single statement.
    pub fn max_bind_params(self) -> usize {
        match self {
            Dialect::Sqlite | Dialect::Generic => 32_766,
            Dialect::Postgres | Dialect::MySql => 65_535,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Do not validate or quote identifiers.
    Raw,
    /// Validate identifiers against a conservative pattern.
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

/// How `find_by_ids` matches keys made of more than one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeKeyStrategy {
    /// `(a, b) IN (VALUES (?, ?), ...)`, or `(a, b) IN ((?, ?), ...)` on MySQL.
    #[default]
    RowValues,
    /// `(a = ? AND b = ?) OR (a = ? AND b = ?) ...`
    OrChain,
}

/// Builds the statements behind the CRUD operations for any [`Entity`].
#[derive(Debug, Clone, Copy)]
pub struct SqlBuilder {
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
    composite_keys: CompositeKeyStrategy,
}

impl SqlBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            identifier_policy: IdentifierPolicy::Quote,
            composite_keys: CompositeKeyStrategy::RowValues,
        }
    }

    /// Configure identifier validation/quoting behavior.
    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    pub fn composite_keys(mut self, strategy: CompositeKeyStrategy) -> Self {
        self.composite_keys = strategy;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// How many rows of `T` fit in one INSERT.
    pub fn rows_per_statement<T: Entity>(&self) -> usize {
        (self.dialect.max_bind_params() / T::columns().len().max(1)).max(1)
    }

    /// How many keys of `T` fit in one SELECT.
    ///
    /// An OR chain nests one expression level per key, so it is also held
    /// under the parser's expression depth limit.
    pub fn ids_per_statement<T: Entity>(&self) -> usize {
        let key_columns = T::id_columns().len().max(1);
        let by_binds = (self.dialect.max_bind_params() / key_columns).max(1);
        if key_columns > 1 && self.composite_keys == CompositeKeyStrategy::OrChain {
            by_binds.min(MAX_OR_CHAIN_KEYS)
        } else {
            by_binds
        }
    }

    /// `SELECT <columns> FROM <table>`
    pub fn select_all<'args, T, DB>(&self) -> Result<Statement<'args, DB>, CrudError>
    where
        T: Entity,
        DB: Database,
    {
        Ok(Statement::new(self.select_head::<T>()?))
    }

    /// `SELECT ... WHERE <key> = ? LIMIT 1`
    pub fn select_by_id<'args, T, DB>(
        &self,
        id: &T::Id,
    ) -> Result<Statement<'args, DB>, CrudError>
    where
        T: Entity,
        T::Id: BindValues<DB>,
        DB: Database,
    {
        let keys = self.format_list(T::id_columns(), "column")?;
        let mut query = Statement::new(self.select_head::<T>()?);
        query.push(" WHERE ");
        self.push_key_match(&mut query, &keys, id);
        query.push(" LIMIT 1");
        Ok(query)
    }

    /// `SELECT ... WHERE <key> IN (...)`, or the composite-key form when the
    /// key has more than one column.
    pub fn select_by_ids<'args, T, DB>(
        &self,
        ids: &[&T::Id],
    ) -> Result<Statement<'args, DB>, CrudError>
    where
        T: Entity,
        T::Id: BindValues<DB>,
        DB: Database,
    {
        let keys = self.format_list(T::id_columns(), "column")?;
        let mut query = Statement::new(self.select_head::<T>()?);
        query.push(" WHERE ");

        if keys.len() == 1 {
            query.push(format!("{} IN (", keys[0]));
            for (i, id) in ids.iter().enumerate() {
                if i > 0 {
                    query.push(", ");
                }
                id.push_bind_at(0, &mut query);
            }
            query.push(")");
            return Ok(query);
        }

        match self.composite_keys {
            CompositeKeyStrategy::RowValues => {
                query.push(format!("({}) IN (", keys.join(", ")));
                if self.dialect != Dialect::MySql {
                    query.push("VALUES ");
                }
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        query.push(", ");
                    }
                    query.push("(");
                    for j in 0..keys.len() {
                        if j > 0 {
                            query.push(", ");
                        }
                        id.push_bind_at(j, &mut query);
                    }
                    query.push(")");
                }
                query.push(")");
            }
            CompositeKeyStrategy::OrChain => {
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        query.push(" OR ");
                    }
                    query.push("(");
                    self.push_key_match(&mut query, &keys, *id);
                    query.push(")");
                }
            }
        }
        Ok(query)
    }

    /// Insert-or-update of every row, keyed on [`Entity::id_columns`].
    pub fn upsert<'args, T, DB>(&self, rows: &[T]) -> Result<Statement<'args, DB>, CrudError>
    where
        T: Entity + BindValues<DB>,
        DB: Database,
    {
        let columns = self.format_list(T::columns(), "column")?;
        let keys = self.format_list(T::id_columns(), "column")?;
        let bound: Vec<usize> = (0..columns.len()).collect();

        let mut query = Statement::new(self.insert_head::<T>(&columns, &bound)?);
        push_rows(&mut query, rows, &bound);

        let updates: Vec<&String> = columns.iter().filter(|c| !keys.contains(c)).collect();
        match self.dialect {
            Dialect::MySql => {
                query.push(" ON DUPLICATE KEY UPDATE ");
                if updates.is_empty() {
                    query.push(format!("{0} = {0}", keys[0]));
                } else {
                    let set: Vec<String> =
                        updates.iter().map(|c| format!("{c} = VALUES({c})")).collect();
                    query.push(set.join(", "));
                }
            }
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => {
                query.push(format!(" ON CONFLICT ({}) DO UPDATE SET ", keys.join(", ")));
                if updates.is_empty() {
                    query.push(format!("{0} = excluded.{0}", keys[0]));
                } else {
                    let set: Vec<String> =
                        updates.iter().map(|c| format!("{c} = excluded.{c}")).collect();
                    query.push(set.join(", "));
                }
            }
        }
        self.push_returning(&mut query, &columns);
        Ok(query)
    }

    /// Plain INSERT leaving the generated key column out.
    pub fn insert_generated<'args, T, DB>(
        &self,
        rows: &[T],
    ) -> Result<Statement<'args, DB>, CrudError>
    where
        T: Entity + BindValues<DB>,
        DB: Database,
    {
        let columns = self.format_list(T::columns(), "column")?;
        let key = T::id_columns().first().copied().unwrap_or_default();
        let key_index = T::columns()
            .iter()
            .position(|c| *c == key)
            .ok_or_else(|| CrudError::InvalidIdentifier {
                kind: "key column",
                ident: key.to_string(),
            })?;
        let bound: Vec<usize> = (0..columns.len()).filter(|i| *i != key_index).collect();

        let mut query = Statement::new(self.insert_head::<T>(&columns, &bound)?);
        push_rows(&mut query, rows, &bound);
        self.push_returning(&mut query, &columns);
        Ok(query)
    }

    fn select_head<T: Entity>(&self) -> Result<String, CrudError> {
        let table = self.format_identifier_checked(T::table_name(), "table")?;
        let columns = self.format_list(T::columns(), "column")?;
        Ok(format!("SELECT {} FROM {table}", columns.join(", ")))
    }

    fn insert_head<T: Entity>(&self, columns: &[String], bound: &[usize]) -> Result<String, CrudError> {
        let table = self.format_identifier_checked(T::table_name(), "table")?;
        let names: Vec<&str> = bound.iter().map(|i| columns[*i].as_str()).collect();
        Ok(format!("INSERT INTO {table} ({}) VALUES ", names.join(", ")))
    }

    fn push_key_match<'args, DB, K>(&self, query: &mut Statement<'args, DB>, keys: &[String], id: &K)
    where
        DB: Database,
        K: BindValues<DB> + ?Sized,
    {
        for (j, key) in keys.iter().enumerate() {
            if j > 0 {
                query.push(" AND ");
            }
            query.push(format!("{key} = "));
            id.push_bind_at(j, query);
        }
    }

    fn push_returning<DB: Database>(&self, query: &mut Statement<'_, DB>, columns: &[String]) {
        if self.dialect.supports_returning() {
            query.push(format!(" RETURNING {}", columns.join(", ")));
        }
    }

    fn format_list(&self, idents: &[&str], kind: &'static str) -> Result<Vec<String>, CrudError> {
        if idents.is_empty() {
            return Err(CrudError::InvalidIdentifier {
                kind,
                ident: String::new(),
            });
        }
        idents
            .iter()
            .map(|ident| self.format_identifier_checked(ident, kind))
            .collect()
    }

    fn format_identifier_checked(&self, ident: &str, kind: &'static str) -> Result<String, CrudError> {
        match self.identifier_policy {
            IdentifierPolicy::Raw => return Ok(ident.to_string()),
            IdentifierPolicy::Validate | IdentifierPolicy::Quote => {}
        }
        if !is_valid_identifier(ident) {
            return Err(CrudError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.identifier_policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, self.dialect)),
            IdentifierPolicy::Raw | IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }
}

fn push_rows<'args, T, DB>(query: &mut Statement<'args, DB>, rows: &[T], bound: &[usize])
where
    T: BindValues<DB>,
    DB: Database,
{
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            query.push(", ");
        }
        query.push("(");
        for (n, column) in bound.iter().enumerate() {
            if n > 0 {
                query.push(", ");
            }
            row.push_bind_at(*column, query);
        }
        query.push(")");
    }
}

fn is_valid_identifier(ident: &str) -> bool {
    !ident.is_empty() && ident.split('.').all(is_valid_segment)
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(ident: &str, dialect: Dialect) -> String {
    let quote = dialect.quote_char();
    ident
        .split('.')
        .map(|part| format!("{quote}{part}{quote}"))
        .collect::<Vec<_>>()
        .join(".")
}
