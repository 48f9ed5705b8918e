use crate::config::DataSourcePools;
use crate::error::SqlxResultExt;
use crudx_data::{
    BindValues, CompositeKeyStrategy, Crud, CrudResult, Dialect, Entity, IdentifierPolicy,
    SqlBuilder, ZeroValue,
};
use sqlx::{Database, Executor, FromRow, IntoArguments, Pool};
use std::future::Future;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Generic CRUD client over an `sqlx` pool.
///
/// Reads go to the reader pool and writes to the writer pool. Built with
/// [`CrudClient::new`] both are the same pool.
///
/// # Example
///
/// ```ignore
/// let users = CrudClient::<User, Sqlite>::new(pool.clone());
/// let alice = users.find_by_id(&1).await?;
/// let saved = users.save(User { id: 0, name: "bob".into() }).await?;
///
/// // Replica for reads, primary for writes.
/// let users = CrudClient::<User, Postgres>::with_read_write(replica, primary);
/// ```
pub struct CrudClient<T, DB: Database> {
    reader: Pool<DB>,
    writer: Pool<DB>,
    sql: SqlBuilder,
    _marker: PhantomData<fn() -> T>,
}

impl<T, DB: Database> CrudClient<T, DB> {
    pub fn new(pool: Pool<DB>) -> Self {
        Self::with_read_write(pool.clone(), pool)
    }

    pub fn with_read_write(reader: Pool<DB>, writer: Pool<DB>) -> Self {
        Self {
            reader,
            writer,
            sql: SqlBuilder::new(Dialect::of::<DB>()),
            _marker: PhantomData,
        }
    }

    /// Build a client from pools connected through a `DataSourceConfig`,
    /// carrying over its statement options.
    pub fn from_pools(pools: &DataSourcePools<DB>) -> Self {
        Self::with_read_write(pools.reader.clone(), pools.writer.clone())
            .composite_keys(pools.composite_keys)
            .identifier_policy(pools.identifier_policy)
    }

    pub fn composite_keys(mut self, strategy: CompositeKeyStrategy) -> Self {
        self.sql = self.sql.composite_keys(strategy);
        self
    }

    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.sql = self.sql.identifier_policy(policy);
        self
    }

    pub fn reader(&self) -> &Pool<DB> {
        &self.reader
    }

    pub fn writer(&self) -> &Pool<DB> {
        &self.writer
    }
}

impl<T, DB: Database> Clone for CrudClient<T, DB> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            writer: self.writer.clone(),
            sql: self.sql,
            _marker: PhantomData,
        }
    }
}

impl<T, DB> CrudClient<T, DB>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
    T: Entity + BindValues<DB> + for<'r> FromRow<'r, DB::Row>,
    T::Id: BindValues<DB>,
{
    pub async fn find_all(&self) -> CrudResult<Vec<T>> {
        let (sql, args) = self.sql.select_all::<T, DB>()?.into_parts()?;
        trace!(sql = %sql, "find_all");
        let rows = sqlx::query_as_with::<DB, T, _>(&sql, args)
            .fetch_all(&self.reader)
            .await?;
        debug!(table = T::table_name(), rows = rows.len(), "find_all");
        Ok(rows)
    }

    /// Looks a row up by key. Zero-valued keys and missing rows both give `None`.
    pub async fn find_by_id(&self, id: &T::Id) -> CrudResult<Option<T>> {
        if id.contains_zero() {
            debug!(table = T::table_name(), "skipping lookup for zero-valued id");
            return Ok(None);
        }
        let (sql, args) = self.sql.select_by_id::<T, DB>(id)?.into_parts()?;
        trace!(sql = %sql, "find_by_id");
        sqlx::query_as_with::<DB, T, _>(&sql, args)
            .fetch_one(&self.reader)
            .await
            .not_found_as_none()
    }

    /// Looks rows up by key, ignoring zero-valued keys.
    ///
    /// Rows come back in whatever order the database returns them.
    pub async fn find_by_ids(&self, ids: &[T::Id]) -> CrudResult<Vec<T>> {
        let present: Vec<&T::Id> = ids.iter().filter(|id| !id.contains_zero()).collect();
        if present.is_empty() {
            debug!(table = T::table_name(), requested = ids.len(), "no non-zero ids to look up");
            return Ok(Vec::new());
        }
        if present.len() < ids.len() {
            debug!(
                table = T::table_name(),
                skipped = ids.len() - present.len(),
                "dropping zero-valued ids"
            );
        }

        let mut rows = Vec::new();
        for chunk in present.chunks(self.sql.ids_per_statement::<T>()) {
            let (sql, args) = self.sql.select_by_ids::<T, DB>(chunk)?.into_parts()?;
            trace!(sql = %sql, ids = chunk.len(), "find_by_ids");
            let found = sqlx::query_as_with::<DB, T, _>(&sql, args)
                .fetch_all(&self.reader)
                .await?;
            rows.extend(found);
        }
        debug!(table = T::table_name(), ids = present.len(), rows = rows.len(), "find_by_ids");
        Ok(rows)
    }

    /// Upserts one entity. `None` writes nothing and returns `None`.
    ///
    /// Accepts either `entity` or `Some(entity)`.
    pub async fn save(&self, entity: impl Into<Option<T>>) -> CrudResult<Option<T>> {
        let Some(entity) = entity.into() else {
            return Ok(None);
        };
        let mut saved = self.save_all(vec![entity]).await?;
        Ok(saved.pop())
    }

    /// Upserts every entity in one writer transaction.
    ///
    /// Entities with a zero key and a database-generated key are inserted
    /// without the key so the database assigns it. Consecutive entities of
    /// the same kind share one statement, split at the backend's bind limit.
    /// On MySQL, which lacks `RETURNING`, the input entities are returned as
    /// written.
    pub async fn save_all(&self, entities: Vec<T>) -> CrudResult<Vec<T>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }
        let total = entities.len();
        let limit = self.sql.rows_per_statement::<T>();
        let returning = self.sql.dialect().supports_returning();

        let mut tx = self.writer.begin().await?;
        let mut saved = Vec::with_capacity(total);
        let mut pending = entities;

        while !pending.is_empty() {
            let generated = needs_generated_key(&pending[0]);
            let run = pending
                .iter()
                .take(limit)
                .take_while(|entity| needs_generated_key(*entity) == generated)
                .count();
            let rest = pending.split_off(run);
            let batch = std::mem::replace(&mut pending, rest);

            let statement = if generated {
                self.sql.insert_generated::<T, DB>(&batch)?
            } else {
                self.sql.upsert::<T, DB>(&batch)?
            };
            let (sql, args) = statement.into_parts()?;
            trace!(sql = %sql, generated, rows = batch.len(), "save_all batch");

            if returning {
                let rows = sqlx::query_as_with::<DB, T, _>(&sql, args)
                    .fetch_all(&mut *tx)
                    .await?;
                saved.extend(rows);
            } else {
                sqlx::query_with::<DB, _>(&sql, args).execute(&mut *tx).await?;
                saved.extend(batch);
            }
        }

        tx.commit().await?;
        debug!(table = T::table_name(), rows = total, "save_all");
        Ok(saved)
    }
}

fn needs_generated_key<T: Entity>(entity: &T) -> bool {
    T::generated_id() && entity.id().contains_zero()
}

impl<T, DB> Crud<T, T::Id> for CrudClient<T, DB>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
    T: Entity + BindValues<DB> + for<'r> FromRow<'r, DB::Row>,
    T::Id: BindValues<DB>,
{
    fn find_all(&self) -> impl Future<Output = CrudResult<Vec<T>>> {
        CrudClient::find_all(self)
    }

    fn find_by_id(&self, id: &T::Id) -> impl Future<Output = CrudResult<Option<T>>> {
        CrudClient::find_by_id(self, id)
    }

    fn find_by_ids(&self, ids: &[T::Id]) -> impl Future<Output = CrudResult<Vec<T>>> {
        CrudClient::find_by_ids(self, ids)
    }

    fn save(&self, entity: Option<T>) -> impl Future<Output = CrudResult<Option<T>>> {
        CrudClient::save(self, entity)
    }

    fn save_all(&self, entities: Vec<T>) -> impl Future<Output = CrudResult<Vec<T>>> {
        CrudClient::save_all(self, entities)
    }
}
