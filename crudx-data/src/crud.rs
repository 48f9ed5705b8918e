use crate::error::CrudError;
use std::future::Future;

/// Generic async create/read/update operations over an entity type.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
///
/// Zero-valued keys never reach the database: `find_by_id` answers `None` and
/// `find_by_ids` drops them before querying.
pub trait Crud<T, ID>
where
    T: Send + Sync + 'static,
    ID: Send + Sync + 'static,
{
    fn find_all(&self) -> impl Future<Output = Result<Vec<T>, CrudError>>;
    fn find_by_id(&self, id: &ID) -> impl Future<Output = Result<Option<T>, CrudError>>;
    fn find_by_ids(&self, ids: &[ID]) -> impl Future<Output = Result<Vec<T>, CrudError>>;
    fn save(&self, entity: Option<T>) -> impl Future<Output = Result<Option<T>, CrudError>>;
    fn save_all(&self, entities: Vec<T>) -> impl Future<Output = Result<Vec<T>, CrudError>>;
}
