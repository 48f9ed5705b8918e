use crate::statement::Statement;
use crate::zero::ZeroValue;
use sqlx::{Database, Encode, Type};

/// Trait representing a database entity with a table name, key columns, and column list.
///
/// Intended to be implemented via `#[derive(Entity)]`, or manually.
///
/// # Example
///
/// ```ignore
/// impl Entity for UserEntity {
///     type Id = i64;
///     fn table_name() -> &'static str { "users" }
///     fn id_columns() -> &'static [&'static str] { &["id"] }
///     fn columns() -> &'static [&'static str] { &["id", "name", "email"] }
///     fn id(&self) -> i64 { self.id }
///     fn generated_id() -> bool { true }
/// }
/// ```
pub trait Entity: Send + Sync + Unpin + 'static {
    type Id: ZeroValue + Send + Sync + 'static;

    fn table_name() -> &'static str;

    /// Key columns, in the order `Id` binds them.
    fn id_columns() -> &'static [&'static str];

    /// Every persisted column, in the order the entity binds them.
    fn columns() -> &'static [&'static str];

    fn id(&self) -> Self::Id;

    /// Whether the database assigns the key on insert.
    ///
    /// When `true`, entities with a zero key are inserted with the key column
    /// left out.
    fn generated_id() -> bool {
        false
    }
}

/// Binds a value's columns, one at a time, into a [`Statement`].
///
/// `index` refers to [`Entity::columns`] for entities and to
/// [`Entity::id_columns`] for identifiers. Scalars ignore the index.
pub trait BindValues<DB: Database> {
    fn push_bind_at<'args>(&self, index: usize, query: &mut Statement<'args, DB>);
}

impl<DB: Database, V: BindValues<DB> + ?Sized> BindValues<DB> for &V {
    fn push_bind_at<'args>(&self, index: usize, query: &mut Statement<'args, DB>) {
        (**self).push_bind_at(index, query)
    }
}

macro_rules! impl_bind_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<DB: Database> BindValues<DB> for $ty
            where
                $ty: for<'q> Encode<'q, DB> + Type<DB>,
            {
                fn push_bind_at<'args>(&self, _index: usize, query: &mut Statement<'args, DB>) {
                    query.push_bind(self.clone());
                }
            }
        )*
    };
}

impl_bind_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, String);

#[cfg(feature = "uuid")]
impl_bind_scalar!(uuid::Uuid);

macro_rules! impl_bind_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<DB: Database, $($name),+> BindValues<DB> for ($($name,)+)
        where
            $($name: for<'q> Encode<'q, DB> + Type<DB> + Clone + 'static,)+
        {
            fn push_bind_at<'args>(&self, index: usize, query: &mut Statement<'args, DB>) {
                match index {
                    $($idx => { query.push_bind(self.$idx.clone()); })+
                    _ => {}
                }
            }
        }
    };
}

impl_bind_tuple!(A: 0, B: 1);
impl_bind_tuple!(A: 0, B: 1, C: 2);
impl_bind_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_bind_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_bind_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
