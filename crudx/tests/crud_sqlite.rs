use crudx::prelude::*;
use crudx::{
    CompositeKeyStrategy, CrudError, DataSourceConfig, Dialect, IdentifierPolicy, SqlBuilder,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Entity, sqlx::FromRow)]
#[entity(table = "users")]
struct User {
    #[id(generated)]
    id: i64,
    name: String,
    email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Entity, sqlx::FromRow)]
#[entity(table = "memberships")]
struct Membership {
    #[id]
    org_id: i64,
    #[id]
    user_id: i64,
    role: String,
}

#[derive(Debug, Clone, ZeroValue, Key)]
struct OrderLineKey {
    order_id: i64,
    line: i64,
}

#[derive(Debug, Clone, PartialEq, Entity, sqlx::FromRow)]
#[entity(table = "order_lines", key = OrderLineKey)]
struct OrderLine {
    #[id]
    order_id: i64,
    #[id]
    line: i64,
    sku: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// A single connection keeps the in-memory database alive and shared.
async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

async fn setup() -> SqlitePool {
    init_tracing();
    let pool = memory_pool().await;
    create_schema(&pool).await;
    pool
}

async fn create_schema(pool: &SqlitePool) {
    for ddl in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, email TEXT)",
        "CREATE TABLE memberships (org_id INTEGER NOT NULL, user_id INTEGER NOT NULL, role TEXT NOT NULL, PRIMARY KEY (org_id, user_id))",
        "CREATE TABLE order_lines (order_id INTEGER NOT NULL, line INTEGER NOT NULL, sku TEXT NOT NULL, PRIMARY KEY (order_id, line))",
    ] {
        sqlx::query(ddl).execute(pool).await.unwrap();
    }
}

async fn seed_users(pool: &SqlitePool, names: &[&str]) {
    for name in names {
        sqlx::query("INSERT INTO users (name) VALUES (?)")
            .bind(*name)
            .execute(pool)
            .await
            .unwrap();
    }
}

fn user(id: i64, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        email: None,
    }
}

/// A pool that fails every query, to prove a code path never reaches the database.
async fn closed_pool() -> SqlitePool {
    let pool = memory_pool().await;
    pool.close().await;
    pool
}

#[tokio::test]
async fn test_find_all() {
    let pool = setup().await;
    seed_users(&pool, &["alice", "bob"]).await;
    let users = CrudClient::<User, Sqlite>::new(pool);

    let mut all = users.find_all().await.unwrap();
    all.sort_by_key(|u| u.id);
    assert_eq!(all, vec![user(1, "alice"), user(2, "bob")]);
}

#[tokio::test]
async fn test_find_all_empty_table() {
    let users = CrudClient::<User, Sqlite>::new(setup().await);
    assert!(users.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_by_id() {
    let pool = setup().await;
    seed_users(&pool, &["alice", "bob"]).await;
    let users = CrudClient::<User, Sqlite>::new(pool);

    assert_eq!(users.find_by_id(&2).await.unwrap(), Some(user(2, "bob")));
}

#[tokio::test]
async fn test_find_by_id_not_found_is_none() {
    let users = CrudClient::<User, Sqlite>::new(setup().await);
    assert_eq!(users.find_by_id(&42).await.unwrap(), None);
}

#[tokio::test]
async fn test_find_by_zero_id_skips_query() {
    let users = CrudClient::<User, Sqlite>::new(closed_pool().await);

    assert_eq!(users.find_by_id(&0).await.unwrap(), None);

    // The same pool does fail once a query is attempted.
    let err = users.find_by_id(&1).await.unwrap_err();
    assert!(matches!(err, CrudError::Database(sqlx::Error::PoolClosed)));
}

#[tokio::test]
async fn test_database_errors_propagate() {
    init_tracing();
    // No schema: every query hits a missing table.
    let users = CrudClient::<User, Sqlite>::new(memory_pool().await);

    let err = users.find_by_id(&1).await.unwrap_err();
    assert!(matches!(err, CrudError::Database(_)));
    assert!(err.as_database().is_some());

    assert!(matches!(users.find_all().await, Err(CrudError::Database(_))));
    assert!(matches!(users.save(user(0, "x")).await, Err(CrudError::Database(_))));
}

#[tokio::test]
async fn test_find_by_ids_queries_non_zero_subset() {
    let pool = setup().await;
    seed_users(&pool, &["alice", "bob", "carol"]).await;
    let users = CrudClient::<User, Sqlite>::new(pool);

    let mut found = users.find_by_ids(&[0, 1, 0, 3]).await.unwrap();
    found.sort_by_key(|u| u.id);
    assert_eq!(found, vec![user(1, "alice"), user(3, "carol")]);
}

#[tokio::test]
async fn test_find_by_ids_all_zero_skips_query() {
    let users = CrudClient::<User, Sqlite>::new(closed_pool().await);
    assert!(users.find_by_ids(&[0, 0]).await.unwrap().is_empty());
    assert!(users.find_by_ids(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_by_ids_missing_rows_are_ignored() {
    let pool = setup().await;
    seed_users(&pool, &["alice"]).await;
    let users = CrudClient::<User, Sqlite>::new(pool);

    assert_eq!(users.find_by_ids(&[1, 99]).await.unwrap(), vec![user(1, "alice")]);
}

#[tokio::test]
async fn test_save_none_and_empty_are_no_ops() {
    let users = CrudClient::<User, Sqlite>::new(closed_pool().await);

    assert_eq!(users.save(None::<User>).await.unwrap(), None);
    assert!(users.save_all(Vec::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_assigns_generated_id() {
    let pool = setup().await;
    let users = CrudClient::<User, Sqlite>::new(pool.clone());

    let saved = users
        .save(User {
            id: 0,
            name: "alice".into(),
            email: Some("alice@example.com".into()),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.id, 1);
    assert_eq!(saved.email.as_deref(), Some("alice@example.com"));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_save_updates_existing_row() {
    let pool = setup().await;
    seed_users(&pool, &["alice"]).await;
    let users = CrudClient::<User, Sqlite>::new(pool);

    let saved = users.save(Some(user(1, "alicia"))).await.unwrap();
    assert_eq!(saved, Some(user(1, "alicia")));
    assert_eq!(users.find_by_id(&1).await.unwrap(), Some(user(1, "alicia")));
    assert_eq!(users.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_save_with_explicit_new_id_inserts() {
    let users = CrudClient::<User, Sqlite>::new(setup().await);

    let saved = users.save(user(7, "gus")).await.unwrap();
    assert_eq!(saved, Some(user(7, "gus")));
    assert_eq!(users.find_by_id(&7).await.unwrap(), Some(user(7, "gus")));
}

#[tokio::test]
async fn test_save_all_mixes_inserts_and_updates() {
    let pool = setup().await;
    seed_users(&pool, &["alice"]).await;
    let users = CrudClient::<User, Sqlite>::new(pool);

    let mut saved = users
        .save_all(vec![user(0, "bob"), user(0, "carol"), user(1, "alicia")])
        .await
        .unwrap();
    saved.sort_by_key(|u| u.id);
    assert_eq!(
        saved,
        vec![user(1, "alicia"), user(2, "bob"), user(3, "carol")]
    );

    let mut all = users.find_all().await.unwrap();
    all.sort_by_key(|u| u.id);
    assert_eq!(all, saved);
}

#[tokio::test]
async fn test_save_all_rolls_back_on_failure() {
    init_tracing();
    let pool = memory_pool().await;
    sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL CHECK (name <> 'bad'), email TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    let users = CrudClient::<User, Sqlite>::new(pool);

    // Two batches: the upsert of id 5 succeeds, then the insert fails the CHECK.
    let result = users.save_all(vec![user(5, "ok"), user(0, "bad")]).await;
    assert!(matches!(result, Err(CrudError::Database(_))));
    assert!(users.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_composite_tuple_key() {
    let memberships = CrudClient::<Membership, Sqlite>::new(setup().await);

    memberships
        .save_all(vec![
            Membership { org_id: 1, user_id: 1, role: "owner".into() },
            Membership { org_id: 1, user_id: 2, role: "member".into() },
            Membership { org_id: 2, user_id: 1, role: "member".into() },
        ])
        .await
        .unwrap();

    let found = memberships.find_by_id(&(1, 2)).await.unwrap().unwrap();
    assert_eq!(found.role, "member");

    // A partially zero key is never looked up.
    assert_eq!(memberships.find_by_id(&(1, 0)).await.unwrap(), None);

    let mut found = memberships
        .find_by_ids(&[(1, 1), (0, 2), (2, 1)])
        .await
        .unwrap();
    found.sort_by_key(|m| (m.org_id, m.user_id));
    assert_eq!(found.len(), 2);
    assert_eq!((found[0].org_id, found[0].user_id), (1, 1));
    assert_eq!((found[1].org_id, found[1].user_id), (2, 1));
}

#[tokio::test]
async fn test_composite_key_upsert_updates_in_place() {
    let memberships = CrudClient::<Membership, Sqlite>::new(setup().await);

    memberships
        .save(Membership { org_id: 1, user_id: 1, role: "member".into() })
        .await
        .unwrap();
    let saved = memberships
        .save(Membership { org_id: 1, user_id: 1, role: "owner".into() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.role, "owner");
    assert_eq!(memberships.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_struct_key_with_both_strategies() {
    let pool = setup().await;
    let lines = CrudClient::<OrderLine, Sqlite>::new(pool.clone());
    lines
        .save_all(vec![
            OrderLine { order_id: 1, line: 1, sku: "A".into() },
            OrderLine { order_id: 1, line: 2, sku: "B".into() },
            OrderLine { order_id: 2, line: 1, sku: "C".into() },
        ])
        .await
        .unwrap();

    let ids = [
        OrderLineKey { order_id: 1, line: 2 },
        OrderLineKey { order_id: 0, line: 0 },
        OrderLineKey { order_id: 2, line: 1 },
    ];

    for strategy in [CompositeKeyStrategy::RowValues, CompositeKeyStrategy::OrChain] {
        let client = CrudClient::<OrderLine, Sqlite>::new(pool.clone()).composite_keys(strategy);
        let mut skus: Vec<String> = client
            .find_by_ids(&ids)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.sku)
            .collect();
        skus.sort();
        assert_eq!(skus, vec!["B", "C"], "strategy {strategy:?}");
    }

    let line = lines
        .find_by_id(&OrderLineKey { order_id: 1, line: 1 })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line.sku, "A");
    assert_eq!(
        lines.find_by_id(&OrderLineKey { order_id: 1, line: 0 }).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_read_write_split() {
    init_tracing();
    let reader = memory_pool().await;
    let writer = memory_pool().await;
    create_schema(&reader).await;
    create_schema(&writer).await;
    seed_users(&reader, &["replica-only"]).await;

    let users = CrudClient::<User, Sqlite>::with_read_write(reader.clone(), writer.clone());

    assert_eq!(users.find_all().await.unwrap(), vec![user(1, "replica-only")]);

    users.save(user(0, "primary-only")).await.unwrap();

    let on_writer: Vec<User> = sqlx::query_as("SELECT id, name, email FROM users")
        .fetch_all(users.writer())
        .await
        .unwrap();
    assert_eq!(on_writer, vec![user(1, "primary-only")]);

    // Reads still go to the replica, which never saw the write.
    assert_eq!(users.find_all().await.unwrap(), vec![user(1, "replica-only")]);
    assert_eq!(users.reader().size(), 1);
}

#[tokio::test]
async fn test_identifier_policies() {
    let pool = setup().await;
    seed_users(&pool, &["alice"]).await;

    for policy in [IdentifierPolicy::Raw, IdentifierPolicy::Validate, IdentifierPolicy::Quote] {
        let users = CrudClient::<User, Sqlite>::new(pool.clone()).identifier_policy(policy);
        assert_eq!(users.find_all().await.unwrap().len(), 1, "policy {policy:?}");
    }
}

async fn count_through_trait<C: Crud<User, i64>>(crud: &C) -> usize {
    crud.find_all().await.unwrap().len()
}

#[tokio::test]
async fn test_crud_trait() {
    let pool = setup().await;
    seed_users(&pool, &["alice", "bob"]).await;
    let users = CrudClient::<User, Sqlite>::new(pool);

    assert_eq!(count_through_trait(&users).await, 2);
    let saved = Crud::save(&users, Some(user(0, "carol"))).await.unwrap();
    assert_eq!(saved.map(|u| u.id), Some(3));
    assert_eq!(Crud::find_by_ids(&users, &[0, 3]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_client_from_config() {
    init_tracing();
    let config = DataSourceConfig::from_yaml_str(
        r#"
datasource:
  url: "sqlite::memory:"
  max_connections: 1
  composite_keys: or-chain
"#,
    )
    .unwrap();
    let pools = config.connect::<Sqlite>().await.unwrap();
    create_schema(&pools.writer).await;

    let memberships = CrudClient::<Membership, Sqlite>::from_pools(&pools);
    memberships
        .save(Membership { org_id: 4, user_id: 2, role: "member".into() })
        .await
        .unwrap();
    assert_eq!(memberships.find_by_ids(&[(4, 2)]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_find_by_ids_spans_several_statements() {
    let users = CrudClient::<User, Sqlite>::new(setup().await);
    let per_statement = SqlBuilder::new(Dialect::Sqlite).ids_per_statement::<User>() as i64;
    let far = per_statement + 10;
    users
        .save_all(vec![user(1, "first"), user(per_statement, "edge"), user(far, "far")])
        .await
        .unwrap();

    let ids: Vec<i64> = (1..=far).collect();
    let mut found = users.find_by_ids(&ids).await.unwrap();
    found.sort_by_key(|u| u.id);
    assert_eq!(
        found,
        vec![user(1, "first"), user(per_statement, "edge"), user(far, "far")]
    );
}

#[tokio::test]
async fn test_composite_find_by_ids_spans_several_statements() {
    let pool = setup().await;
    let memberships = CrudClient::<Membership, Sqlite>::new(pool.clone());
    let rows: Vec<Membership> = (1..=1500)
        .map(|user_id| Membership { org_id: 1, user_id, role: "member".into() })
        .collect();
    assert_eq!(memberships.save_all(rows).await.unwrap().len(), 1500);

    let ids: Vec<(i64, i64)> = (1..=1500).map(|user_id| (1, user_id)).collect();
    for strategy in [CompositeKeyStrategy::RowValues, CompositeKeyStrategy::OrChain] {
        let client = CrudClient::<Membership, Sqlite>::new(pool.clone()).composite_keys(strategy);
        let mut user_ids: Vec<i64> = client
            .find_by_ids(&ids)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        user_ids.sort();
        assert_eq!(user_ids, (1..=1500).collect::<Vec<i64>>(), "strategy {strategy:?}");
    }
}

#[tokio::test]
async fn test_save_all_spans_several_statements() {
    let pool = setup().await;
    let users = CrudClient::<User, Sqlite>::new(pool.clone());
    let total = SqlBuilder::new(Dialect::Sqlite).rows_per_statement::<User>() + 5;

    let batch: Vec<User> = (0..total).map(|i| user(0, &format!("user-{i}"))).collect();
    let mut saved = users.save_all(batch).await.unwrap();
    assert_eq!(saved.len(), total);
    saved.sort_by_key(|u| u.id);
    for (i, u) in saved.iter().enumerate() {
        assert_eq!(u.id, i as i64 + 1);
        assert_eq!(u.name, format!("user-{i}"));
    }

    let renamed: Vec<User> = saved
        .iter()
        .map(|u| user(u.id, &format!("renamed-{}", u.id)))
        .collect();
    let updated = users.save_all(renamed).await.unwrap();
    assert_eq!(updated.len(), total);
    assert!(updated.iter().all(|u| u.name == format!("renamed-{}", u.id)));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, total as i64);
}
