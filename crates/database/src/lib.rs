pub mod auctions;
pub mod bids;
pub mod chain_index;

use sqlx::{Executor, PgPool};

// Design:
//
// Functions that execute multiple statements atomically take `&mut
// PgTransaction` to indicate this and to ensure that the whole function
// succeeds or fails together. Functions that execute a single statement take
// `&mut PgConnection`. We usually call the parameter `ex` for `Executor`
// which is the trait whose methods we use to run queries.
// This scheme allows callers to decide whether they want to use the function
// as part of a bigger transaction or standalone. Note that PgTransaction
// implements Deref to PgConnection. Callers do need to take care of calling
// `commit` on the transaction.
//
// For tests a useful pattern is to start a transaction at the beginning of
// the test, use it for all queries and never commit it. When the uncommitted
// transaction gets dropped it is rolled back. This allows postgres tests to
// run in parallel and makes clearing all tables at the beginning of a test
// obsolete.

pub type PgTransaction<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// The names of all tables we use in the db.
pub const TABLES: &[&str] = &["auctions", "bids", "chain_index_state"];

/// Delete all data in the database and restore the singleton chain index row.
/// Only used by tests.
#[allow(non_snake_case)]
pub async fn clear_DANGER_(ex: &mut PgTransaction<'_>) -> sqlx::Result<()> {
    for table in TABLES {
        ex.execute(format!("TRUNCATE {table} CASCADE;").as_str())
            .await?;
    }
    // The schema seeds this row once; tests expect it to exist.
    chain_index::initialize(ex).await?;
    Ok(())
}

/// Like above but more ergonomic for some tests that use a pool.
#[allow(non_snake_case)]
pub async fn clear_DANGER(pool: &PgPool) -> sqlx::Result<()> {
    let mut transaction = pool.begin().await?;
    clear_DANGER_(&mut transaction).await?;
    transaction.commit().await
}
