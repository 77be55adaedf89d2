//! Subscriber Store: the durable mapping from subscriber id to subscription record.
//!
//! Two backends share the [`store::SubscriberStore`] contract: an in-memory
//! sorted map (tests, ephemeral runs) and SQLite via sqlx.

pub mod error;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;

pub use {
    error::{Error, Result},
    store::SubscriberStore,
    store_memory::InMemoryStore,
    store_sqlite::SqliteStore,
    types::Subscription,
};

/// Run database migrations for the store crate.
///
/// This creates the `subscribers` table. Should be called at application
/// startup when using [`SqliteStore::with_pool`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
