//! SQLite-backed subscriber store using sqlx.

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    futures::stream::{BoxStream, StreamExt},
    sqlx::{
        Row, SqlitePool,
        sqlite::{SqlitePoolOptions, SqliteRow},
    },
};

use crate::{
    Error, Result,
    error::Context,
    store::SubscriberStore,
    types::Subscription,
};

/// SQLite-backed persistence for subscription records.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with its own connection pool and run migrations.
    ///
    /// For a shared pool use [`SqliteStore::with_pool`] after calling
    /// [`crate::run_migrations`].
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("failed to connect to SQLite")?;

        crate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store using an existing pool (migrations must already be run).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn millis_to_time(id: &str, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| Error::invalid_timestamp(id, millis))
}

fn decode_row(row: &SqliteRow) -> Result<(String, Subscription)> {
    let id: String = row.try_get("id")?;
    let start_time = millis_to_time(&id, row.try_get("start_time_ms")?)?;
    let last_sent_time = millis_to_time(&id, row.try_get("last_sent_ms")?)?;
    Ok((id, Subscription {
        start_time,
        last_sent_time,
    }))
}

#[async_trait]
impl SubscriberStore for SqliteStore {
    async fn put(&self, id: &str, subscription: &Subscription) -> Result<()> {
        sqlx::query(
            "INSERT INTO subscribers (id, start_time_ms, last_sent_ms) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                start_time_ms = excluded.start_time_ms,
                last_sent_ms = excluded.last_sent_ms",
        )
        .bind(id)
        .bind(subscription.start_time.timestamp_millis())
        .bind(subscription.last_sent_time.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM subscribers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Subscription>> {
        let row = sqlx::query("SELECT id, start_time_ms, last_sent_ms FROM subscribers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode_row(&r).map(|(_, sub)| sub)).transpose()
    }

    fn scan(&self) -> BoxStream<'_, Result<(String, Subscription)>> {
        sqlx::query("SELECT id, start_time_ms, last_sent_ms FROM subscribers")
            .fetch(&self.pool)
            .map(|row| decode_row(&row?))
            .boxed()
    }

    async fn advance_last_sent(
        &self,
        id: &str,
        expected: &Subscription,
        sent_at: DateTime<Utc>,
    ) -> Result<bool> {
        let next = expected.delivered_at(sent_at);
        let result = sqlx::query(
            "UPDATE subscribers SET last_sent_ms = ?
             WHERE id = ? AND start_time_ms = ? AND last_sent_ms = ?",
        )
        .bind(next.last_sent_time.timestamp_millis())
        .bind(id)
        .bind(expected.start_time.timestamp_millis())
        .bind(expected.last_sent_time.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::Duration, futures::TryStreamExt};

    async fn make_store() -> SqliteStore {
        // One connection: every pooled connection to `sqlite::memory:` would
        // otherwise get its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SqliteStore::with_pool(pool)
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_735_689_600_000).unwrap()
    }

    #[tokio::test]
    async fn test_sqlite_put_and_scan() {
        let store = make_store().await;
        store.put("U1", &Subscription::new(t0())).await.unwrap();
        store.put("U2", &Subscription::new(t0())).await.unwrap();

        let all: Vec<_> = store.scan().try_collect().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_sqlite_upsert_resets_both_timestamps() {
        let store = make_store().await;
        let first = Subscription::new(t0()).delivered_at(t0() + Duration::hours(1));
        store.put("U1", &first).await.unwrap();

        let restart = t0() + Duration::hours(3);
        store.put("U1", &Subscription::new(restart)).await.unwrap();

        let sub = store.get("U1").await.unwrap().unwrap();
        assert_eq!(sub.start_time, restart);
        assert_eq!(sub.last_sent_time, restart);
        let all: Vec<_> = store.scan().try_collect().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_delete_is_idempotent() {
        let store = make_store().await;
        store.put("U1", &Subscription::new(t0())).await.unwrap();
        store.delete("U1").await.unwrap();
        store.delete("U1").await.unwrap();
        assert!(store.get("U1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_conditional_advance() {
        let store = make_store().await;
        let read = Subscription::new(t0());
        store.put("U1", &read).await.unwrap();

        let sent_at = t0() + Duration::minutes(61);
        assert!(store.advance_last_sent("U1", &read, sent_at).await.unwrap());
        assert!(!store.advance_last_sent("U1", &read, sent_at).await.unwrap());

        store.delete("U1").await.unwrap();
        let fresh = store.get("U1").await.unwrap();
        assert!(fresh.is_none());
        assert!(!store.advance_last_sent("U1", &read, sent_at).await.unwrap());
        assert!(store.get("U1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("subs.db").display());

        {
            let store = SqliteStore::new(&url).await.unwrap();
            store.put("U1", &Subscription::new(t0())).await.unwrap();
        }

        let store = SqliteStore::new(&url).await.unwrap();
        let sub = store.get("U1").await.unwrap().unwrap();
        assert_eq!(sub, Subscription::new(t0()));
    }

    #[tokio::test]
    async fn test_connect_failure_is_described() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("absent/subs.db").display());

        match SqliteStore::new(&url).await {
            Err(Error::Message { message }) => {
                assert!(message.starts_with("failed to connect to SQLite: "), "{message}");
            },
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opened a database in a missing directory"),
        }
    }
}
