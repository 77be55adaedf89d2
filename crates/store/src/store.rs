//! Persistence trait for subscription records.

use {async_trait::async_trait, futures::stream::BoxStream};

use crate::{Result, types::Subscription};

/// Key namespace every subscriber record lives under.
pub const SUBSCRIBER_NAMESPACE: &str = "subscribers";

/// Persistence backend for subscription records, keyed by subscriber id.
///
/// Every operation is atomic per key; there are no multi-key transactions.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Insert or replace the record for `id`.
    async fn put(&self, id: &str, subscription: &Subscription) -> Result<()>;

    /// Remove the record for `id`. Absence is not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Subscription>>;

    /// Stream every stored `(id, record)` pair. No ordering is promised and
    /// concurrent writers may or may not be observed.
    fn scan(&self) -> BoxStream<'_, Result<(String, Subscription)>>;

    /// Set `last_sent_time` to `sent_at`, but only if the record for `id`
    /// still exists and equals `expected`. Returns whether the write happened.
    ///
    /// A `stop` (delete) or a fresh `start` (put) that lands between the
    /// sweep's read and this write makes it a no-op.
    async fn advance_last_sent(
        &self,
        id: &str,
        expected: &Subscription,
        sent_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<bool>;
}
