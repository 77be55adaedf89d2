//! In-memory store for tests and ephemeral runs.

use std::{collections::BTreeMap, sync::Mutex};

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    futures::stream::{self, BoxStream, StreamExt},
};

use crate::{
    Result,
    store::{SUBSCRIBER_NAMESPACE, SubscriberStore},
    types::Subscription,
};

/// In-memory store backed by a sorted map. No persistence.
///
/// Keys are `subscribers/<id>`; `scan` is a prefix range over the map.
pub struct InMemoryStore {
    entries: Mutex<BTreeMap<String, Subscription>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn key(id: &str) -> String {
        format!("{SUBSCRIBER_NAMESPACE}/{id}")
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriberStore for InMemoryStore {
    async fn put(&self, id: &str, subscription: &Subscription) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(Self::key(id), *subscription);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&Self::key(id));
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Subscription>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(&Self::key(id)).copied())
    }

    fn scan(&self) -> BoxStream<'_, Result<(String, Subscription)>> {
        let prefix = format!("{SUBSCRIBER_NAMESPACE}/");
        let snapshot: Vec<Result<(String, Subscription)>> = {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries
                .range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(&prefix))
                .map(|(key, sub)| Ok((key[prefix.len()..].to_string(), *sub)))
                .collect()
        };
        stream::iter(snapshot).boxed()
    }

    async fn advance_last_sent(
        &self,
        id: &str,
        expected: &Subscription,
        sent_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get_mut(&Self::key(id)) {
            Some(current) if current == expected => {
                *current = current.delivered_at(sent_at);
                Ok(true)
            },
            _ => Ok(false),
        }
    }
}
