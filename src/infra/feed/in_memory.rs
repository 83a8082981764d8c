// In-memory implementation of MessageStore.
//
// Records live in a DashMap keyed by id. Ordering comes from an explicit
// (timestamp, id) index, so listings never sort the whole table.

use crate::core::errors::StoreError;
use crate::core::feed::{Message, MessageFilter, MessageId, MessageStatus, MessageStore, NewMessage};
use crate::core::pagination::Cursor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

pub struct InMemoryMessageStore {
    records: DashMap<MessageId, Message>,
    /// Ascending (created_at, id); listings walk it backwards.
    index: RwLock<BTreeSet<(DateTime<Utc>, u64)>>,
    next_id: AtomicU64,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            index: RwLock::new(BTreeSet::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError> {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let stored = Message {
            id,
            author_name: message.author_name,
            author_identity: message.author_identity,
            body: message.body,
            created_at: message.created_at.unwrap_or_else(Utc::now),
            status: MessageStatus::Visible,
        };

        // Record first, then index: a reader that finds the key finds the record.
        self.records.insert(id, stored.clone());
        self.index.write().await.insert(stored.cursor().key());

        Ok(stored)
    }

    async fn get_by_id(&self, id: MessageId) -> Result<Message, StoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("message {}", id)))
    }

    async fn update_status(&self, id: MessageId, status: MessageStatus) -> Result<(), StoreError> {
        match self.records.get_mut(&id) {
            Some(mut entry) => {
                entry.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("message {}", id))),
        }
    }

    async fn list(
        &self,
        filter: MessageFilter,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<Vec<Message>, StoreError> {
        let upper = match before {
            Some(cursor) => Bound::Excluded(cursor.key()),
            None => Bound::Unbounded,
        };

        let index = self.index.read().await;
        let messages = index
            .range((Bound::Unbounded, upper))
            .rev()
            .filter_map(|(_, id)| self.records.get(&MessageId(*id)).map(|e| e.value().clone()))
            .filter(|message| filter.matches(message))
            .take(limit)
            .collect();

        Ok(messages)
    }
}
