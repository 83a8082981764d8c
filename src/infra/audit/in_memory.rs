// In-memory implementation of AuditLog.
//
// Append-only by construction: the map is only ever inserted into.

use crate::core::audit::{AuditLog, AuditRecord, AuditRecordId, NewAuditRecord};
use crate::core::errors::StoreError;
use crate::core::pagination::Cursor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

pub struct InMemoryAuditLog {
    /// Keyed by (recorded_at, id) so reads walk it newest first.
    records: RwLock<BTreeMap<(DateTime<Utc>, u64), AuditRecord>>,
    next_id: AtomicU64,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, record: NewAuditRecord) -> Result<AuditRecord, StoreError> {
        if record.actor.trim().is_empty() {
            return Err(StoreError::Permanent(
                "audit record has no actor".to_string(),
            ));
        }

        let id = AuditRecordId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let stored = AuditRecord::from_new(id, record);
        self.records
            .write()
            .await
            .insert(stored.cursor().key(), stored.clone());
        Ok(stored)
    }

    async fn list(
        &self,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        let upper = match before {
            Some(cursor) => Bound::Excluded(cursor.key()),
            None => Bound::Unbounded,
        };

        let records = self.records.read().await;
        Ok(records
            .range((Bound::Unbounded, upper))
            .rev()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }
}
