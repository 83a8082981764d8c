// Audit recorder - the append-only trail of moderation actions.
//
// This service handles:
// - Validating and appending audit records
// - Retrying appends that fail transiently, then parking them in an outbox
// - Newest-first, cursor-paginated reads
//
// The AuditLog port has no update or delete methods. The outbox lives in
// process memory: parked records are delivered at least once while the
// process runs and are lost if it exits before they are flushed.

use super::audit_models::{
    AuditPage, AuditRecord, AuditStatus, NewAuditRecord, RetryPolicy, RetryReport,
};
use crate::core::errors::{surface_store_error, FeedError, StoreError};
use crate::core::pagination::{clamp_limit, Cursor, DEFAULT_MAX_PAGE_SIZE};
use async_trait::async_trait;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Parked records kept before new failures are dropped.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 10_000;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Append-only persistence for audit records.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Write a record and return it with its store-assigned id.
    async fn append(&self, record: NewAuditRecord) -> Result<AuditRecord, StoreError>;

    /// Newest first, ordered by `recorded_at desc, id desc`.
    async fn list(
        &self,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<Vec<AuditRecord>, StoreError>;
}

#[async_trait]
impl<T: AuditLog + ?Sized> AuditLog for Arc<T> {
    async fn append(&self, record: NewAuditRecord) -> Result<AuditRecord, StoreError> {
        (**self).append(record).await
    }

    async fn list(
        &self,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<Vec<AuditRecord>, StoreError> {
        (**self).list(limit, before).await
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct AuditRecorder<A: AuditLog> {
    log: A,
    retry: RetryPolicy,
    // Follows FeedConfig::max_page_size, see set_max_page_size.
    max_page_size: AtomicUsize,
    // Records whose append failed transiently, oldest first.
    outbox: Mutex<VecDeque<NewAuditRecord>>,
    outbox_capacity: usize,
}

impl<A: AuditLog> AuditRecorder<A> {
    pub fn new(log: A) -> Self {
        Self::new_with_policy(log, RetryPolicy::default())
    }

    pub fn new_with_policy(log: A, retry: RetryPolicy) -> Self {
        Self {
            log,
            retry,
            max_page_size: AtomicUsize::new(DEFAULT_MAX_PAGE_SIZE),
            outbox: Mutex::new(VecDeque::new()),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }

    pub fn with_max_page_size(self, max_page_size: usize) -> Self {
        self.set_max_page_size(max_page_size);
        self
    }

    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity;
        self
    }

    /// Change the page cap for audit reads; applied to the next `list_page`.
    pub fn set_max_page_size(&self, max_page_size: usize) {
        self.max_page_size.store(max_page_size.max(1), Ordering::Relaxed);
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size.load(Ordering::Relaxed)
    }

    pub fn log(&self) -> &A {
        &self.log
    }

    fn validate(record: &NewAuditRecord) -> Result<(), FeedError> {
        if record.actor.trim().is_empty() {
            return Err(FeedError::InvalidInput(
                "Audit records need an actor".to_string(),
            ));
        }
        if record.target.trim().is_empty() {
            return Err(FeedError::InvalidInput(
                "Audit records need a target".to_string(),
            ));
        }
        Ok(())
    }

    /// Append one record, once. Failures go straight back to the caller.
    pub async fn append(&self, record: NewAuditRecord) -> Result<AuditRecord, FeedError> {
        Self::validate(&record)?;
        self.log
            .append(record)
            .await
            .map_err(|e| surface_store_error(e, "append_audit"))
    }

    /// Append the audit entry for an action that already took effect.
    ///
    /// Never fails: transient errors are retried per the policy and then parked
    /// in the outbox for `retry_pending`; permanent errors are logged and
    /// reported as `AuditStatus::Failed`.
    pub async fn record(&self, record: NewAuditRecord) -> AuditStatus {
        if let Err(e) = Self::validate(&record) {
            tracing::error!(
                action = %record.action,
                target = %record.target,
                error = %e,
                "Dropping invalid audit record"
            );
            return AuditStatus::Failed(e.to_string());
        }

        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.log.append(record.clone()).await {
                Ok(stored) => {
                    tracing::debug!(
                        audit_id = %stored.id,
                        action = %stored.action,
                        target = %stored.target,
                        attempt,
                        "Audit record appended"
                    );
                    return AuditStatus::Recorded(stored.id);
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.jittered_backoff(attempt);
                    tracing::warn!(
                        action = %record.action,
                        target = %record.target,
                        attempt,
                        error = %e,
                        "Audit append failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    let mut outbox = self.outbox.lock().await;
                    if outbox.len() >= self.outbox_capacity {
                        tracing::error!(
                            actor = %record.actor,
                            action = %record.action,
                            target = %record.target,
                            error = %e,
                            parked = outbox.len(),
                            "Audit outbox full; audit entry lost"
                        );
                        return AuditStatus::Failed("audit outbox full".to_string());
                    }
                    tracing::error!(
                        actor = %record.actor,
                        action = %record.action,
                        target = %record.target,
                        error = %e,
                        "Audit append failed after {} attempts; parked for retry",
                        attempts
                    );
                    outbox.push_back(record);
                    return AuditStatus::Pending;
                }
                Err(e) => {
                    tracing::error!(
                        actor = %record.actor,
                        action = %record.action,
                        target = %record.target,
                        error = %e,
                        "Audit append failed permanently; audit entry lost"
                    );
                    return AuditStatus::Failed(e.to_string());
                }
            }
        }
    }

    fn jittered_backoff(&self, retry: u32) -> Duration {
        let base = self.retry.backoff(retry);
        let max_jitter = (self.retry.base_delay.as_millis() / 2) as u64;
        let jitter = rand::thread_rng().gen_range(0..=max_jitter);
        base + Duration::from_millis(jitter)
    }

    /// Try every parked record once. Transient failures go back in the outbox.
    pub async fn retry_pending(&self) -> RetryReport {
        let parked: Vec<NewAuditRecord> = self.outbox.lock().await.drain(..).collect();
        let mut report = RetryReport::default();
        let mut still_pending = Vec::new();

        for record in parked {
            match self.log.append(record.clone()).await {
                Ok(stored) => {
                    tracing::info!(
                        audit_id = %stored.id,
                        action = %stored.action,
                        target = %stored.target,
                        "Parked audit record appended"
                    );
                    report.recorded += 1;
                }
                Err(e) if e.is_transient() => {
                    still_pending.push(record);
                }
                Err(e) => {
                    tracing::error!(
                        actor = %record.actor,
                        action = %record.action,
                        target = %record.target,
                        error = %e,
                        "Parked audit record failed permanently; audit entry lost"
                    );
                    report.dropped += 1;
                }
            }
        }

        report.still_pending = still_pending.len();
        if !still_pending.is_empty() {
            let mut outbox = self.outbox.lock().await;
            // Keep the older records ahead of anything parked meanwhile.
            for record in still_pending.into_iter().rev() {
                outbox.push_front(record);
            }
        }

        report
    }

    pub async fn pending_count(&self) -> usize {
        self.outbox.lock().await.len()
    }

    /// Newest-first page of the trail.
    pub async fn list_page(
        &self,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<AuditPage, FeedError> {
        let limit = clamp_limit(limit, self.max_page_size());
        if limit == 0 {
            return Ok(AuditPage::default());
        }

        let mut records = self
            .log
            .list(limit.saturating_add(1), before)
            .await
            .map_err(|e| surface_store_error(e, "list_audit"))?;
        let has_more = records.len() > limit;
        records.truncate(limit);
        let next_cursor = if has_more {
            records.last().map(AuditRecord::cursor)
        } else {
            None
        };

        Ok(AuditPage {
            records,
            next_cursor,
        })
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<AuditRecord>, FeedError> {
        Ok(self.list_page(limit, None).await?.records)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::AuditAction;
    use crate::infra::audit::InMemoryAuditLog;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` appends with the given error, then delegates.
    struct FlakyAuditLog {
        inner: InMemoryAuditLog,
        failures: AtomicU32,
        error: StoreError,
    }

    impl FlakyAuditLog {
        fn new(failures: u32, error: StoreError) -> Self {
            Self {
                inner: InMemoryAuditLog::new(),
                failures: AtomicU32::new(failures),
                error,
            }
        }
    }

    #[async_trait]
    impl AuditLog for FlakyAuditLog {
        async fn append(&self, record: NewAuditRecord) -> Result<AuditRecord, StoreError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(self.error.clone());
            }
            self.inner.append(record).await
        }

        async fn list(
            &self,
            limit: usize,
            before: Option<Cursor>,
        ) -> Result<Vec<AuditRecord>, StoreError> {
            self.inner.list(limit, before).await
        }
    }

    fn deleted(target: &str) -> NewAuditRecord {
        NewAuditRecord::new("admin@example.com", AuditAction::MessageDeleted, target)
    }

    #[tokio::test]
    async fn test_record_appends_once() {
        let recorder = AuditRecorder::new(InMemoryAuditLog::new());

        let status = recorder.record(deleted("1")).await;
        assert!(status.is_recorded());

        let records = recorder.list(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].actor, "admin@example.com");
        assert_eq!(records[0].action, AuditAction::MessageDeleted);
        assert_eq!(records[0].target, "1");
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_inline() {
        let log = FlakyAuditLog::new(2, StoreError::Transient("busy".into()));
        let recorder = AuditRecorder::new_with_policy(log, RetryPolicy::no_delay(3));

        assert!(recorder.record(deleted("7")).await.is_recorded());
        assert_eq!(recorder.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_park_then_flush() {
        let log = FlakyAuditLog::new(3, StoreError::Transient("busy".into()));
        let recorder = AuditRecorder::new_with_policy(log, RetryPolicy::no_delay(2));

        assert_eq!(recorder.record(deleted("7")).await, AuditStatus::Pending);
        assert_eq!(recorder.pending_count().await, 1);
        assert!(recorder.list(10).await.unwrap().is_empty());

        // Third failure is consumed here; record stays parked
        let report = recorder.retry_pending().await;
        assert_eq!(report.still_pending, 1);
        assert_eq!(report.recorded, 0);

        let report = recorder.retry_pending().await;
        assert_eq!(report.recorded, 1);
        assert_eq!(recorder.pending_count().await, 0);

        let records = recorder.list(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, "7");
    }

    #[tokio::test]
    async fn test_full_outbox_drops_new_failures() {
        let log = FlakyAuditLog::new(u32::MAX, StoreError::Transient("down".into()));
        let recorder =
            AuditRecorder::new_with_policy(log, RetryPolicy::no_delay(1)).with_outbox_capacity(1);

        assert_eq!(recorder.record(deleted("1")).await, AuditStatus::Pending);
        let status = recorder.record(deleted("2")).await;
        assert!(matches!(status, AuditStatus::Failed(_)));
        assert_eq!(recorder.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_page_cap_can_change_at_runtime() {
        let recorder = AuditRecorder::new(InMemoryAuditLog::new());
        for target in ["1", "2", "3"] {
            recorder.append(deleted(target)).await.unwrap();
        }
        assert_eq!(recorder.list(10).await.unwrap().len(), 3);

        recorder.set_max_page_size(2);
        assert_eq!(recorder.max_page_size(), 2);
        assert_eq!(recorder.list(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let log = FlakyAuditLog::new(1, StoreError::Permanent("constraint".into()));
        let recorder = AuditRecorder::new_with_policy(log, RetryPolicy::no_delay(5));

        let status = recorder.record(deleted("7")).await;
        assert!(matches!(status, AuditStatus::Failed(_)));
        assert_eq!(recorder.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_append_rejects_missing_actor() {
        let recorder = AuditRecorder::new(InMemoryAuditLog::new());

        let result = recorder
            .append(NewAuditRecord::new("  ", AuditAction::MessageDeleted, "1"))
            .await;
        assert!(matches!(result, Err(FeedError::InvalidInput(_))));
        assert!(recorder.list(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pages_are_newest_first() {
        let recorder = AuditRecorder::new(InMemoryAuditLog::new()).with_max_page_size(2);
        for target in ["1", "2", "3"] {
            recorder.append(deleted(target)).await.unwrap();
        }

        let first = recorder.list_page(10, None).await.unwrap();
        let targets: Vec<_> = first.records.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["3", "2"]);

        let second = recorder.list_page(10, first.next_cursor).await.unwrap();
        assert_eq!(second.records.len(), 1);
        assert_eq!(second.records[0].target, "1");
        assert!(second.next_cursor.is_none());
    }
}
