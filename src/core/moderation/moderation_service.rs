// Moderation engine - applies moderator actions to messages and records them.
//
// This service handles:
// - Soft deletes (Visible -> Deleted, one way, idempotent)
// - Approvals of visible messages
// - Recording feed configuration changes
//
// Every accepted action is mutate-then-log: the store change is never rolled
// back when the audit append fails. The AuditRecorder retries and parks the
// entry instead, and the action is still reported as a success.

use super::moderation_models::{DeleteOutcome, FEED_CONFIG_TARGET};
use crate::core::audit::{
    AuditAction, AuditLog, AuditRecorder, AuditStatus, NewAuditRecord, RetryReport,
};
use crate::core::auth::Principal;
use crate::core::errors::{surface_store_error, FeedError};
use crate::core::feed::{FeedConfig, MessageId, MessageStatus, MessageStore};
use std::sync::Arc;

pub struct ModerationEngine<S: MessageStore, A: AuditLog> {
    store: S,
    recorder: Arc<AuditRecorder<A>>,
}

impl<S: MessageStore, A: AuditLog> ModerationEngine<S, A> {
    pub fn new(store: S, recorder: Arc<AuditRecorder<A>>) -> Self {
        Self { store, recorder }
    }

    fn authorize(principal: &Principal, operation: &str) -> Result<(), FeedError> {
        if principal.can_moderate() {
            return Ok(());
        }
        tracing::warn!(
            identity = %principal.identity,
            operation,
            "Moderation action refused: principal is not an admin"
        );
        Err(FeedError::Unauthorized)
    }

    /// Soft-delete a message.
    ///
    /// Deleting an already deleted message succeeds without touching the store
    /// or the audit trail, so retries are safe. Two moderators racing on the same
    /// message both succeed and may both leave an audit entry.
    pub async fn delete(
        &self,
        message_id: MessageId,
        principal: &Principal,
    ) -> Result<DeleteOutcome, FeedError> {
        Self::authorize(principal, "delete")?;

        let message = self
            .store
            .get_by_id(message_id)
            .await
            .map_err(|e| surface_store_error(e, "delete"))?;
        if message.status.is_terminal() {
            tracing::info!(
                message_id = %message_id,
                moderator = %principal.identity,
                "Message already deleted"
            );
            return Ok(DeleteOutcome::AlreadyDeleted { message_id });
        }

        self.store
            .update_status(message_id, MessageStatus::Deleted)
            .await
            .map_err(|e| surface_store_error(e, "delete"))?;

        tracing::info!(
            message_id = %message_id,
            moderator = %principal.identity,
            "Message deleted"
        );

        let record = NewAuditRecord::new(
            principal.identity.clone(),
            AuditAction::MessageDeleted,
            message_id.to_string(),
        )
        .with_detail(serde_json::json!({
            "author_name": message.author_name,
            "previous_status": message.status,
        }));
        let audit = self.recorder.record(record).await;

        Ok(DeleteOutcome::Deleted { message_id, audit })
    }

    /// Mark a visible message as reviewed. Deleted messages cannot be approved.
    pub async fn approve(
        &self,
        message_id: MessageId,
        principal: &Principal,
    ) -> Result<AuditStatus, FeedError> {
        Self::authorize(principal, "approve")?;

        let message = self
            .store
            .get_by_id(message_id)
            .await
            .map_err(|e| surface_store_error(e, "approve"))?;
        if message.status.is_terminal() {
            return Err(FeedError::InvalidInput(format!(
                "Message {} is deleted and cannot be approved",
                message_id
            )));
        }

        tracing::info!(
            message_id = %message_id,
            moderator = %principal.identity,
            "Message approved"
        );

        let record = NewAuditRecord::new(
            principal.identity.clone(),
            AuditAction::MessageApproved,
            message_id.to_string(),
        );
        Ok(self.recorder.record(record).await)
    }

    /// Record a feed configuration change that has already been applied.
    pub async fn record_config_change(
        &self,
        principal: &Principal,
        before: &FeedConfig,
        after: &FeedConfig,
    ) -> Result<AuditStatus, FeedError> {
        Self::authorize(principal, "update_feed_config")?;

        let record = NewAuditRecord::new(
            principal.identity.clone(),
            AuditAction::ConfigChanged,
            FEED_CONFIG_TARGET,
        )
        .with_detail(serde_json::json!({ "before": before, "after": after }));
        Ok(self.recorder.record(record).await)
    }

    /// Re-append every parked audit record once.
    pub async fn retry_pending_audits(&self) -> RetryReport {
        self.recorder.retry_pending().await
    }

    pub async fn pending_audit_count(&self) -> usize {
        self.recorder.pending_count().await
    }

    pub fn recorder(&self) -> &Arc<AuditRecorder<A>> {
        &self.recorder
    }
}

// ============================================================================
// TESTS
// ============================================================================
