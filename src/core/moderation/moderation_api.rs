// Moderation API surface - the authorization-enforcing facade for moderators.
//
// Every operation resolves the calling principal first and refuses anonymous
// or non-admin callers before any service is touched. If the feed is ever
// served over the network, each method here maps to one request handler.

use crate::core::audit::{AuditLog, AuditPage, AuditRecorder, AuditStatus};
use crate::core::auth::{Principal, PrincipalResolver, RequestContext};
use crate::core::errors::FeedError;
use crate::core::feed::{ChatFeedService, FeedConfig, Message, MessageId, MessagePage, MessageStore};
use crate::core::moderation::{DeleteOutcome, ModerationEngine};
use crate::core::pagination::Cursor;
use std::sync::Arc;

pub struct ModerationApi<S, A, R>
where
    S: MessageStore,
    A: AuditLog,
    R: PrincipalResolver,
{
    feed: Arc<ChatFeedService<S>>,
    engine: Arc<ModerationEngine<S, A>>,
    recorder: Arc<AuditRecorder<A>>,
    resolver: R,
}

impl<S, A, R> ModerationApi<S, A, R>
where
    S: MessageStore,
    A: AuditLog,
    R: PrincipalResolver,
{
    pub fn new(
        feed: Arc<ChatFeedService<S>>,
        engine: Arc<ModerationEngine<S, A>>,
        resolver: R,
    ) -> Self {
        let recorder = Arc::clone(engine.recorder());
        Self {
            feed,
            engine,
            recorder,
            resolver,
        }
    }

    async fn authorize(
        &self,
        request: &RequestContext,
        operation: &'static str,
    ) -> Result<Principal, FeedError> {
        match self.resolver.current_principal(request).await {
            Some(principal) if principal.can_moderate() => Ok(principal),
            Some(principal) => {
                tracing::warn!(
                    identity = %principal.identity,
                    operation,
                    "Moderation request denied: not an admin"
                );
                Err(FeedError::Unauthorized)
            }
            None => {
                tracing::warn!(operation, "Moderation request denied: not authenticated");
                Err(FeedError::Unauthorized)
            }
        }
    }

    /// All messages, deleted ones included, newest first.
    pub async fn list_for_moderation(
        &self,
        request: &RequestContext,
        limit: usize,
    ) -> Result<Vec<Message>, FeedError> {
        self.authorize(request, "list_for_moderation").await?;
        self.feed.list_for_moderation(limit).await
    }

    pub async fn list_for_moderation_page(
        &self,
        request: &RequestContext,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<MessagePage, FeedError> {
        self.authorize(request, "list_for_moderation").await?;
        self.feed.list_for_moderation_page(limit, before).await
    }

    pub async fn delete(
        &self,
        request: &RequestContext,
        message_id: MessageId,
    ) -> Result<DeleteOutcome, FeedError> {
        let principal = self.authorize(request, "delete").await?;
        self.engine.delete(message_id, &principal).await
    }

    pub async fn approve(
        &self,
        request: &RequestContext,
        message_id: MessageId,
    ) -> Result<AuditStatus, FeedError> {
        let principal = self.authorize(request, "approve").await?;
        self.engine.approve(message_id, &principal).await
    }

    /// Newest-first page of the audit trail.
    pub async fn list_audit(
        &self,
        request: &RequestContext,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<AuditPage, FeedError> {
        self.authorize(request, "list_audit").await?;
        self.recorder.list_page(limit, before).await
    }

    /// Replace the feed limits and record the change.
    pub async fn update_feed_config(
        &self,
        request: &RequestContext,
        config: FeedConfig,
    ) -> Result<AuditStatus, FeedError> {
        let principal = self.authorize(request, "update_feed_config").await?;
        let previous = self.feed.replace_config(config.clone()).await?;
        self.recorder.set_max_page_size(config.max_page_size);
        self.engine
            .record_config_change(&principal, &previous, &config)
            .await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::AuditAction;
    use crate::core::auth::RolePolicy;
    use crate::core::feed::MessageStatus;
    use crate::infra::audit::InMemoryAuditLog;
    use crate::infra::auth::RolePrincipalResolver;
    use crate::infra::feed::InMemoryMessageStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Api = ModerationApi<Arc<InMemoryMessageStore>, InMemoryAuditLog, RolePrincipalResolver>;

    const ADMIN: &str = "owner@example.com";

    fn setup() -> (Arc<ChatFeedService<Arc<InMemoryMessageStore>>>, Api) {
        let store = Arc::new(InMemoryMessageStore::new());
        let recorder = Arc::new(AuditRecorder::new(InMemoryAuditLog::new()));
        let feed = Arc::new(ChatFeedService::new(Arc::clone(&store)));
        let engine = Arc::new(ModerationEngine::new(store, recorder));
        let resolver = RolePrincipalResolver::new(RolePolicy::from_admins([ADMIN]));
        let api = ModerationApi::new(Arc::clone(&feed), engine, resolver);
        (feed, api)
    }

    #[tokio::test]
    async fn test_end_to_end_moderation_scenario() {
        let (feed, api) = setup();
        let admin = RequestContext::with_subject(ADMIN);

        let message = feed.submit("Alice", None, "Great site!").await.unwrap();
        assert_eq!(message.status, MessageStatus::Visible);
        assert!(feed
            .list_public(10)
            .await
            .unwrap()
            .iter()
            .any(|m| m.id == message.id));

        let outcome = api.delete(&admin, message.id).await.unwrap();
        assert!(outcome.audit().unwrap().is_recorded());

        assert!(!feed
            .list_public(10)
            .await
            .unwrap()
            .iter()
            .any(|m| m.id == message.id));

        let moderated = api.list_for_moderation(&admin, 10).await.unwrap();
        let entry = moderated.iter().find(|m| m.id == message.id).unwrap();
        assert_eq!(entry.status, MessageStatus::Deleted);

        let audit = api.list_audit(&admin, 10, None).await.unwrap();
        assert_eq!(audit.records.len(), 1);
        let record = &audit.records[0];
        assert_eq!(record.action, AuditAction::MessageDeleted);
        assert_eq!(record.target, message.id.to_string());
        assert_eq!(record.actor, ADMIN);
    }

    #[tokio::test]
    async fn test_every_operation_requires_an_admin() {
        let (feed, api) = setup();
        let message = feed.submit("Alice", None, "hello").await.unwrap();

        for request in [
            RequestContext::anonymous(),
            RequestContext::with_subject("visitor@example.com"),
        ] {
            assert_eq!(
                api.list_for_moderation(&request, 10).await,
                Err(FeedError::Unauthorized)
            );
            assert_eq!(
                api.delete(&request, message.id).await,
                Err(FeedError::Unauthorized)
            );
            assert_eq!(
                api.approve(&request, message.id).await,
                Err(FeedError::Unauthorized)
            );
            assert!(matches!(
                api.list_audit(&request, 10, None).await,
                Err(FeedError::Unauthorized)
            ));
            assert_eq!(
                api.update_feed_config(&request, FeedConfig::default()).await,
                Err(FeedError::Unauthorized)
            );
        }

        let public = feed.list_public(10).await.unwrap();
        assert_eq!(public[0].status, MessageStatus::Visible);
    }

    #[tokio::test]
    async fn test_config_update_applies_and_is_audited() {
        let (feed, api) = setup();
        let admin = RequestContext::with_subject(ADMIN);

        let status = api
            .update_feed_config(
                &admin,
                FeedConfig {
                    max_body_len: 10,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(status.is_recorded());

        let result = feed.submit("Alice", None, "this is far too long").await;
        assert!(matches!(result, Err(FeedError::InvalidInput(_))));

        let audit = api.list_audit(&admin, 10, None).await.unwrap();
        assert_eq!(audit.records[0].action, AuditAction::ConfigChanged);
        assert_eq!(audit.records[0].actor, ADMIN);
    }

    #[tokio::test]
    async fn test_page_size_update_also_caps_audit_reads() {
        let (feed, api) = setup();
        let admin = RequestContext::with_subject(ADMIN);

        let first = feed.submit("Alice", None, "one").await.unwrap();
        let second = feed.submit("Bob", None, "two").await.unwrap();
        api.delete(&admin, first.id).await.unwrap();
        api.delete(&admin, second.id).await.unwrap();

        api.update_feed_config(
            &admin,
            FeedConfig {
                max_page_size: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let audit = api.list_audit(&admin, 10, None).await.unwrap();
        assert_eq!(audit.records.len(), 2);
        assert!(audit.next_cursor.is_some());
        assert_eq!(feed.list_for_moderation(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_without_audit() {
        let (feed, api) = setup();
        let admin = RequestContext::with_subject(ADMIN);

        let result = api
            .update_feed_config(
                &admin,
                FeedConfig {
                    max_body_len: 0,
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(FeedError::InvalidInput(_))));
        assert_eq!(feed.config().await, FeedConfig::default());
        assert!(api
            .list_audit(&admin, 10, None)
            .await
            .unwrap()
            .records
            .is_empty());
    }

    /// Counts how often the store is touched; used to prove denials short-circuit.
    struct CountingStore {
        inner: InMemoryMessageStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MessageStore for CountingStore {
        async fn insert(
            &self,
            message: crate::core::feed::NewMessage,
        ) -> Result<Message, crate::core::errors::StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.insert(message).await
        }

        async fn get_by_id(
            &self,
            id: MessageId,
        ) -> Result<Message, crate::core::errors::StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_by_id(id).await
        }

        async fn update_status(
            &self,
            id: MessageId,
            status: MessageStatus,
        ) -> Result<(), crate::core::errors::StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.update_status(id, status).await
        }

        async fn list(
            &self,
            filter: crate::core::feed::MessageFilter,
            limit: usize,
            before: Option<Cursor>,
        ) -> Result<Vec<Message>, crate::core::errors::StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list(filter, limit, before).await
        }
    }

    #[tokio::test]
    async fn test_denied_requests_never_reach_the_store() {
        let store = Arc::new(CountingStore {
            inner: InMemoryMessageStore::new(),
            calls: AtomicUsize::new(0),
        });
        let recorder = Arc::new(AuditRecorder::new(InMemoryAuditLog::new()));
        let feed = Arc::new(ChatFeedService::new(Arc::clone(&store)));
        let engine = Arc::new(ModerationEngine::new(Arc::clone(&store), recorder));
        let api = ModerationApi::new(
            feed,
            engine,
            RolePrincipalResolver::new(RolePolicy::from_admins([ADMIN])),
        );

        let visitor = RequestContext::with_subject("visitor@example.com");
        let _ = api.delete(&visitor, MessageId(1)).await;
        let _ = api.list_for_moderation(&visitor, 10).await;

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }
}
