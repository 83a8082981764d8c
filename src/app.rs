// Application wiring - the services a presentation layer needs, built once
// from AppConfig and shared behind Arcs.

use crate::config::AppConfig;
use crate::core::audit::AuditRecorder;
use crate::core::auth::PrincipalResolver;
use crate::core::feed::ChatFeedService;
use crate::core::moderation::{ModerationApi, ModerationEngine};
use crate::infra::audit::SqliteAuditLog;
use crate::infra::auth::{JwtPrincipalResolver, RolePrincipalResolver};
use crate::infra::feed::SqliteMessageStore;
use crate::infra::sqlite_support::connect;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub type MessageBackend = Arc<SqliteMessageStore>;
pub type AuditBackend = SqliteAuditLog;
pub type FeedService = ChatFeedService<MessageBackend>;
pub type Engine = ModerationEngine<MessageBackend, AuditBackend>;
pub type ModerationSurface = ModerationApi<MessageBackend, AuditBackend, Box<dyn PrincipalResolver>>;

/// Shared state handed to whatever serves the feed.
pub struct FeedApp {
    pub feed: Arc<FeedService>,
    pub engine: Arc<Engine>,
    pub moderation: Arc<ModerationSurface>,
}

impl FeedApp {
    /// Open the database, run migrations and wire every service.
    pub async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        // Messages and audit records live in the same database file.
        let pool = connect(&config.database_url).await?;

        let messages = SqliteMessageStore::new(pool.clone());
        messages
            .migrate()
            .await
            .context("failed to migrate feed_messages")?;
        let audit = SqliteAuditLog::new(pool);
        audit
            .migrate()
            .await
            .context("failed to migrate audit_records")?;

        let messages = Arc::new(messages);
        let recorder = Arc::new(
            AuditRecorder::new_with_policy(audit, config.audit_retry.clone())
                .with_max_page_size(config.feed.max_page_size)
                .with_outbox_capacity(config.audit_outbox_capacity),
        );

        let feed = Arc::new(ChatFeedService::new_with_config(
            Arc::clone(&messages),
            config.feed.clone(),
        ));
        let engine = Arc::new(ModerationEngine::new(messages, recorder));

        let resolver: Box<dyn PrincipalResolver> = match &config.jwt_secret {
            Some(secret) => {
                tracing::info!("Moderators authenticate with bearer tokens");
                Box::new(JwtPrincipalResolver::new(
                    secret.as_bytes(),
                    config.admins.clone(),
                ))
            }
            None => Box::new(RolePrincipalResolver::new(config.admins.clone())),
        };
        let moderation = Arc::new(ModerationApi::new(
            Arc::clone(&feed),
            Arc::clone(&engine),
            resolver,
        ));

        tracing::info!(
            database = %config.database_url,
            admins = config.admins.admin_count(),
            "Feed services ready"
        );

        Ok(Self {
            feed,
            engine,
            moderation,
        })
    }

    /// Background task that drains the audit outbox every `interval`.
    pub fn spawn_audit_retry_worker(&self, interval: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                flush_pending_audits(&engine).await;
            }
        })
    }

    /// One pass over the outbox, e.g. right before shutdown.
    pub async fn flush_pending_audits(&self) {
        flush_pending_audits(&self.engine).await;
    }
}

async fn flush_pending_audits(engine: &Engine) {
    if engine.pending_audit_count().await == 0 {
        tracing::debug!("Audit outbox empty");
        return;
    }

    let report = engine.retry_pending_audits().await;
    if report.still_pending > 0 || report.dropped > 0 {
        tracing::warn!(
            recorded = report.recorded,
            still_pending = report.still_pending,
            dropped = report.dropped,
            "Audit outbox not fully drained"
        );
    } else {
        tracing::info!(recorded = report.recorded, "Audit outbox drained");
    }
}
