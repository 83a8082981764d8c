// Chat feed service - submission and read-back for the public feed.
//
// This service handles:
// - Sanitizing and validating submissions
// - Writing accepted messages through the MessageStore
// - Newest-first listings for the public and moderator views
//
// Authorization for the moderator view is enforced one layer up, by
// ModerationApi. This service only knows about messages.

use super::feed_models::{FeedConfig, Message, MessageFilter, MessagePage, NewMessage};
use super::message_store::MessageStore;
use crate::core::errors::{surface_store_error, FeedError};
use crate::core::pagination::{clamp_limit, Cursor};
use tokio::sync::RwLock;

/// Display name used when a visitor leaves the name field blank.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Drop control characters, keeping line breaks and tabs.
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

pub struct ChatFeedService<S: MessageStore> {
    store: S,
    config: RwLock<FeedConfig>,
}

impl<S: MessageStore> ChatFeedService<S> {
    /// Create a feed service with default limits.
    pub fn new(store: S) -> Self {
        Self::new_with_config(store, FeedConfig::default())
    }

    pub fn new_with_config(store: S, config: FeedConfig) -> Self {
        Self {
            store,
            config: RwLock::new(config),
        }
    }

    /// Post a message to the feed.
    ///
    /// The body is sanitized and trimmed, then must be non-empty and within
    /// `max_body_len` characters. A blank author name becomes `"Anonymous"`.
    /// Nothing is written when validation fails.
    pub async fn submit(
        &self,
        author_name: &str,
        author_identity: Option<&str>,
        body: &str,
    ) -> Result<Message, FeedError> {
        let config = self.config().await;

        let body = sanitize(body);
        let body = body.trim();
        if body.is_empty() {
            return Err(FeedError::InvalidInput(
                "Message body cannot be empty".to_string(),
            ));
        }
        let body_len = body.chars().count();
        if body_len > config.max_body_len {
            return Err(FeedError::InvalidInput(format!(
                "Message body is {} characters long; the limit is {}",
                body_len, config.max_body_len
            )));
        }

        let author = sanitize(author_name);
        let author = match author.trim() {
            "" => ANONYMOUS_AUTHOR,
            trimmed => trimmed,
        };
        if author.chars().count() > config.max_author_len {
            return Err(FeedError::InvalidInput(format!(
                "Author name is longer than {} characters",
                config.max_author_len
            )));
        }

        let author_identity = author_identity
            .map(str::trim)
            .filter(|identity| !identity.is_empty())
            .map(str::to_string);

        let message = self
            .store
            .insert(NewMessage {
                author_name: author.to_string(),
                author_identity,
                body: body.to_string(),
                created_at: None,
            })
            .await
            .map_err(|e| surface_store_error(e, "submit"))?;

        tracing::info!(
            message_id = %message.id,
            author = %message.author_name,
            anonymous = message.author_identity.is_none(),
            "Message submitted"
        );

        Ok(message)
    }

    /// Visible messages, newest first, at most `limit` (capped by `max_page_size`).
    pub async fn list_public(&self, limit: usize) -> Result<Vec<Message>, FeedError> {
        Ok(self.list_public_page(limit, None).await?.messages)
    }

    /// Every message regardless of status, same ordering as the public view.
    pub async fn list_for_moderation(&self, limit: usize) -> Result<Vec<Message>, FeedError> {
        Ok(self.list_for_moderation_page(limit, None).await?.messages)
    }

    pub async fn list_public_page(
        &self,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<MessagePage, FeedError> {
        self.list_page(MessageFilter::VisibleOnly, limit, before)
            .await
    }

    pub async fn list_for_moderation_page(
        &self,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<MessagePage, FeedError> {
        self.list_page(MessageFilter::All, limit, before).await
    }

    async fn list_page(
        &self,
        filter: MessageFilter,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<MessagePage, FeedError> {
        let max = self.config.read().await.max_page_size;
        let limit = clamp_limit(limit, max);
        if limit == 0 {
            return Ok(MessagePage::default());
        }

        // Fetch one extra to know whether a next page exists.
        let mut messages = self
            .store
            .list(filter, limit.saturating_add(1), before)
            .await
            .map_err(|e| surface_store_error(e, "list_messages"))?;
        let has_more = messages.len() > limit;
        messages.truncate(limit);

        let next_cursor = if has_more {
            messages.last().map(Message::cursor)
        } else {
            None
        };

        Ok(MessagePage {
            messages,
            next_cursor,
        })
    }

    /// Current limits.
    pub async fn config(&self) -> FeedConfig {
        self.config.read().await.clone()
    }

    /// Swap in new limits, returning the previous ones.
    pub async fn replace_config(&self, config: FeedConfig) -> Result<FeedConfig, FeedError> {
        config.validate()?;
        let mut current = self.config.write().await;
        let previous = std::mem::replace(&mut *current, config);
        tracing::info!(
            max_body_len = current.max_body_len,
            max_author_len = current.max_author_len,
            max_page_size = current.max_page_size,
            "Feed limits updated"
        );
        Ok(previous)
    }
}

// ============================================================================
// TESTS
// ============================================================================
