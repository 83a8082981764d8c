use super::feed_models::{Message, MessageFilter, MessageId, MessageStatus, NewMessage};
use crate::core::errors::StoreError;
use crate::core::pagination::Cursor;
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence boundary for feed messages.
///
/// No business validation lives behind this trait. Implementations assign ids
/// (and timestamps when the caller left them empty), keep listings ordered by
/// `created_at desc, id desc`, and classify failures as transient or permanent.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message with status `Visible`.
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError>;

    async fn get_by_id(&self, id: MessageId) -> Result<Message, StoreError>;

    async fn update_status(&self, id: MessageId, status: MessageStatus) -> Result<(), StoreError>;

    /// Newest first. `before` excludes everything at or ahead of the cursor.
    async fn list(
        &self,
        filter: MessageFilter,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<Vec<Message>, StoreError>;
}

// Services share one store, so let an Arc stand in for the store itself.
#[async_trait]
impl<T: MessageStore + ?Sized> MessageStore for Arc<T> {
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError> {
        (**self).insert(message).await
    }

    async fn get_by_id(&self, id: MessageId) -> Result<Message, StoreError> {
        (**self).get_by_id(id).await
    }

    async fn update_status(&self, id: MessageId, status: MessageStatus) -> Result<(), StoreError> {
        (**self).update_status(id, status).await
    }

    async fn list(
        &self,
        filter: MessageFilter,
        limit: usize,
        before: Option<Cursor>,
    ) -> Result<Vec<Message>, StoreError> {
        (**self).list(filter, limit, before).await
    }
}
