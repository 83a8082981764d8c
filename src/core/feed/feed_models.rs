// Feed domain models - messages, their lifecycle and listing types.
//
// Pure domain types. Stores and the presentation layer convert to and from
// these; nothing here knows about SQL or HTTP.

use crate::core::errors::FeedError;
use crate::core::pagination::{Cursor, DEFAULT_MAX_PAGE_SIZE, PAGE_SIZE_CEILING};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned message identifier. Never changes once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(MessageId)
            .map_err(|_| FeedError::InvalidInput(format!("'{}' is not a message id", s)))
    }
}

/// Moderation status of a message.
///
/// `Visible -> Deleted` is the only transition. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Visible,
    Deleted,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Visible => "visible",
            MessageStatus::Deleted => "deleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Deleted)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visible" => Ok(MessageStatus::Visible),
            "deleted" => Ok(MessageStatus::Deleted),
            other => Err(format!("unknown message status '{}'", other)),
        }
    }
}

/// A message as stored in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author_name: String,
    /// `None` for anonymous visitors.
    pub author_identity: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
}

impl Message {
    pub fn is_visible(&self) -> bool {
        self.status == MessageStatus::Visible
    }

    /// Cursor pointing at this message, for fetching the next page.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.created_at, self.id.0)
    }
}

/// A validated message that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub author_name: String,
    pub author_identity: Option<String>,
    pub body: String,
    /// Left empty to let the store stamp the write.
    pub created_at: Option<DateTime<Utc>>,
}

/// Which messages a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFilter {
    /// Public view.
    VisibleOnly,
    /// Moderator view, regardless of status.
    All,
}

impl MessageFilter {
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            MessageFilter::VisibleOnly => message.is_visible(),
            MessageFilter::All => true,
        }
    }
}

/// One page of a newest-first listing.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    /// Present when more messages may follow.
    pub next_cursor: Option<Cursor>,
}

/// Limits applied to submissions and listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Maximum body length in characters, after trimming.
    pub max_body_len: usize,
    /// Maximum author display name length in characters.
    pub max_author_len: usize,
    /// Cap applied to every listing's `limit`.
    pub max_page_size: usize,
}

impl FeedConfig {
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.max_body_len == 0 || self.max_author_len == 0 || self.max_page_size == 0 {
            return Err(FeedError::InvalidInput(
                "Feed limits must all be at least 1".to_string(),
            ));
        }
        if self.max_page_size > PAGE_SIZE_CEILING {
            return Err(FeedError::InvalidInput(format!(
                "max_page_size cannot exceed {}",
                PAGE_SIZE_CEILING
            )));
        }
        Ok(())
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_body_len: 500,
            max_author_len: 50,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}
