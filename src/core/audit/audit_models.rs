// Audit domain models.
//
// Records are immutable once written; nothing here exposes a setter.

use crate::core::pagination::Cursor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditRecordId(pub u64);

impl fmt::Display for AuditRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of moderation action that was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    MessageDeleted,
    MessageApproved,
    ConfigChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::MessageDeleted => "message_deleted",
            AuditAction::MessageApproved => "message_approved",
            AuditAction::ConfigChanged => "config_changed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message_deleted" => Ok(AuditAction::MessageDeleted),
            "message_approved" => Ok(AuditAction::MessageApproved),
            "config_changed" => Ok(AuditAction::ConfigChanged),
            other => Err(format!("unknown audit action '{}'", other)),
        }
    }
}

/// An audit entry that has not been appended yet.
///
/// The timestamp is fixed when the action happens, so a record appended late
/// by the retry path still carries the time of the action itself.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditRecord {
    pub actor: String,
    pub action: AuditAction,
    pub target: String,
    pub detail: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

impl NewAuditRecord {
    pub fn new(actor: impl Into<String>, action: AuditAction, target: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            action,
            target: target.into(),
            detail: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    /// Identity of the principal who acted. Never empty.
    pub actor: String,
    pub action: AuditAction,
    /// What the action touched, e.g. a message id.
    pub target: String,
    pub recorded_at: DateTime<Utc>,
    pub detail: Option<serde_json::Value>,
}

impl AuditRecord {
    pub fn from_new(id: AuditRecordId, record: NewAuditRecord) -> Self {
        Self {
            id,
            actor: record.actor,
            action: record.action,
            target: record.target,
            recorded_at: record.recorded_at,
            detail: record.detail,
        }
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.recorded_at, self.id.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditPage {
    pub records: Vec<AuditRecord>,
    pub next_cursor: Option<Cursor>,
}

/// What happened to the audit entry of an accepted moderation action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditStatus {
    Recorded(AuditRecordId),
    /// Append failed transiently; the record waits in the outbox.
    Pending,
    /// Append failed permanently; the entry is lost and was logged as an error.
    Failed(String),
}

impl AuditStatus {
    pub fn is_recorded(&self) -> bool {
        matches!(self, AuditStatus::Recorded(_))
    }
}

/// Inline retry policy for audit appends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Delay before the second try; doubles after that.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Exponential delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(10);
        self.base_delay.saturating_mul(factor)
    }

    pub fn no_delay(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

/// Outcome of one pass over the audit outbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub recorded: usize,
    pub still_pending: usize,
    pub dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_match_stored_form() {
        for action in [
            AuditAction::MessageDeleted,
            AuditAction::MessageApproved,
            AuditAction::ConfigChanged,
        ] {
            assert_eq!(action.as_str().parse::<AuditAction>(), Ok(action));
            assert_eq!(
                serde_json::to_value(action).unwrap(),
                serde_json::json!(action.as_str())
            );
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            attempts: 4,
            base_delay: Duration::from_millis(10),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(2), Duration::from_millis(20));
        assert_eq!(policy.backoff(3), Duration::from_millis(40));
    }
}
