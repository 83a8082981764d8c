// Moderation domain models - outcomes of moderator actions.
//
// The engine reports what it did; the presentation layer decides how to show it.

use crate::core::audit::AuditStatus;
use crate::core::feed::MessageId;

/// Result of a successful delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The message moved `Visible -> Deleted` in this call.
    Deleted {
        message_id: MessageId,
        audit: AuditStatus,
    },
    /// The message was already deleted; nothing changed and nothing was recorded.
    AlreadyDeleted { message_id: MessageId },
}

impl DeleteOutcome {
    pub fn message_id(&self) -> MessageId {
        match self {
            DeleteOutcome::Deleted { message_id, .. } => *message_id,
            DeleteOutcome::AlreadyDeleted { message_id } => *message_id,
        }
    }

    /// Audit status, when this call produced an audit entry.
    pub fn audit(&self) -> Option<&AuditStatus> {
        match self {
            DeleteOutcome::Deleted { audit, .. } => Some(audit),
            DeleteOutcome::AlreadyDeleted { .. } => None,
        }
    }
}

/// Audit target used for feed configuration changes.
pub const FEED_CONFIG_TARGET: &str = "feed_config";
