// Core audit module - append-only trail of moderation actions.

pub mod audit_models;
pub mod audit_recorder;

pub use audit_models::*;
pub use audit_recorder::{AuditLog, AuditRecorder, DEFAULT_OUTBOX_CAPACITY};
