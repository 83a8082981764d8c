// Error taxonomy shared by the feed, moderation and audit services.
//
// Stores speak `StoreError`; services speak `FeedError`. The split keeps
// persistence concerns (is this worth retrying?) apart from what the caller
// is told (bad input, denied, missing, store trouble).

use thiserror::Error;

// ============================================================================
// STORE ERRORS
// ============================================================================

/// Failure reported by a store adapter.
///
/// Adapters must classify their backend errors so callers can choose between
/// retrying and surfacing the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Connectivity blips, lock contention, timeouts.
    #[error("Transient storage failure: {0}")]
    Transient(String),

    /// Malformed data, constraint violations, anything a retry won't fix.
    #[error("Storage failure: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

// ============================================================================
// SERVICE ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Rejected submission or request parameters. Never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller is anonymous or lacks the admin role. Never retried.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller may retry with backoff; the core does not retry on its own.
    #[error("Temporary storage failure: {0}")]
    TransientStoreFailure(String),

    #[error("Storage failure: {0}")]
    PermanentStoreFailure(String),
}

impl FeedError {
    /// Whether a calling layer may reasonably retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::TransientStoreFailure(_))
    }
}

impl From<StoreError> for FeedError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => FeedError::NotFound(what),
            StoreError::Transient(msg) => FeedError::TransientStoreFailure(msg),
            StoreError::Permanent(msg) => FeedError::PermanentStoreFailure(msg),
        }
    }
}

/// Convert a store failure at a service boundary, logging the ones operators
/// should see. Missing records are the caller's problem and stay quiet.
pub fn surface_store_error(err: StoreError, operation: &'static str) -> FeedError {
    match &err {
        StoreError::Transient(_) => {
            tracing::warn!(operation, error = %err, "Transient store failure");
        }
        StoreError::Permanent(_) => {
            tracing::error!(operation, error = %err, "Permanent store failure");
        }
        StoreError::NotFound(_) => {}
    }
    FeedError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        assert_eq!(
            FeedError::from(StoreError::NotFound("message 4".into())),
            FeedError::NotFound("message 4".into())
        );
        assert!(FeedError::from(StoreError::Transient("busy".into())).is_retryable());
        assert!(!FeedError::from(StoreError::Permanent("bad row".into())).is_retryable());
        assert!(!FeedError::Unauthorized.is_retryable());
    }

    #[test]
    fn test_surfaced_errors_keep_their_class() {
        assert!(matches!(
            surface_store_error(StoreError::Permanent("disk I/O error".into()), "list"),
            FeedError::PermanentStoreFailure(_)
        ));
        assert!(surface_store_error(StoreError::Transient("busy".into()), "list").is_retryable());
    }
}
