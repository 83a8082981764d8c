// Keyset pagination shared by message and audit listings.
//
// Offsets shift under concurrent inserts; a (timestamp, id) position does not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position in a newest-first listing.
///
/// A page requested with `before = Some(cursor)` contains only entries that sort
/// strictly after the cursor in `(timestamp desc, id desc)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub timestamp: DateTime<Utc>,
    pub id: u64,
}

impl Cursor {
    pub fn new(timestamp: DateTime<Utc>, id: u64) -> Self {
        Self { timestamp, id }
    }

    /// Key for ordered indexes.
    pub fn key(&self) -> (DateTime<Utc>, u64) {
        (self.timestamp, self.id)
    }
}

/// Upper bound applied to every listing when the caller's limit is larger.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Largest page size a configuration may set.
pub const PAGE_SIZE_CEILING: usize = 1_000;

/// Clamp a requested page size to `[0, max]`.
pub fn clamp_limit(requested: usize, max: usize) -> usize {
    requested.min(max)
}
