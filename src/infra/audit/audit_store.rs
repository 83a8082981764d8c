// Implementations of the AuditLog port.

pub mod in_memory;
pub mod sqlite_store;

pub use in_memory::InMemoryAuditLog;
pub use sqlite_store::SqliteAuditLog;
