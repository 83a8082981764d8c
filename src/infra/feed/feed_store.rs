// Implementations of the MessageStore port.

pub mod in_memory;
pub mod sqlite_store;

// Re-export for convenience
pub use in_memory::InMemoryMessageStore;
pub use sqlite_store::SqliteMessageStore;
