// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "sqlite_support.rs"]
pub mod sqlite_support;

#[path = "feed/feed_store.rs"]
pub mod feed;

#[path = "audit/audit_store.rs"]
pub mod audit;

#[path = "auth/auth_resolvers.rs"]
pub mod auth;
