// The core module contains all business logic.
// Each feature gets its own submodule; none of them know about SQL or HTTP.

pub mod errors;

pub mod pagination;

#[path = "feed/mod.rs"]
pub mod feed;

#[path = "audit/mod.rs"]
pub mod audit;

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "moderation/mod.rs"]
pub mod moderation;
