// Library root for the guestbook feed.
//
// **Architecture Overview:**
// - `core/` = Business logic (feed, moderation, audit, auth ports)
// - `infra/` = Implementations of core traits (in-memory, SQLite, JWT)
// - `config` = Environment-driven settings
// - `app` = Wires config, stores and services together

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;

pub mod app;
pub mod config;
