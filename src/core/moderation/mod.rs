// Core moderation module - the moderation engine and its authorizing facade.
// Following the same pattern as the feed and audit modules.

pub mod moderation_api;
pub mod moderation_models;
pub mod moderation_service;

pub use moderation_api::ModerationApi;
pub use moderation_models::*;
pub use moderation_service::ModerationEngine;
