// Core feed module - message submission, listing and the store port.

pub mod feed_models;
pub mod feed_service;
pub mod message_store;

pub use feed_models::*;
pub use feed_service::{ChatFeedService, ANONYMOUS_AUTHOR};
pub use message_store::MessageStore;
