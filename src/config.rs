// Runtime configuration, read from the environment (and a .env file when
// present, see main.rs). Every setting has a default so a bare checkout runs.

use crate::core::audit::{RetryPolicy, DEFAULT_OUTBOX_CAPACITY};
use crate::core::auth::RolePolicy;
use crate::core::feed::FeedConfig;
use anyhow::Context;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_DATABASE_URL: &str = "data/feed.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub admins: RolePolicy,
    pub feed: FeedConfig,
    pub audit_retry: RetryPolicy,
    /// Parked audit records kept in memory before new failures are dropped.
    pub audit_outbox_capacity: usize,
    /// How often the background worker drains the audit outbox.
    pub audit_retry_interval: Duration,
    /// When set, moderators authenticate with HS256 bearer tokens.
    pub jwt_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FeedConfig::default();
        let retry_defaults = RetryPolicy::default();

        let admins = RolePolicy::from_csv(&lookup("FEED_ADMIN_IDENTITIES").unwrap_or_default());
        if admins.admin_count() == 0 {
            warn!("FEED_ADMIN_IDENTITIES is empty; nobody can moderate the feed");
        }

        let feed = FeedConfig {
            max_body_len: try_load(&lookup, "FEED_MAX_BODY_LEN", defaults.max_body_len),
            max_author_len: try_load(&lookup, "FEED_MAX_AUTHOR_LEN", defaults.max_author_len),
            max_page_size: try_load(&lookup, "FEED_MAX_PAGE_SIZE", defaults.max_page_size),
        };
        feed.validate().context("invalid feed limits in environment")?;

        let audit_retry = RetryPolicy {
            attempts: try_load(&lookup, "FEED_AUDIT_RETRY_ATTEMPTS", retry_defaults.attempts),
            base_delay: Duration::from_millis(try_load(
                &lookup,
                "FEED_AUDIT_RETRY_BASE_MS",
                retry_defaults.base_delay.as_millis() as u64,
            )),
        };

        let audit_outbox_capacity = try_load(
            &lookup,
            "FEED_AUDIT_OUTBOX_CAPACITY",
            DEFAULT_OUTBOX_CAPACITY,
        );
        let interval_secs: u64 = try_load(&lookup, "FEED_AUDIT_RETRY_INTERVAL_SECS", 30);

        Ok(Self {
            database_url: lookup("FEED_DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            admins,
            feed,
            audit_retry,
            audit_outbox_capacity,
            audit_retry_interval: Duration::from_secs(interval_secs.max(1)),
            jwt_secret: lookup("FEED_JWT_SECRET").filter(|secret| !secret.is_empty()),
        })
    }
}

/// Parse `key`, falling back to `default` when it is unset or malformed.
fn try_load<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}; using default: {default}");
            default
        }),
    }
}
