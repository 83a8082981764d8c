// Entry point of the feed daemon.
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection, see app.rs)
// 3. Run the audit retry worker until shutdown

use guestbook_feed::app::FeedApp;
use guestbook_feed::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    let app = FeedApp::build(&config).await?;

    // ========================================================================
    // BACKGROUND TASKS
    // ========================================================================
    // Parked audit records are re-appended on a timer so a flaky database
    // never leaves a moderation action without its trail for long.
    let worker = app.spawn_audit_retry_worker(config.audit_retry_interval);

    tracing::info!("Guestbook feed running; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    worker.abort();
    app.flush_pending_audits().await;

    let pending = app.engine.pending_audit_count().await;
    if pending > 0 {
        tracing::error!(pending, "Audit records still parked at shutdown");
    }

    Ok(())
}
