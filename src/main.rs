//! # Altbot
//!
//! Watches the bot account's mentions and replies with the alt text of the
//! images in the tweet each mention replies to or quotes.
//!
//! ## Environment Variables
//!
//! - `xapi_access_token`: Twitter API Access token (OAuth 2.0 User Context), may also
//!   live in the `secrets` file
//! - `xapi_refresh_token`, `xapi_client_id`, `xapi_client_secret`: enable automatic token refresh
//! - `ALTBOT_*`: runtime settings, see [`altbot::BotConfig::from_env`]
//! - `RUST_LOG`: log level (defaults to `error`; `info` shows every mention)

use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

use altbot::{
    run, BotConfig, CursorStore, MemoryCursorStore, MentionPoller, MentionProcessor, Secrets,
    StateFile, TwitterApi, TwitterConfig, XApiClient,
};

/// Main entry point for the alt text bot.
///
/// Loads the configuration, verifies the credentials, and then answers mentions
/// until Ctrl+C is pressed or a fatal error (such as revoked credentials) occurs.
///
/// # Example Usage
///
/// ```bash
/// # Run with info logging
/// RUST_LOG=info cargo run
///
/// # Start after a specific mention
/// ALTBOT_SINCE_ID=1790000000000000000 cargo run
/// ```
#[tokio::main]
async fn main() {
    // Initialize the logging system
    env_logger::init();

    if let Err(e) = start().await {
        error!("Stopping: {}", e);
        std::process::exit(1);
    }
}

async fn start() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!(
        "Starting up, working dir = {}",
        std::env::current_dir()?.display()
    );

    let settings = BotConfig::from_env()?;
    let secrets = Secrets::load(&settings.secrets_file)?;
    let api = Arc::new(XApiClient::new(TwitterConfig::load(&secrets)?));

    let me = match api.verify_credentials().await {
        Ok(me) => me,
        Err(e) => {
            error!("Invalid credentials");
            return Err(e.into());
        }
    };
    info!(
        "Verification success, logged in as: @{} (id={}: {})",
        me.username,
        me.id,
        me.name.as_deref().unwrap_or("")
    );

    let store: Box<dyn CursorStore + Send> = match &settings.state_file {
        Some(path) => Box::new(StateFile::new(path)),
        None => {
            warn!("No state file configured, the cursor will not survive a restart");
            Box::new(MemoryCursorStore::default())
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, finishing current mention");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut poller = MentionPoller::new(api.clone(), store, settings.since_id, shutdown_rx)?
        .with_idle_interval(settings.poll_interval);
    if settings.skip_backlog {
        poller.skip_backlog().await?;
    }

    let processor = MentionProcessor::new(api, me, settings.max_chunk_len);
    run(&mut poller, &processor).await?;

    info!("Shut down cleanly");
    Ok(())
}
