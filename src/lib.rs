//! # Altbot Library
//!
//! A Twitter/X bot that reads the alt text of images out loud, so to speak.
//! When someone mentions the bot in a reply to (or a quote of) a tweet with
//! images, the bot answers with the alt text of those images, split over a
//! numbered thread when it does not fit into a single reply.
//!
//! ## Features
//!
//! - Incremental mention polling with a crash-safe, persisted cursor
//! - Alt text extraction for photos and GIFs
//! - Splitting of long descriptions at line breaks and word boundaries
//! - Threaded, numbered replies
//! - Twitter/X API v2 integration with OAuth 2.0 User Context authentication and
//!   automatic token refresh
//! - Structured logging
//!
//! ## Configuration
//!
//! - `xapi_access_token` (required), `xapi_refresh_token`, `xapi_client_id`, `xapi_client_secret`:
//!   from the environment or the `secrets` file
//! - `ALTBOT_STATE_FILE`: where the cursor is kept (defaults to `state`)
//! - `ALTBOT_SINCE_ID`: start after this mention id instead of the stored cursor
//! - `ALTBOT_POLL_INTERVAL_SECS`: wait between empty polls (defaults to 15)
//! - `ALTBOT_MAX_CHUNK_LEN`: longest reply chunk in characters (defaults to 250)
//! - `ALTBOT_SKIP_BACKLOG`: on first run, ignore mentions that already exist

pub mod annotate;
pub mod chunker;
pub mod config;
pub mod cursor;
pub mod error;
pub mod oauth;
pub mod poller;
pub mod processor;
pub mod threader;
pub mod twitter;

// Re-export commonly used types and functions
pub use config::{BotConfig, Secrets, TwitterConfig};
pub use cursor::{CursorStore, MemoryCursorStore, StateFile};
pub use error::{BotError, FetchError, PollError, PostError, ProcessError, StorageError};
pub use oauth::build_oauth2_user_context_header;
pub use poller::{MentionPoller, PollerState};
pub use processor::{run, MentionProcessor, Outcome};
pub use twitter::{TwitterApi, XApiClient};
