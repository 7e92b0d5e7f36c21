//! Twitter/X API integration module.
//!
//! The rest of the bot only talks to Twitter through the [`TwitterApi`] trait:
//! fetch mentions newer than a cursor, fetch a tweet by id, post a reply.
//! [`XApiClient`] implements it against the X API v2 using OAuth 2.0 User
//! Context authentication.

mod api;
mod client;
mod models;
pub(crate) mod parsing;

use async_trait::async_trait;

use crate::error::{FetchError, PostError};

pub use api::sanitize_for_logging;
pub use client::XApiClient;
pub use models::{Media, MediaKind, Mention, PostedReply, Tweet, User};

/// Maximum number of mentions requested per poll cycle.
pub const MENTION_BATCH_SIZE: usize = 200;

/// Keeps the `limit` oldest of `mentions`, in ascending id order.
///
/// The API pages newest first; a batch must never skip older pending mentions,
/// or the cursor would move past them.
pub(crate) fn oldest_mentions(mut mentions: Vec<Mention>, limit: usize) -> Vec<Mention> {
    mentions.sort_by_key(|m| m.id);
    mentions.dedup_by_key(|m| m.id);
    mentions.truncate(limit);
    mentions
}

/// The operations the bot needs from the Twitter API.
#[async_trait]
pub trait TwitterApi: Send + Sync {
    /// Returns the account the credentials belong to.
    async fn verify_credentials(&self) -> Result<User, FetchError>;

    /// Returns up to `limit` mentions with an id strictly greater than `since_id`,
    /// in no particular order. When more than `limit` are pending, the oldest
    /// ones are returned.
    async fn fetch_mentions_since(
        &self,
        since_id: Option<u64>,
        limit: usize,
    ) -> Result<Vec<Mention>, FetchError>;

    /// Returns the tweet, or `None` if it was deleted or is not visible to us.
    async fn fetch_tweet(&self, id: u64) -> Result<Option<Tweet>, FetchError>;

    /// Posts `text` as a reply to `in_reply_to`.
    ///
    /// With `suppress_metadata`, the users in `exclude_user_ids` are not
    /// notified through the automatically populated reply mentions.
    async fn post_reply(
        &self,
        in_reply_to: u64,
        text: &str,
        exclude_user_ids: &[u64],
        suppress_metadata: bool,
    ) -> Result<PostedReply, PostError>;
}
