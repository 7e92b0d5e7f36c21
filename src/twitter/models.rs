//! Domain types produced by the Twitter API client.
//!
//! These are read-only snapshots of what the API returned; nothing in the bot
//! mutates them after parsing.

use chrono::{DateTime, Utc};

/// A Twitter/X account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    /// Handle without the leading `@`.
    pub username: String,
    /// Display name, when the API included it.
    pub name: Option<String>,
}

impl User {
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        User {
            id,
            username: username.into(),
            name: None,
        }
    }
}

/// A tweet that mentions the bot account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub id: u64,
    pub author_id: u64,
    /// `None` when the API did not include the author's account, e.g. because
    /// it was suspended in the meantime. Such a mention cannot be answered.
    pub author: Option<User>,
    pub text: String,
    /// The tweet this mention replies to, if any.
    pub in_reply_to_tweet_id: Option<u64>,
    /// The tweet this mention quotes, if any.
    pub quoted_tweet_id: Option<u64>,
    /// Every account referenced with an `@handle` in the mention text.
    pub mentioned_users: Vec<User>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Mention {
    /// Handle of the author, if known.
    pub fn author_handle(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.username.as_str())
    }

    /// Link to the mention on the web, used when logging failures.
    pub fn url(&self) -> String {
        // x.com resolves `/i/status/` for any author.
        let handle = self.author_handle().unwrap_or("i");
        format!("https://x.com/{}/status/{}", handle, self.id)
    }
}

/// Kind of a media attachment as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    AnimatedGif,
    Video,
    Other(String),
}

impl MediaKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "photo" => MediaKind::Photo,
            "animated_gif" => MediaKind::AnimatedGif,
            "video" => MediaKind::Video,
            other => MediaKind::Other(other.to_string()),
        }
    }

    /// Photos and GIFs carry alt text; videos are not annotated.
    pub fn is_image(&self) -> bool {
        matches!(self, MediaKind::Photo | MediaKind::AnimatedGif)
    }
}

/// A media attachment on a tweet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub media_key: String,
    pub kind: MediaKind,
    pub alt_text: Option<String>,
}

/// A tweet fetched by id, the candidate for annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tweet {
    pub id: u64,
    /// `None` when the tweet exposes no media collection at all.
    pub media: Option<Vec<Media>>,
}

/// The result of a successful post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostedReply {
    pub id: u64,
}
