//! Parsing of X API v2 JSON responses into the bot's domain types.
//!
//! The API returns ids as strings and spreads related objects over `data` and
//! `includes`; these helpers join them back together. Malformed entries are
//! skipped with a warning rather than failing the whole response.

use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;

use super::models::{Media, MediaKind, Mention, PostedReply, Tweet, User};

/// Reads an id that the API may encode either as a string or as a number.
pub(crate) fn parse_id(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Parses a v2 user object.
pub(crate) fn parse_user(value: &Value) -> Option<User> {
    let id = value.get("id").and_then(parse_id)?;
    let username = value.get("username").and_then(|v| v.as_str())?;
    Some(User {
        id,
        username: username.to_string(),
        name: value.get("name").and_then(|v| v.as_str()).map(String::from),
    })
}

/// Parses the response of `GET /2/users/me`.
pub(crate) fn parse_user_response(json: &Value) -> Option<User> {
    json.get("data").and_then(parse_user)
}

/// Parses the response of `POST /2/tweets`.
pub(crate) fn parse_posted_reply(json: &Value) -> Option<PostedReply> {
    json.get("data")
        .and_then(|d| d.get("id"))
        .and_then(parse_id)
        .map(|id| PostedReply { id })
}

/// Returns the pagination token of a list response, if there is another page.
pub(crate) fn next_token(json: &Value) -> Option<String> {
    json.get("meta")
        .and_then(|m| m.get("next_token"))
        .and_then(|t| t.as_str())
        .map(String::from)
}

fn referenced_tweet_id(tweet: &Value, kind: &str) -> Option<u64> {
    tweet
        .get("referenced_tweets")
        .and_then(|r| r.as_array())?
        .iter()
        .find(|r| r.get("type").and_then(|t| t.as_str()) == Some(kind))
        .and_then(|r| r.get("id"))
        .and_then(parse_id)
}

/// Parses one page of `GET /2/users/:id/mentions`.
///
/// Authors are looked up in `includes.users`. A mention whose author is not
/// included is still returned, without an author, so the cursor can move
/// past it.
pub(crate) fn parse_mentions(json: &Value) -> Vec<Mention> {
    let users: HashMap<u64, User> = json
        .get("includes")
        .and_then(|i| i.get("users"))
        .and_then(|u| u.as_array())
        .map(|users| {
            users
                .iter()
                .filter_map(parse_user)
                .map(|u| (u.id, u))
                .collect()
        })
        .unwrap_or_default();

    let Some(tweets) = json.get("data").and_then(|d| d.as_array()) else {
        debug!("Mentions response has no data");
        return Vec::new();
    };

    let mut mentions = Vec::with_capacity(tweets.len());
    for tweet in tweets {
        let Some(id) = tweet.get("id").and_then(parse_id) else {
            warn!("Skipping mention without a usable id");
            continue;
        };

        let author_id = tweet.get("author_id").and_then(parse_id).unwrap_or(0);
        let author = users.get(&author_id).cloned();
        if author.is_none() {
            warn!("Author {} of mention {} not included in response", author_id, id);
        }

        let mentioned_users = tweet
            .get("entities")
            .and_then(|e| e.get("mentions"))
            .and_then(|m| m.as_array())
            .map(|mentions| mentions.iter().filter_map(parse_user).collect())
            .unwrap_or_default();

        let created_at = tweet
            .get("created_at")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc));

        mentions.push(Mention {
            id,
            author_id,
            author,
            text: tweet
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            in_reply_to_tweet_id: referenced_tweet_id(tweet, "replied_to"),
            quoted_tweet_id: referenced_tweet_id(tweet, "quoted"),
            mentioned_users,
            created_at,
        });
    }
    mentions
}

/// Parses the response of `GET /2/tweets/:id`.
///
/// Returns `None` when the response carries no tweet, which is how the API
/// reports deleted or protected tweets alongside an `errors` array.
pub(crate) fn parse_tweet(json: &Value) -> Option<Tweet> {
    let data = json.get("data")?;
    let id = data.get("id").and_then(parse_id)?;

    let included_media: HashMap<&str, &Value> = json
        .get("includes")
        .and_then(|i| i.get("media"))
        .and_then(|m| m.as_array())
        .map(|media| {
            media
                .iter()
                .filter_map(|m| Some((m.get("media_key")?.as_str()?, m)))
                .collect()
        })
        .unwrap_or_default();

    let media = data.get("attachments").map(|attachments| {
        attachments
            .get("media_keys")
            .and_then(|k| k.as_array())
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| k.as_str())
                    .filter_map(|key| {
                        let Some(entry) = included_media.get(key) else {
                            warn!("Media {} of tweet {} not included in response", key, id);
                            return None;
                        };
                        Some(Media {
                            media_key: key.to_string(),
                            kind: MediaKind::parse(
                                entry.get("type").and_then(|t| t.as_str()).unwrap_or_default(),
                            ),
                            alt_text: entry
                                .get("alt_text")
                                .and_then(|a| a.as_str())
                                .map(String::from),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    });

    Some(Tweet { id, media })
}
