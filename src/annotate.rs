//! Finding the tweet a mention is about, and pulling alt text out of it.

use log::{debug, info, warn};

use crate::error::FetchError;
use crate::twitter::{Mention, Tweet, TwitterApi};

/// Reply when a tweet has images but none of them carries alt text.
pub const NO_ALT_TEXT: &str = "No alt text :'(";
/// Stand-in for a single undescribed image among described ones.
pub const MISSING_ALT_TEXT: &str = "Missing alt text";

/// Finds the tweet to annotate for `mention`: the quoted tweet if there is
/// one, otherwise the tweet it replies to.
///
/// Returns `Ok(None)` when there is nothing to annotate, including when the
/// target was deleted or could not be fetched for a transient reason. Only
/// fatal errors are returned.
pub async fn resolve_target<A>(api: &A, mention: &Mention) -> Result<Option<Tweet>, FetchError>
where
    A: TwitterApi + ?Sized,
{
    let target_id = match (mention.quoted_tweet_id, mention.in_reply_to_tweet_id) {
        (Some(quoted), _) => {
            debug!("Mention {} quotes tweet {}", mention.id, quoted);
            quoted
        }
        (None, Some(parent)) => {
            debug!("Mention {} replies to tweet {}", mention.id, parent);
            parent
        }
        (None, None) => return Ok(None),
    };

    match api.fetch_tweet(target_id).await {
        Ok(Some(tweet)) => Ok(Some(tweet)),
        Ok(None) => {
            info!(
                "Tweet {} referenced by mention {} is not available",
                target_id, mention.id
            );
            Ok(None)
        }
        Err(FetchError::Transient(msg)) => {
            warn!(
                "Could not fetch tweet {} referenced by mention {}: {}",
                target_id, mention.id, msg
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Lists the alt text of every photo and GIF on `tweet`.
///
/// - No photos or GIFs (or no media at all): empty list.
/// - Images, none described: a single [`NO_ALT_TEXT`] entry.
/// - Otherwise one entry per image, [`MISSING_ALT_TEXT`] for undescribed ones.
///
/// Blank alt text counts as missing.
pub fn extract_annotations(tweet: &Tweet) -> Vec<String> {
    let Some(media) = &tweet.media else {
        return Vec::new();
    };

    let alt_texts: Vec<Option<&str>> = media
        .iter()
        .filter(|m| m.kind.is_image())
        .map(|m| {
            m.alt_text
                .as_deref()
                .filter(|text| !text.trim().is_empty())
        })
        .collect();

    if alt_texts.is_empty() {
        return Vec::new();
    }
    if alt_texts.iter().all(Option::is_none) {
        return vec![NO_ALT_TEXT.to_string()];
    }

    alt_texts
        .into_iter()
        .map(|text| text.unwrap_or(MISSING_ALT_TEXT).to_string())
        .collect()
}
