//! Posting reply chunks as a thread under the triggering mention.

use log::info;

use crate::error::PostError;
use crate::twitter::{Mention, PostedReply, TwitterApi};

const RULE: &str = "------------------------------------------------------------------------";

/// Users mentioned in `mention` that should not be pulled into the reply.
///
/// The mention's author and the bot itself are never excluded.
pub fn excluded_user_ids(mention: &Mention, self_id: u64) -> Vec<u64> {
    let mut excluded: Vec<u64> = Vec::new();
    for user in &mention.mentioned_users {
        if user.id != mention.author_id && user.id != self_id && !excluded.contains(&user.id) {
            excluded.push(user.id);
        }
    }
    excluded
}

/// Builds the reply texts: `@handle chunk`, plus ` [i/N]` when there is more
/// than one chunk.
pub fn compose_replies(handle: &str, chunks: &[String]) -> Vec<String> {
    let total = chunks.len();
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            if total == 1 {
                format!("@{} {}", handle, chunk.trim())
            } else {
                format!("@{} {} [{}/{}]", handle, chunk.trim(), i + 1, total)
            }
        })
        .collect()
}

/// Posts `chunks` as replies to `mention`, each one answering the previous.
///
/// Only the first reply suppresses the automatic reply mentions; later ones
/// answer our own tweet. Stops at the first failed post, leaving the part of
/// the thread that was already posted in place. A mention without a known
/// author is rejected before anything is posted.
pub async fn post_thread<A>(
    api: &A,
    mention: &Mention,
    chunks: &[String],
    self_id: u64,
) -> Result<Vec<PostedReply>, PostError>
where
    A: TwitterApi + ?Sized,
{
    let Some(handle) = mention.author_handle() else {
        return Err(PostError::Rejected(format!(
            "author {} of mention {} is unknown",
            mention.author_id, mention.id
        )));
    };
    let excluded = excluded_user_ids(mention, self_id);
    info!("Excluding user IDs: {:?}", excluded);

    let mut in_reply_to = mention.id;
    let mut posted = Vec::with_capacity(chunks.len());

    for (i, text) in compose_replies(handle, chunks)
        .iter()
        .enumerate()
    {
        info!(
            "Posting response to {}:\n{}\n{}\n{}",
            in_reply_to, RULE, text, RULE
        );
        let reply = api.post_reply(in_reply_to, text, &excluded, i == 0).await?;
        in_reply_to = reply.id;
        posted.push(reply);
    }

    Ok(posted)
}
