//! Per-mention orchestration and the bot's main loop.
//!
//! For each mention: skip our own tweets, find the tweet it refers to, extract
//! its alt text, split it into chunks and post them as a thread. Failures are
//! contained to the mention that caused them unless they are fatal.

use log::{error, info, warn};
use std::sync::Arc;

use crate::annotate::{extract_annotations, resolve_target};
use crate::chunker::chunk_annotations;
use crate::error::{BotError, ProcessError};
use crate::poller::MentionPoller;
use crate::threader::post_thread;
use crate::twitter::{sanitize_for_logging, Mention, TwitterApi, User};

/// What happened to a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Written by the bot account itself.
    SelfAuthored,
    /// The author's account was not part of the response, so there is no
    /// handle to address a reply to.
    UnknownAuthor,
    /// Neither a reply nor a quote, or the referenced tweet is gone.
    NothingToAnnotate,
    /// The referenced tweet has no photos or GIFs.
    NoImages,
    Replied { posts: usize },
}

pub struct MentionProcessor<A: TwitterApi> {
    api: Arc<A>,
    me: User,
    max_chunk_len: usize,
}

impl<A: TwitterApi> MentionProcessor<A> {
    /// `me` is the account the bot is logged in as.
    pub fn new(api: Arc<A>, me: User, max_chunk_len: usize) -> Self {
        MentionProcessor {
            api,
            me,
            max_chunk_len,
        }
    }

    /// Runs the whole pipeline for one mention.
    pub async fn process(&self, mention: &Mention) -> Result<Outcome, ProcessError> {
        if mention.author_id == self.me.id {
            return Ok(Outcome::SelfAuthored);
        }

        let Some(handle) = mention.author_handle() else {
            warn!(
                "Author {} of tweet ID {} is unknown, not replying",
                mention.author_id, mention.id
            );
            return Ok(Outcome::UnknownAuthor);
        };

        info!(
            "tweet ID {} from @{} at {}: {}",
            mention.id,
            handle,
            mention
                .created_at
                .map_or_else(|| "unknown time".to_string(), |t| t.to_rfc3339()),
            sanitize_for_logging(&mention.text, 280)
        );

        let Some(target) = resolve_target(self.api.as_ref(), mention).await? else {
            info!("Nothing to annotate.");
            return Ok(Outcome::NothingToAnnotate);
        };

        let annotations = extract_annotations(&target);
        if annotations.is_empty() {
            info!("Tweet {} has no images", target.id);
            return Ok(Outcome::NoImages);
        }

        let chunks = chunk_annotations(&annotations, self.max_chunk_len);
        let posted = post_thread(self.api.as_ref(), mention, &chunks, self.me.id).await?;
        Ok(Outcome::Replied {
            posts: posted.len(),
        })
    }

    /// Processes a mention, logging and swallowing every non-fatal failure.
    ///
    /// # Errors
    ///
    /// Returns only fatal errors, such as credentials that stopped working.
    pub async fn handle(&self, mention: &Mention) -> Result<Option<Outcome>, ProcessError> {
        match self.process(mention).await {
            Ok(outcome) => {
                if outcome != Outcome::SelfAuthored {
                    info!("Done processing tweet ID {}: {:?}", mention.id, outcome);
                }
                Ok(Some(outcome))
            }
            Err(e) if e.is_fatal() => {
                error!(
                    "Fatal error while processing {} (ID {}, author {}): {}",
                    mention.url(),
                    mention.id,
                    mention.author_id,
                    e
                );
                Err(e)
            }
            Err(e) => {
                error!(
                    "Failed to process {} (ID {}, author {}): {}",
                    mention.url(),
                    mention.id,
                    mention.author_id,
                    e
                );
                Ok(None)
            }
        }
    }
}

/// Feeds every mention from `poller` to `processor` until shutdown or a fatal error.
pub async fn run<A: TwitterApi>(
    poller: &mut MentionPoller<A>,
    processor: &MentionProcessor<A>,
) -> Result<(), BotError> {
    while let Some(mention) = poller.next_mention().await? {
        processor.handle(&mention).await?;
    }
    info!("Mention stream ended at cursor {:?}", poller.cursor());
    Ok(())
}
