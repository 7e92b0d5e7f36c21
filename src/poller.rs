//! Incremental mention polling.
//!
//! [`MentionPoller`] turns the "mentions since X" endpoint into an endless,
//! ordered sequence of mentions. Each call to [`MentionPoller::next_mention`]
//! hands out one mention; before it does, the cursor is moved to that
//! mention's id and written to the [`CursorStore`]. A restarted bot therefore
//! resumes after the last mention it handed out, at worst repeating the one
//! that was in flight when it stopped.

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::DEFAULT_POLL_INTERVAL_SECS;
use crate::cursor::CursorStore;
use crate::error::{FetchError, PollError, StorageError};
use crate::twitter::{Mention, TwitterApi, MENTION_BATCH_SIZE};

/// What the poller is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// The last poll returned nothing (or failed); waiting for the idle interval.
    Idle,
    /// Handing out buffered mentions.
    Draining,
}

pub struct MentionPoller<A: TwitterApi> {
    api: Arc<A>,
    store: Box<dyn CursorStore + Send>,
    cursor: Option<u64>,
    /// The in-memory cursor is ahead of the stored one because a save failed.
    unsaved: bool,
    buffer: VecDeque<Mention>,
    state: PollerState,
    idle_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<A: TwitterApi> MentionPoller<A> {
    /// Creates a poller starting at `since_id`, or at the stored cursor when
    /// no explicit start is given.
    ///
    /// # Errors
    ///
    /// Fails if the stored cursor cannot be read. This is fatal at startup.
    pub fn new(
        api: Arc<A>,
        store: Box<dyn CursorStore + Send>,
        since_id: Option<u64>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, StorageError> {
        let cursor = match since_id {
            Some(id) => {
                info!("Starting from explicit cursor {}", id);
                Some(id)
            }
            None => {
                let stored = store.load()?;
                if stored.is_none() {
                    warn!("No stored cursor, all currently available mentions will be processed");
                }
                stored
            }
        };

        Ok(MentionPoller {
            api,
            store,
            cursor,
            unsaved: false,
            buffer: VecDeque::new(),
            state: PollerState::Idle,
            idle_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            shutdown,
        })
    }

    pub fn with_idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    /// Id of the newest mention handed out so far (or the starting cursor).
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Returns the next mention, polling and waiting as long as needed.
    ///
    /// Returns `Ok(None)` once shutdown has been requested. Shutdown is noticed
    /// before each poll, between mentions and while idle, never in the middle of
    /// a cursor write.
    ///
    /// # Errors
    ///
    /// Only fatal fetch errors escape. Transient ones are retried with the same
    /// cursor after the idle interval, and a failed cursor write is logged and
    /// retried with the next one.
    pub async fn next_mention(&mut self) -> Result<Option<Mention>, PollError> {
        loop {
            if self.shutdown_requested() {
                info!("Shutdown requested, mention poller stopping");
                return Ok(None);
            }

            if let Some(mention) = self.buffer.pop_front() {
                if matches!(self.cursor, Some(cursor) if mention.id <= cursor) {
                    debug!(
                        "Dropping mention {} at or behind cursor {:?}",
                        mention.id, self.cursor
                    );
                    continue;
                }
                self.advance(mention.id);
                return Ok(Some(mention));
            }

            if self.unsaved {
                if let Some(cursor) = self.cursor {
                    self.persist(cursor);
                }
            }

            match self.poll().await {
                Ok(0) => {
                    self.state = PollerState::Idle;
                    debug!("No new mentions since {:?}", self.cursor);
                    self.idle().await;
                }
                Ok(count) => {
                    self.state = PollerState::Draining;
                    info!("Fetched {} new mentions since {:?}", count, self.cursor);
                }
                Err(FetchError::Transient(msg)) => {
                    self.state = PollerState::Idle;
                    warn!(
                        "Fetching mentions since {:?} failed, retrying after {:?}: {}",
                        self.cursor, self.idle_interval, msg
                    );
                    self.idle().await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Moves the cursor past every mention currently available without handing
    /// any of them out. Only acts when there is no cursor yet.
    ///
    /// Returns the number of mentions skipped.
    pub async fn skip_backlog(&mut self) -> Result<usize, PollError> {
        if self.cursor.is_some() {
            debug!("Cursor already set, no backlog to skip");
            return Ok(0);
        }

        // Batches come oldest first, so keep going until nothing is newer.
        let mut skipped = 0;
        loop {
            if self.shutdown_requested() {
                return Ok(skipped);
            }
            match self
                .api
                .fetch_mentions_since(self.cursor, MENTION_BATCH_SIZE)
                .await
            {
                Ok(batch) => {
                    let Some(newest) = batch.iter().map(|m| m.id).max() else {
                        info!("Skipped {} earlier mentions", skipped);
                        return Ok(skipped);
                    };
                    self.cursor = Some(newest);
                    self.store.save(newest)?;
                    skipped += batch.len();
                    debug!("Skipping {} mentions, cursor now {}", batch.len(), newest);
                }
                Err(FetchError::Transient(msg)) => {
                    warn!("Fetching backlog failed, retrying: {}", msg);
                    self.idle().await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fetches one batch into the buffer in ascending id order. Returns its size.
    async fn poll(&mut self) -> Result<usize, FetchError> {
        let mut batch = self
            .api
            .fetch_mentions_since(self.cursor, MENTION_BATCH_SIZE)
            .await?;
        batch.sort_by_key(|m| m.id);
        let count = batch.len();
        self.buffer.extend(batch);
        Ok(count)
    }

    fn advance(&mut self, id: u64) {
        self.cursor = Some(id);
        self.persist(id);
    }

    fn persist(&mut self, cursor: u64) {
        match self.store.save(cursor) {
            Ok(()) => self.unsaved = false,
            Err(e) => {
                warn!("Failed to save cursor {}, will retry: {}", cursor, e);
                self.unsaved = true;
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleeps for the idle interval, waking early on shutdown.
    async fn idle(&mut self) {
        let sleep = tokio::time::sleep(self.idle_interval);
        tokio::pin!(sleep);

        loop {
            let changed = tokio::select! {
                _ = &mut sleep => return,
                changed = self.shutdown.changed() => changed,
            };
            match changed {
                Ok(()) if self.shutdown_requested() => return,
                Ok(()) => continue,
                Err(_) => {
                    // Sender gone, nobody can ask us to stop any more.
                    (&mut sleep).await;
                    return;
                }
            }
        }
    }
}
