//! Error types for the alt text bot.
//!
//! The API client reports failures as either transient (network trouble, rate
//! limits, server errors) or fatal (bad credentials, forbidden access). The
//! poller retries transient fetch failures and lets fatal ones escape; the
//! processor contains everything except fatal errors to the mention that
//! caused them.

use thiserror::Error;

/// Failure to read or write the durable cursor record.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file is malformed: {0}")]
    Format(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Format(e.to_string())
    }
}

/// Failure while fetching mentions, tweets or the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Worth retrying later with the same cursor.
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// Retrying will not help (e.g. invalid credentials).
    #[error("fatal fetch failure: {0}")]
    Fatal(String),
}

impl FetchError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Fatal(_))
    }
}

/// Failure while posting a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostError {
    #[error("transient post failure: {0}")]
    Transient(String),

    /// Twitter refused this particular reply (deleted target, restricted
    /// conversation, duplicate text). Other replies may still succeed.
    #[error("reply rejected: {0}")]
    Rejected(String),

    #[error("fatal post failure: {0}")]
    Fatal(String),
}

impl PostError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PostError::Fatal(_))
    }
}

/// Outcome of a failed attempt to annotate a single mention.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Post(#[from] PostError),
}

impl ProcessError {
    /// Fatal errors stop the bot; everything else only affects the current mention.
    pub fn is_fatal(&self) -> bool {
        match self {
            ProcessError::Fetch(e) => e.is_fatal(),
            ProcessError::Post(e) => e.is_fatal(),
        }
    }
}

/// Errors that escape the mention poller.
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors that stop the bot.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Post(#[from] PostError),
}

impl From<PollError> for BotError {
    fn from(e: PollError) -> Self {
        match e {
            PollError::Fetch(e) => BotError::Fetch(e),
            PollError::Storage(e) => BotError::Storage(e),
        }
    }
}

impl From<ProcessError> for BotError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::Fetch(e) => BotError::Fetch(e),
            ProcessError::Post(e) => BotError::Post(e),
        }
    }
}
