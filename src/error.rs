use chrono::{DateTime, Utc};

use crate::entry::EntryId;

/// A rule violated by input to the add-entry path. Raised before any store
/// mutation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("expiry {expiry} must be after start {start}")]
    ExpiryNotAfterStart {
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    },

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("Invalid YouTube URL: {0}")]
    InvalidReference(String),

    #[error("unknown entry kind {0:?}, expected \"video\" or \"playlist\"")]
    UnknownKind(String),

    #[error("title prefix must not be empty")]
    EmptyPrefix,

    #[error("message content must not be empty")]
    EmptyMessage,
}

/// Failure of the external playlist provider. Never leaves the expander.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("playlist {0} not found")]
    NotFound(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("no YouTube API key configured")]
    MissingApiKey,

    #[error("provider did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    Poisoned,
}

#[derive(Debug, thiserror::Error)]
pub enum AllocatorError {
    #[error("title counter changed concurrently {attempts} times, giving up")]
    Conflict { attempts: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors returned by the curation operations exposed to the server and CLI.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("entry {0} not found")]
    NotFound(EntryId),

    #[error("entry {0} is not a playlist")]
    NotAPlaylist(EntryId),

    #[error(transparent)]
    Allocator(#[from] AllocatorError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;
