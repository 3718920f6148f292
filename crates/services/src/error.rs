//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use study_core::market::MarketError;
use study_core::model::{ParticipantError, TableError};

/// State-machine failures of a participant session.
///
/// Apart from `InvalidInput`, these mean the caller ignored the lock state and
/// should not be swallowed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    InvalidInput(#[from] ParticipantError),
    #[error("current statement already has a response")]
    AlreadyLocked,
    #[error("current statement has no response yet")]
    NotLocked,
    #[error("answer must be true or false")]
    InvalidAnswer,
    #[error("session already completed")]
    Completed,
    #[error("session was abandoned")]
    Abandoned,
    #[error("pending response was already persisted")]
    AlreadyPersisted,
}

/// Sink/source failures once the retry policy has given up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("write failed after {attempts} attempt(s), {written} record(s) persisted: {source}")]
    Write {
        attempts: u32,
        written: usize,
        #[source]
        source: StorageError,
    },
    #[error("read failed after {attempts} attempt(s): {source}")]
    Read {
        attempts: u32,
        #[source]
        source: StorageError,
    },
    #[error("response table is unreadable: {0}")]
    Schema(#[from] TableError),
}

impl PersistenceError {
    /// Records stored before the failure; the prefix of a batch stays stored.
    #[must_use]
    pub fn written(&self) -> usize {
        match self {
            PersistenceError::Write { written, .. } => *written,
            _ => 0,
        }
    }
}

/// Errors emitted by the study loop, which drives sessions against storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudyError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors emitted while reading configuration or catalog files.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {key}: {raw:?}")]
    InvalidValue { key: &'static str, raw: String },
    #[error("configuration could not be extracted: {0}")]
    Figment(#[from] figment::Error),
    #[error(transparent)]
    Liquidity(#[from] MarketError),
    #[error("catalog file could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog entry {index}: {source}")]
    Entry {
        index: usize,
        #[source]
        source: study_core::Error,
    },
    #[error(transparent)]
    Catalog(#[from] study_core::Error),
}
