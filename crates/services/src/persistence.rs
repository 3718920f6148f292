use std::sync::Arc;

use storage::repository::{ResponseSink, ResponseSource, Storage, StorageError};
use study_core::model::{ResponseRecord, ResponseTable, TableError};

use crate::error::PersistenceError;
use crate::retry::{RetryExhausted, RetryPolicy};

/// When session records reach the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushMode {
    /// Each answer is written before the session advances.
    #[default]
    PerResponse,
    /// Answers are buffered and written together when the session ends or is
    /// abandoned.
    Batched,
}

/// Sink and source behind one retry policy.
#[derive(Clone)]
pub struct PersistenceAdapter {
    sink: Arc<dyn ResponseSink>,
    source: Arc<dyn ResponseSource>,
    retry: RetryPolicy,
}

impl PersistenceAdapter {
    #[must_use]
    pub fn new(
        sink: Arc<dyn ResponseSink>,
        source: Arc<dyn ResponseSource>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            sink,
            source,
            retry,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, retry: RetryPolicy) -> Self {
        Self::new(Arc::clone(&storage.sink), Arc::clone(&storage.source), retry)
    }

    /// Write one record, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` once the retry policy gives up.
    pub async fn append(&self, record: &ResponseRecord) -> Result<(), PersistenceError> {
        let row = record.to_row();
        self.retry
            .run("append", || self.sink.append_row(&row))
            .await
            .map_err(|e| write_error(e, 0))
    }

    /// Write records in order, each under the retry policy.
    ///
    /// Not transactional: when a record fails for good, the records before it
    /// stay written and the error reports how many there were.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` carrying the written-prefix length.
    pub async fn append_batch(&self, records: &[ResponseRecord]) -> Result<usize, PersistenceError> {
        for (written, record) in records.iter().enumerate() {
            let row = record.to_row();
            self.retry
                .run("append_batch", || self.sink.append_row(&row))
                .await
                .map_err(|e| write_error(e, written))?;
        }
        tracing::info!(records = records.len(), "response batch flushed");
        Ok(records.len())
    }

    /// Read the whole response history.
    ///
    /// A structural failure of the structured read (such as repeated column
    /// headers) falls back to the raw-rows read with the first row as headers.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Read` when the source stays unreachable and
    /// `PersistenceError::Schema` when the raw rows are malformed too or cannot
    /// form a table.
    pub async fn load_all(&self) -> Result<ResponseTable, PersistenceError> {
        match self
            .retry
            .run("read_table", || self.source.read_table())
            .await
        {
            Ok(table) => Ok(table),
            Err(failed) if failed.source.is_structural() => {
                tracing::warn!(
                    error = %failed.source,
                    "structured read failed, falling back to raw rows"
                );
                let raw = self
                    .retry
                    .run("read_raw_rows", || self.source.read_raw_rows())
                    .await
                    .map_err(|failed| {
                        if failed.source.is_structural() {
                            PersistenceError::Schema(schema_error(failed.source))
                        } else {
                            read_error(failed)
                        }
                    })?;
                Ok(ResponseTable::from_raw_rows(raw)?)
            }
            Err(failed) => Err(read_error(failed)),
        }
    }

    /// [`load_all`](Self::load_all) parsed into records.
    ///
    /// # Errors
    ///
    /// As `load_all`, plus `PersistenceError::Schema` for unparseable rows.
    pub async fn load_records(&self) -> Result<Vec<ResponseRecord>, PersistenceError> {
        Ok(self.load_all().await?.records()?)
    }
}

fn write_error(e: RetryExhausted, written: usize) -> PersistenceError {
    PersistenceError::Write {
        attempts: e.attempts,
        written,
        source: e.source,
    }
}

fn schema_error(source: StorageError) -> TableError {
    match source {
        StorageError::DuplicateHeader(name) => TableError::DuplicateHeader(name),
        other => TableError::Unreadable(other.to_string()),
    }
}

fn read_error(e: RetryExhausted) -> PersistenceError {
    PersistenceError::Read {
        attempts: e.attempts,
        source: e.source,
    }
}
