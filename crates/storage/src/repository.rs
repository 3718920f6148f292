use async_trait::async_trait;
use study_core::model::{RESPONSE_COLUMNS, ResponseRow, ResponseTable, TableError};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend busy: {0}")]
    Busy(String),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("duplicate column header: {0}")]
    DuplicateHeader(String),
}

impl StorageError {
    /// Failures worth retrying: the same call may succeed a moment later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Connection(_) | StorageError::Busy(_))
    }

    /// Failures caused by the shape of the stored data rather than the backend.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            StorageError::DuplicateHeader(_) | StorageError::Serialization(_)
        )
    }
}

impl From<TableError> for StorageError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::DuplicateHeader(name) => StorageError::DuplicateHeader(name),
            other => StorageError::Serialization(other.to_string()),
        }
    }
}

/// Append-only destination for response rows.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    /// Append one row. A row is either stored whole or not at all.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn append_row(&self, row: &ResponseRow) -> Result<(), StorageError>;
}

/// Bulk reader over the stored response history.
#[async_trait]
pub trait ResponseSource: Send + Sync {
    /// Structured read. Requires unique column headers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DuplicateHeader` when headers repeat, or other
    /// storage errors.
    async fn read_table(&self) -> Result<ResponseTable, StorageError>;

    /// Every stored row as text, headers first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn read_raw_rows(&self) -> Result<Vec<Vec<String>>, StorageError>;
}

#[derive(Debug, Default)]
struct Sheet {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Spreadsheet-like in-memory store for testing and prototyping.
///
/// Rows are appended under a fixed header row, the way a shared sheet holds
/// them.
#[derive(Clone, Debug)]
pub struct InMemorySheet {
    sheet: Arc<Mutex<Sheet>>,
}

impl InMemorySheet {
    /// Empty sheet with the standard response columns.
    #[must_use]
    pub fn new() -> Self {
        Self::with_headers(RESPONSE_COLUMNS.iter().map(|c| (*c).to_owned()).collect())
    }

    /// Empty sheet with arbitrary headers, e.g. a hand-edited sheet.
    #[must_use]
    pub fn with_headers(headers: Vec<String>) -> Self {
        Self {
            sheet: Arc::new(Mutex::new(Sheet {
                headers,
                rows: Vec::new(),
            })),
        }
    }

    /// Number of stored data rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the sheet lock is poisoned.
    pub fn row_count(&self) -> Result<usize, StorageError> {
        let guard = self
            .sheet
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.rows.len())
    }
}

impl Default for InMemorySheet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseSink for InMemorySheet {
    async fn append_row(&self, row: &ResponseRow) -> Result<(), StorageError> {
        let mut guard = self
            .sheet
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.rows.push(row.cells().to_vec());
        Ok(())
    }
}

#[async_trait]
impl ResponseSource for InMemorySheet {
    async fn read_table(&self) -> Result<ResponseTable, StorageError> {
        let guard = self
            .sheet
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(ResponseTable::new(guard.headers.clone(), guard.rows.clone())?)
    }

    async fn read_raw_rows(&self) -> Result<Vec<Vec<String>>, StorageError> {
        let guard = self
            .sheet
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut raw = Vec::with_capacity(guard.rows.len() + 1);
        raw.push(guard.headers.clone());
        raw.extend(guard.rows.iter().cloned());
        Ok(raw)
    }
}

/// Sink and source behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sink: Arc<dyn ResponseSink>,
    pub source: Arc<dyn ResponseSource>,
}

impl Storage {
    /// Sink and source over one shared sheet.
    #[must_use]
    pub fn in_memory(sheet: &InMemorySheet) -> Self {
        let sink: Arc<dyn ResponseSink> = Arc::new(sheet.clone());
        let source: Arc<dyn ResponseSource> = Arc::new(sheet.clone());
        Self { sink, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{Answer, CompletionStatus, ResponseRecord};
    use study_core::time::fixed_now;

    fn row(statement: &str) -> ResponseRow {
        ResponseRecord {
            participant_id: "p1".into(),
            email: "no".into(),
            statement_text: statement.into(),
            answer: Answer::False,
            feedback: "Incorrect".into(),
            timestamp: fixed_now(),
            completion_status: CompletionStatus::Completed,
        }
        .to_row()
    }

    #[tokio::test]
    async fn appended_rows_read_back_in_order() {
        let sheet = InMemorySheet::new();
        sheet.append_row(&row("first")).await.unwrap();
        sheet.append_row(&row("second")).await.unwrap();

        let table = sheet.read_table().await.unwrap();
        let records = table.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].statement_text, "first");
        assert_eq!(records[1].statement_text, "second");
        assert_eq!(sheet.row_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_headers_fail_structured_read_only() {
        let mut headers: Vec<String> = RESPONSE_COLUMNS.iter().map(|c| (*c).to_owned()).collect();
        headers.push("feedback".into());
        let sheet = InMemorySheet::with_headers(headers);
        sheet.append_row(&row("s")).await.unwrap();

        let err = sheet.read_table().await.unwrap_err();
        assert_eq!(err, StorageError::DuplicateHeader("feedback".into()));
        assert!(err.is_structural());
        assert!(!err.is_transient());

        let raw = sheet.read_raw_rows().await.unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].len(), RESPONSE_COLUMNS.len() + 1);
    }

    #[tokio::test]
    async fn in_memory_storage_shares_one_sheet() {
        let sheet = InMemorySheet::new();
        let storage = Storage::in_memory(&sheet);
        storage.sink.append_row(&row("shared")).await.unwrap();

        assert_eq!(sheet.row_count().unwrap(), 1);
        let table = storage.source.read_table().await.unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn transient_classification() {
        assert!(StorageError::Connection("reset".into()).is_transient());
        assert!(StorageError::Busy("locked".into()).is_transient());
        assert!(!StorageError::Rejected("quota".into()).is_transient());
    }
}
