use sqlx::Row;

use crate::repository::StorageError;

/// Sorts a `sqlx` failure into the storage taxonomy.
///
/// Pool and I/O problems, and `SQLite` lock contention, are transient. Decode
/// failures are structural. Everything else is a rejected call.
pub(crate) fn classify(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StorageError::Connection(err.to_string()),
        sqlx::Error::Database(ref db) if is_lock_contention(db.message()) => {
            StorageError::Busy(err.to_string())
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. } => {
            StorageError::Serialization(err.to_string())
        }
        other => StorageError::Rejected(other.to_string()),
    }
}

fn is_lock_contention(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("database is locked") || message.contains("busy")
}

/// Reads every column of a row as text, in column order.
pub(crate) fn row_cells(row: &sqlx::sqlite::SqliteRow) -> Result<Vec<String>, StorageError> {
    let mut cells = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        cells.push(row.try_get::<String, _>(idx).map_err(classify)?);
    }
    Ok(cells)
}
