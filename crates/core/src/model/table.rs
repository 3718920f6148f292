use thiserror::Error;

use crate::model::response::{
    Answer, AnswerError, CompletionStatus, RESPONSE_COLUMNS, ResponseRecord,
};
use crate::time::parse_row_timestamp;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TableError {
    #[error("response table has no header row")]
    MissingHeader,

    #[error("duplicate column header: {0}")]
    DuplicateHeader(String),

    #[error("missing column: {0}")]
    MissingColumn(&'static str),

    #[error("row {row}: {source}")]
    InvalidAnswer {
        row: usize,
        #[source]
        source: AnswerError,
    },

    #[error("row {row}: invalid completion status: {source}")]
    InvalidStatus {
        row: usize,
        #[source]
        source: AnswerError,
    },

    #[error("row {row}: invalid timestamp {raw:?}")]
    InvalidTimestamp { row: usize, raw: String },

    #[error("response rows are unreadable: {0}")]
    Unreadable(String),
}

/// Tabular view of the stored response history.
///
/// Cells are kept as text, the way spreadsheet-like backends hand them out.
/// Column lookup is by header name; when headers repeat, the first one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResponseTable {
    /// Structured constructor: headers must be unique.
    ///
    /// # Errors
    ///
    /// Returns `TableError::DuplicateHeader` when a header repeats.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TableError> {
        for (i, header) in headers.iter().enumerate() {
            if headers[..i].contains(header) {
                return Err(TableError::DuplicateHeader(header.clone()));
            }
        }
        Ok(Self { headers, rows })
    }

    /// Rebuilds a table from raw rows, taking the first row as headers.
    ///
    /// Repeated headers are tolerated here.
    ///
    /// # Errors
    ///
    /// Returns `TableError::MissingHeader` when there are no rows at all.
    pub fn from_raw_rows(raw: Vec<Vec<String>>) -> Result<Self, TableError> {
        let mut rows = raw.into_iter();
        let headers = rows.next().ok_or(TableError::MissingHeader)?;
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(TableError::MissingHeader);
        }
        Ok(Self {
            headers,
            rows: rows.collect(),
        })
    }

    /// Empty table carrying the standard response columns.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            headers: RESPONSE_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    fn require(&self, name: &'static str) -> Result<usize, TableError> {
        self.column(name).ok_or(TableError::MissingColumn(name))
    }

    /// Parses every row into a `ResponseRecord`.
    ///
    /// Short rows read missing cells as empty. A missing `completion_status`
    /// column means every row is `completed`.
    ///
    /// # Errors
    ///
    /// Returns `TableError` when a required column is absent or a cell cannot
    /// be parsed. Row numbers are 1-based data rows.
    pub fn records(&self) -> Result<Vec<ResponseRecord>, TableError> {
        let participant = self.require("participant_id")?;
        let email = self.require("email")?;
        let statement = self.require("statement")?;
        let answer = self.require("answer")?;
        let feedback = self.require("feedback")?;
        let timestamp = self.require("timestamp")?;
        let status = self.column("completion_status");

        let mut out = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let row_no = i + 1;
            let cell = |idx: usize| row.get(idx).map_or("", String::as_str);

            let parsed_answer = Answer::from_label(cell(answer))
                .map_err(|source| TableError::InvalidAnswer { row: row_no, source })?;
            let raw_ts = cell(timestamp);
            let parsed_ts =
                parse_row_timestamp(raw_ts).ok_or_else(|| TableError::InvalidTimestamp {
                    row: row_no,
                    raw: raw_ts.to_owned(),
                })?;
            let completion_status = match status {
                Some(idx) => CompletionStatus::from_label(cell(idx))
                    .map_err(|source| TableError::InvalidStatus { row: row_no, source })?,
                None => CompletionStatus::Completed,
            };

            out.push(ResponseRecord {
                participant_id: cell(participant).to_owned(),
                email: cell(email).to_owned(),
                statement_text: cell(statement).to_owned(),
                answer: parsed_answer,
                feedback: cell(feedback).to_owned(),
                timestamp: parsed_ts,
                completion_status,
            });
        }
        Ok(out)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_owned()).collect()
    }

    fn header() -> Vec<String> {
        RESPONSE_COLUMNS.iter().map(|c| (*c).to_owned()).collect()
    }

    #[test]
    fn structured_table_rejects_duplicate_headers() {
        let err = ResponseTable::new(strings(&["a", "b", "a"]), Vec::new()).unwrap_err();
        assert_eq!(err, TableError::DuplicateHeader("a".into()));
    }

    #[test]
    fn raw_rows_use_first_row_as_header() {
        let table = ResponseTable::from_raw_rows(vec![
            strings(&[
                "participant_id", "email", "statement", "answer", "feedback", "feedback",
                "timestamp",
            ]),
            strings(&["p1", "no", "s1", "true", "ok", "dup", "2023-11-14 22:13:20"]),
        ])
        .unwrap();
        let records = table.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].feedback, "ok");
        assert_eq!(records[0].timestamp, fixed_now());
        assert_eq!(records[0].completion_status, CompletionStatus::Completed);
    }

    #[test]
    fn raw_rows_without_header_fail() {
        assert_eq!(
            ResponseTable::from_raw_rows(Vec::new()).unwrap_err(),
            TableError::MissingHeader
        );
    }

    #[test]
    fn records_report_bad_cells_with_row_number() {
        let table = ResponseTable::new(
            header(),
            vec![
                strings(&["p1", "e", "s", "true", "f", "2023-11-14 22:13:20", "completed"]),
                strings(&["p2", "e", "s", "perhaps", "f", "2023-11-14 22:13:20", ""]),
            ],
        )
        .unwrap();
        assert!(matches!(
            table.records().unwrap_err(),
            TableError::InvalidAnswer { row: 2, .. }
        ));
    }

    #[test]
    fn short_rows_read_missing_status_as_completed() {
        let table = ResponseTable::new(
            header(),
            vec![strings(&["p1", "no", "s1", "false", "", "2023-11-14 22:13:20"])],
        )
        .unwrap();
        let records = table.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].answer, Answer::False);
        assert_eq!(records[0].completion_status, CompletionStatus::Completed);
    }

    #[test]
    fn bad_status_cell_names_the_status_column() {
        let table = ResponseTable::new(
            header(),
            vec![strings(&["p1", "no", "s1", "true", "", "2023-11-14 22:13:20", "paused"])],
        )
        .unwrap();
        let err = table.records().unwrap_err();
        assert!(matches!(err, TableError::InvalidStatus { row: 1, .. }));
        assert!(err.to_string().contains("completion status"));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let table = ResponseTable::new(strings(&["participant_id"]), Vec::new()).unwrap();
        assert_eq!(
            table.records().unwrap_err(),
            TableError::MissingColumn("email")
        );
        assert!(ResponseTable::empty().records().unwrap().is_empty());
    }
}
