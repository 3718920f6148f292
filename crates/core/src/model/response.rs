use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::format_row_timestamp;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("invalid answer label: {0}")]
    InvalidLabel(String),

    #[error("invalid completion status: {0}")]
    InvalidStatus(String),
}

//
// ─── ANSWER ───────────────────────────────────────────────────────────────────
//

/// A participant's answer to a hidden statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    /// Nothing selected yet. Never accepted as a submission.
    Unanswered,
    True,
    False,
}

impl Answer {
    /// Parses a stored label (`true`, `false`, `unanswered`), ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::InvalidLabel` for any other value.
    pub fn from_label(raw: &str) -> Result<Self, AnswerError> {
        let label = raw.trim();
        if label.eq_ignore_ascii_case("true") {
            Ok(Self::True)
        } else if label.eq_ignore_ascii_case("false") {
            Ok(Self::False)
        } else if label.eq_ignore_ascii_case("unanswered") {
            Ok(Self::Unanswered)
        } else {
            Err(AnswerError::InvalidLabel(raw.to_owned()))
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Answer::Unanswered => "unanswered",
            Answer::True => "true",
            Answer::False => "false",
        }
    }

    /// The boolean value of a real answer; `None` for `Unanswered`.
    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Answer::Unanswered => None,
            Answer::True => Some(true),
            Answer::False => Some(false),
        }
    }
}

impl From<bool> for Answer {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

//
// ─── COMPLETION STATUS ────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Completed,
    /// The participant abandoned the session before this record was flushed.
    Incomplete,
}

impl CompletionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::Completed => "completed",
            CompletionStatus::Incomplete => "incomplete",
        }
    }

    /// An empty value maps to `Completed`; rows written before the column
    /// existed carry none.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::InvalidStatus` for unknown labels.
    pub fn from_label(raw: &str) -> Result<Self, AnswerError> {
        let label = raw.trim();
        if label.is_empty() || label.eq_ignore_ascii_case("completed") {
            Ok(Self::Completed)
        } else if label.eq_ignore_ascii_case("incomplete") {
            Ok(Self::Incomplete)
        } else {
            Err(AnswerError::InvalidStatus(raw.to_owned()))
        }
    }
}

//
// ─── RESPONSE RECORD ──────────────────────────────────────────────────────────
//

/// Column names of a response row, in the order sinks must store them.
pub const RESPONSE_COLUMNS: [&str; 7] = [
    "participant_id",
    "email",
    "statement",
    "answer",
    "feedback",
    "timestamp",
    "completion_status",
];

/// One participant's answer to one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub participant_id: String,
    pub email: String,
    pub statement_text: String,
    pub answer: Answer,
    pub feedback: String,
    pub timestamp: DateTime<Utc>,
    pub completion_status: CompletionStatus,
}

impl ResponseRecord {
    /// Copy of this record with a different completion status.
    #[must_use]
    pub fn with_status(&self, status: CompletionStatus) -> Self {
        Self {
            completion_status: status,
            ..self.clone()
        }
    }

    /// Encodes the record as an ordered row matching [`RESPONSE_COLUMNS`].
    #[must_use]
    pub fn to_row(&self) -> ResponseRow {
        ResponseRow::new([
            self.participant_id.clone(),
            self.email.clone(),
            self.statement_text.clone(),
            self.answer.as_str().to_owned(),
            self.feedback.clone(),
            format_row_timestamp(self.timestamp),
            self.completion_status.as_str().to_owned(),
        ])
    }
}

/// Ordered cells handed to a response sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRow {
    cells: [String; 7],
}

impl ResponseRow {
    #[must_use]
    pub fn new(cells: [String; 7]) -> Self {
        Self { cells }
    }

    #[must_use]
    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
