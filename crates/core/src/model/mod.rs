mod catalog;
mod participant;
mod response;
mod statement;
mod table;

pub use catalog::{Catalog, CatalogError};
pub use participant::{EMAIL_OPT_OUT, Participant, ParticipantError};
pub use response::{
    Answer, AnswerError, CompletionStatus, RESPONSE_COLUMNS, ResponseRecord, ResponseRow,
};
pub use statement::{NEUTRAL_FEEDBACK, Statement, StatementError, StatementKind};
pub use table::{ResponseTable, TableError};
