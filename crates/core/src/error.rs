use thiserror::Error;

use crate::market::MarketError;
use crate::model::{AnswerError, CatalogError, ParticipantError, StatementError, TableError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Statement(#[from] StatementError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Participant(#[from] ParticipantError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Market(#[from] MarketError),
}
