use std::collections::HashSet;

use thiserror::Error;

use crate::model::statement::{Statement, StatementKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog has no statements")]
    Empty,

    #[error("duplicate statement text: {0}")]
    DuplicateText(String),
}

/// The full set of statements shown in one study run.
///
/// Statement text is unique within a catalog; nothing checks uniqueness across
/// catalogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    statements: Vec<Statement>,
}

impl Catalog {
    /// # Errors
    ///
    /// Returns `CatalogError::Empty` for an empty list and
    /// `CatalogError::DuplicateText` when two statements share their text.
    pub fn new(statements: Vec<Statement>) -> Result<Self, CatalogError> {
        if statements.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::with_capacity(statements.len());
        for statement in &statements {
            if !seen.insert(statement.text()) {
                return Err(CatalogError::DuplicateText(statement.text().to_owned()));
            }
        }
        Ok(Self { statements })
    }

    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn of_kind(&self, kind: StatementKind) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(move |s| s.kind() == kind)
    }

    /// Statements whose truth is unknown: targets and controls.
    pub fn unresolved(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(|s| s.kind().is_unresolved())
    }

    /// Number of test statements; the denominator of a participant's score.
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.of_kind(StatementKind::Test).count()
    }

    #[must_use]
    pub fn get(&self, text: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.text() == text)
    }

    /// Pairs each target with a control, in catalog order.
    ///
    /// The n-th target is paired with the n-th control; unmatched statements
    /// are left out.
    #[must_use]
    pub fn control_pairs(&self) -> Vec<(&Statement, &Statement)> {
        self.of_kind(StatementKind::Target)
            .zip(self.of_kind(StatementKind::Control))
            .collect()
    }
}
