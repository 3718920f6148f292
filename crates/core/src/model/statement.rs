use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatementError {
    #[error("statement text cannot be empty")]
    EmptyText,

    #[error("{kind} statements cannot carry ground truth")]
    UnexpectedGroundTruth { kind: StatementKind },

    #[error("test statements require ground truth")]
    MissingGroundTruth,

    #[error("neutral feedback is only valid for unresolved statements")]
    UnexpectedFeedback,

    #[error("control statements must mirror a target statement")]
    NotATarget,
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// Role a statement plays within a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// Unresolved forecasting claim probed for crowd belief.
    Target,
    /// Negation of a target, used to check aggregate self-consistency.
    Control,
    /// Claim with known ground truth, used to score the participant.
    Test,
}

impl StatementKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Target => "target",
            StatementKind::Control => "control",
            StatementKind::Test => "test",
        }
    }

    /// Returns true for kinds whose truth is not known when the study runs.
    #[must_use]
    pub fn is_unresolved(self) -> bool {
        !matches!(self, StatementKind::Test)
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── STATEMENT ─────────────────────────────────────────────────────────────────
//

/// Feedback shown after answering a statement whose truth is unknown.
pub const NEUTRAL_FEEDBACK: &str = "We do not know whether this statement is true or false";

/// A hidden statement shown to participants.
///
/// Target and control statements never carry ground truth; test statements
/// always do. Construct through [`Statement::target`], [`Statement::control`]
/// or [`Statement::test`] so that rule holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    text: String,
    kind: StatementKind,
    ground_truth: Option<bool>,
    feedback: Option<String>,
}

impl Statement {
    /// Creates an unresolved target statement.
    ///
    /// # Errors
    ///
    /// Returns `StatementError::EmptyText` if the text is blank.
    pub fn target(text: impl Into<String>) -> Result<Self, StatementError> {
        Self::unresolved(text, StatementKind::Target)
    }

    /// Creates a control statement.
    ///
    /// # Errors
    ///
    /// Returns `StatementError::EmptyText` if the text is blank.
    pub fn control(text: impl Into<String>) -> Result<Self, StatementError> {
        Self::unresolved(text, StatementKind::Control)
    }

    /// Creates the control statement mirroring `target`.
    ///
    /// The neutral feedback of the target is carried over.
    ///
    /// # Errors
    ///
    /// Returns `StatementError::NotATarget` if `target` is not a target statement,
    /// or `StatementError::EmptyText` if the text is blank.
    pub fn control_of(target: &Statement, text: impl Into<String>) -> Result<Self, StatementError> {
        if target.kind != StatementKind::Target {
            return Err(StatementError::NotATarget);
        }
        let mut control = Self::control(text)?;
        control.feedback.clone_from(&target.feedback);
        Ok(control)
    }

    /// Creates a test statement with known ground truth.
    ///
    /// # Errors
    ///
    /// Returns `StatementError::EmptyText` if the text is blank.
    pub fn test(text: impl Into<String>, ground_truth: bool) -> Result<Self, StatementError> {
        Ok(Self {
            text: non_empty(text)?,
            kind: StatementKind::Test,
            ground_truth: Some(ground_truth),
            feedback: None,
        })
    }

    /// Builds a statement from loosely typed parts, e.g. a catalog file entry.
    ///
    /// # Errors
    ///
    /// Returns `StatementError` when ground truth or feedback do not fit the kind.
    pub fn from_parts(
        text: impl Into<String>,
        kind: StatementKind,
        ground_truth: Option<bool>,
        feedback: Option<String>,
    ) -> Result<Self, StatementError> {
        let statement = match (kind, ground_truth) {
            (StatementKind::Test, Some(truth)) => Self::test(text, truth)?,
            (StatementKind::Test, None) => return Err(StatementError::MissingGroundTruth),
            (kind, Some(_)) => return Err(StatementError::UnexpectedGroundTruth { kind }),
            (kind, None) => Self::unresolved(text, kind)?,
        };
        match feedback {
            Some(feedback) => statement.with_feedback(feedback),
            None => Ok(statement),
        }
    }

    /// Replaces the neutral feedback shown for an unresolved statement.
    ///
    /// # Errors
    ///
    /// Returns `StatementError::UnexpectedFeedback` for test statements.
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Result<Self, StatementError> {
        if !self.kind.is_unresolved() {
            return Err(StatementError::UnexpectedFeedback);
        }
        self.feedback = Some(non_empty(feedback)?);
        Ok(self)
    }

    fn unresolved(text: impl Into<String>, kind: StatementKind) -> Result<Self, StatementError> {
        Ok(Self {
            text: non_empty(text)?,
            kind,
            ground_truth: None,
            feedback: None,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    #[must_use]
    pub fn ground_truth(&self) -> Option<bool> {
        self.ground_truth
    }

    #[must_use]
    pub fn is_test(&self) -> bool {
        self.kind == StatementKind::Test
    }

    /// Fixed feedback for unresolved statements; `None` for test statements.
    #[must_use]
    pub fn neutral_feedback(&self) -> Option<&str> {
        if self.kind.is_unresolved() {
            Some(self.feedback.as_deref().unwrap_or(NEUTRAL_FEEDBACK))
        } else {
            None
        }
    }
}

fn non_empty(text: impl Into<String>) -> Result<String, StatementError> {
    let text = text.into();
    if text.trim().is_empty() {
        return Err(StatementError::EmptyText);
    }
    Ok(text)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(Statement::target("  ").unwrap_err(), StatementError::EmptyText);
        assert_eq!(Statement::test("", true).unwrap_err(), StatementError::EmptyText);
    }

    #[test]
    fn unresolved_kinds_have_neutral_feedback() {
        let target = Statement::target("AAPL closes lower on May 13").unwrap();
        assert_eq!(target.ground_truth(), None);
        assert_eq!(target.neutral_feedback(), Some(NEUTRAL_FEEDBACK));

        let test = Statement::test("Water boils at 100C at sea level", true).unwrap();
        assert_eq!(test.ground_truth(), Some(true));
        assert_eq!(test.neutral_feedback(), None);
    }

    #[test]
    fn from_parts_enforces_ground_truth_rules() {
        let err = Statement::from_parts("x", StatementKind::Target, Some(true), None).unwrap_err();
        assert_eq!(
            err,
            StatementError::UnexpectedGroundTruth {
                kind: StatementKind::Target
            }
        );

        let err = Statement::from_parts("x", StatementKind::Test, None, None).unwrap_err();
        assert_eq!(err, StatementError::MissingGroundTruth);

        let err = Statement::from_parts("x", StatementKind::Test, Some(false), Some("hm".into()))
            .unwrap_err();
        assert_eq!(err, StatementError::UnexpectedFeedback);
    }

    #[test]
    fn control_of_copies_feedback_and_requires_target() {
        let target = Statement::target("MSFT rises")
            .unwrap()
            .with_feedback("Unknown yet")
            .unwrap();
        let control = Statement::control_of(&target, "MSFT does not rise").unwrap();
        assert_eq!(control.kind(), StatementKind::Control);
        assert_eq!(control.neutral_feedback(), Some("Unknown yet"));

        let err = Statement::control_of(&control, "again").unwrap_err();
        assert_eq!(err, StatementError::NotATarget);
    }
}
