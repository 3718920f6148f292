use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParticipantError {
    #[error("participant id cannot be empty")]
    MissingId,

    #[error("email cannot be empty")]
    MissingEmail,
}

/// Email literal meaning "do not send me the results".
pub const EMAIL_OPT_OUT: &str = "no";

/// Identity supplied by a participant when starting a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    id: String,
    email: String,
}

impl Participant {
    /// Both fields are trimmed; blank values are rejected.
    ///
    /// # Errors
    ///
    /// Returns `ParticipantError::MissingId` or `ParticipantError::MissingEmail`.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Result<Self, ParticipantError> {
        let id = id.into().trim().to_owned();
        if id.is_empty() {
            return Err(ParticipantError::MissingId);
        }
        let email = email.into().trim().to_owned();
        if email.is_empty() {
            return Err(ParticipantError::MissingEmail);
        }
        Ok(Self { id, email })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// False when the participant typed the opt-out literal instead of an address.
    #[must_use]
    pub fn wants_results(&self) -> bool {
        !self.email.eq_ignore_ascii_case(EMAIL_OPT_OUT)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_fields() {
        assert_eq!(Participant::new(" ", "a@b.c"), Err(ParticipantError::MissingId));
        assert_eq!(Participant::new("p1", ""), Err(ParticipantError::MissingEmail));
    }

    #[test]
    fn opt_out_literal_disables_results() {
        let p = Participant::new("p1", "No").unwrap();
        assert!(!p.wants_results());
        let p = Participant::new(" p2 ", "p2@example.org").unwrap();
        assert_eq!(p.id(), "p2");
        assert!(p.wants_results());
    }
}
