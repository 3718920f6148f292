use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;

use study_core::Clock;
use study_core::model::{
    Answer, Catalog, CompletionStatus, Participant, ResponseRecord, Statement,
};

use super::progress::ScoreReport;
use super::state::SessionState;
use crate::error::SessionError;

/// Feedback for a correctly answered test statement.
pub const FEEDBACK_CORRECT: &str = "Correct";
/// Feedback for a wrongly answered test statement.
pub const FEEDBACK_INCORRECT: &str = "Incorrect";

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Steps a participant through the catalog one locked statement at a time.
///
/// The controller only holds the catalog and a clock. Each call takes the
/// caller's [`SessionState`] and either applies one transition or fails
/// without touching it.
#[derive(Debug, Clone)]
pub struct SessionController {
    catalog: Arc<Catalog>,
    clock: Clock,
}

impl SessionController {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, clock: Clock) -> Self {
        Self { catalog, clock }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Start a session with a freshly shuffled queue.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` if the id or email is blank.
    pub fn start(&self, participant_id: &str, email: &str) -> Result<SessionState, SessionError> {
        self.start_with_rng(participant_id, email, &mut rand::rng())
    }

    /// Like [`start`](Self::start) with a caller-supplied random source.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` if the id or email is blank.
    pub fn start_with_rng<R: Rng + ?Sized>(
        &self,
        participant_id: &str,
        email: &str,
        rng: &mut R,
    ) -> Result<SessionState, SessionError> {
        let participant = Participant::new(participant_id, email)?;
        let mut queue = self.catalog.statements().to_vec();
        queue.shuffle(rng);

        tracing::debug!(
            participant = participant.id(),
            statements = queue.len(),
            "session started"
        );

        Ok(SessionState {
            participant,
            queue,
            cursor: 0,
            locked: false,
            score: 0,
            responses: Vec::new(),
            flushed: 0,
            abandoned: false,
        })
    }

    /// The statement waiting for (or holding) a response.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` past the end of the queue and
    /// `SessionError::Abandoned` after [`abandon`](Self::abandon).
    pub fn current<'s>(&self, session: &'s SessionState) -> Result<&'s Statement, SessionError> {
        if session.abandoned {
            return Err(SessionError::Abandoned);
        }
        session
            .queue
            .get(session.cursor)
            .ok_or(SessionError::Completed)
    }

    /// Lock in an answer for the current statement and record it.
    ///
    /// Test statements are scored against their ground truth; unresolved
    /// statements get their neutral feedback.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyLocked` when the current statement already
    /// has a response, `SessionError::InvalidAnswer` for `Answer::Unanswered`,
    /// and the errors of [`current`](Self::current).
    pub fn submit(
        &self,
        session: &mut SessionState,
        answer: Answer,
    ) -> Result<ResponseRecord, SessionError> {
        if session.abandoned {
            return Err(SessionError::Abandoned);
        }
        if session.locked {
            return Err(SessionError::AlreadyLocked);
        }
        let value = answer.as_bool().ok_or(SessionError::InvalidAnswer)?;
        let statement = self.current(session)?;

        let (feedback, correct) = match statement.ground_truth() {
            Some(truth) if truth == value => (FEEDBACK_CORRECT, true),
            Some(_) => (FEEDBACK_INCORRECT, false),
            None => (statement.neutral_feedback().unwrap_or_default(), false),
        };

        let record = ResponseRecord {
            participant_id: session.participant.id().to_owned(),
            email: session.participant.email().to_owned(),
            statement_text: statement.text().to_owned(),
            answer,
            feedback: feedback.to_owned(),
            timestamp: self.clock.now(),
            completion_status: CompletionStatus::Completed,
        };

        if correct {
            session.score += 1;
        }
        session.locked = true;
        session.responses.push(record.clone());
        Ok(record)
    }

    /// Move past a locked statement.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotLocked` if the current statement has no
    /// response, or `SessionError::Abandoned`.
    pub fn advance(&self, session: &mut SessionState) -> Result<(), SessionError> {
        if session.abandoned {
            return Err(SessionError::Abandoned);
        }
        if !session.locked {
            return Err(SessionError::NotLocked);
        }
        session.cursor += 1;
        session.locked = false;
        if session.is_complete() {
            tracing::debug!(
                participant = session.participant.id(),
                score = session.score,
                "session completed"
            );
        }
        Ok(())
    }

    /// Undo a locked submission that never reached the sink.
    ///
    /// The cursor stays put, so the same statement is presented again. Used
    /// when saving the response failed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotLocked` without a pending submission and
    /// `SessionError::AlreadyPersisted` if it was already flushed.
    pub fn retract(&self, session: &mut SessionState) -> Result<ResponseRecord, SessionError> {
        if session.abandoned {
            return Err(SessionError::Abandoned);
        }
        if !session.locked {
            return Err(SessionError::NotLocked);
        }
        if session.responses.len() <= session.flushed {
            return Err(SessionError::AlreadyPersisted);
        }
        let is_test = self.current(session)?.is_test();
        let record = session
            .responses
            .pop()
            .ok_or(SessionError::NotLocked)?;
        if is_test && record.feedback == FEEDBACK_CORRECT {
            session.score = session.score.saturating_sub(1);
        }
        session.locked = false;
        Ok(record)
    }

    /// End the session early.
    ///
    /// Unflushed records are marked `incomplete` and returned for
    /// persistence. The session accepts no further actions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Abandoned` if called twice.
    pub fn abandon(&self, session: &mut SessionState) -> Result<Vec<ResponseRecord>, SessionError> {
        if session.abandoned {
            return Err(SessionError::Abandoned);
        }
        session.abandoned = true;
        session.locked = false;

        let flushed = session.flushed;
        for record in &mut session.responses[flushed..] {
            record.completion_status = CompletionStatus::Incomplete;
        }

        tracing::debug!(
            participant = session.participant.id(),
            answered = session.responses.len(),
            total = session.queue.len(),
            "session abandoned"
        );
        Ok(session.responses[flushed..].to_vec())
    }

    /// Score so far against the number of test statements in the catalog.
    #[must_use]
    pub fn score_report(&self, session: &SessionState) -> ScoreReport {
        ScoreReport {
            correct: session.score,
            out_of: self.catalog.test_count(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
