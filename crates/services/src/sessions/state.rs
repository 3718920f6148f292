use std::fmt;

use study_core::model::{Participant, ResponseRecord, Statement};

use super::progress::SessionProgress;

/// Everything one participant's session needs between actions.
///
/// Owned by the caller and passed into every [`SessionController`] call; the
/// controller keeps no session state of its own. Fields are read-only outside
/// this crate so the lock and cursor invariants cannot be bypassed.
///
/// [`SessionController`]: super::SessionController
#[derive(Clone, PartialEq, Eq)]
pub struct SessionState {
    pub(crate) participant: Participant,
    pub(crate) queue: Vec<Statement>,
    pub(crate) cursor: usize,
    pub(crate) locked: bool,
    pub(crate) score: usize,
    pub(crate) responses: Vec<ResponseRecord>,
    pub(crate) flushed: usize,
    pub(crate) abandoned: bool,
}

impl SessionState {
    #[must_use]
    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    #[must_use]
    pub fn queue(&self) -> &[Statement] {
        &self.queue
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Correct answers to test statements so far.
    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    /// Every record produced in this session, in answer order.
    #[must_use]
    pub fn responses(&self) -> &[ResponseRecord] {
        &self.responses
    }

    /// Records not yet handed to the sink.
    #[must_use]
    pub fn pending(&self) -> &[ResponseRecord] {
        &self.responses[self.flushed..]
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.queue.len()
    }

    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// True when the current response is the one that finishes the queue.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor + 1 >= self.queue.len()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.queue.len(),
            answered: self.responses.len(),
            remaining: self.queue.len().saturating_sub(self.cursor),
            is_complete: self.is_complete(),
        }
    }

    pub(crate) fn mark_flushed(&mut self, count: usize) {
        self.flushed = (self.flushed + count).min(self.responses.len());
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("participant", &self.participant.id())
            .field("queue_len", &self.queue.len())
            .field("cursor", &self.cursor)
            .field("locked", &self.locked)
            .field("score", &self.score)
            .field("responses_len", &self.responses.len())
            .field("flushed", &self.flushed)
            .field("abandoned", &self.abandoned)
            .finish()
    }
}
