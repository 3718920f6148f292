use std::sync::Arc;

use rand::Rng;
use study_core::model::{Answer, Catalog, ResponseRecord};
use study_core::Clock;

use super::controller::SessionController;
use super::progress::ScoreReport;
use super::state::SessionState;
use crate::config::StudyConfig;
use crate::error::{SessionError, StudyError};
use crate::persistence::{FlushMode, PersistenceAdapter};
use crate::report::StudyReport;

/// Result of answering the current statement through the study loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub record: ResponseRecord,
    pub is_complete: bool,
    pub score: ScoreReport,
}

/// Drives sessions against storage: submit, persist or buffer, then advance.
///
/// A failed save leaves the session where it was, with the statement unlocked
/// so the participant can answer it again.
#[derive(Clone)]
pub struct StudyLoopService {
    controller: SessionController,
    persistence: PersistenceAdapter,
    config: StudyConfig,
}

impl StudyLoopService {
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        clock: Clock,
        persistence: PersistenceAdapter,
        config: StudyConfig,
    ) -> Self {
        Self {
            controller: SessionController::new(catalog, clock),
            persistence,
            config,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    #[must_use]
    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for a blank id or email.
    pub fn start_session(
        &self,
        participant_id: &str,
        email: &str,
    ) -> Result<SessionState, SessionError> {
        self.controller.start(participant_id, email)
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` for a blank id or email.
    pub fn start_session_with_rng<R: Rng + ?Sized>(
        &self,
        participant_id: &str,
        email: &str,
        rng: &mut R,
    ) -> Result<SessionState, SessionError> {
        self.controller.start_with_rng(participant_id, email, rng)
    }

    /// Answer the current statement and move on.
    ///
    /// In per-response mode the record is written before advancing. In batched
    /// mode it is buffered, and answering the last statement flushes the whole
    /// buffer first.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Session` for state-machine violations and
    /// `StudyError::Persistence` when the save fails. After a save failure the
    /// statement can be answered again; records a batch did write stay
    /// flushed.
    pub async fn answer_current(
        &self,
        session: &mut SessionState,
        answer: Answer,
    ) -> Result<AnswerOutcome, StudyError> {
        let record = self.controller.submit(session, answer)?;

        match self.config.flush {
            FlushMode::PerResponse => {
                let saved = self.persistence.append(&record).await;
                if let Err(err) = saved {
                    self.controller.retract(session)?;
                    return Err(err.into());
                }
                session.mark_flushed(1);
            }
            FlushMode::Batched if session.is_last() => {
                let flushed = self.persistence.append_batch(session.pending()).await;
                if let Err(err) = flushed {
                    // Records before the failing one stay written; the current
                    // one never is, so it can be retracted.
                    session.mark_flushed(err.written());
                    self.controller.retract(session)?;
                    return Err(err.into());
                }
                let pending = session.pending().len();
                session.mark_flushed(pending);
            }
            FlushMode::Batched => {}
        }

        self.controller.advance(session)?;
        Ok(AnswerOutcome {
            record,
            is_complete: session.is_complete(),
            score: self.controller.score_report(session),
        })
    }

    /// Abandon the session and persist what was not yet saved, marked
    /// `incomplete`.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Session` if the session was already abandoned and
    /// `StudyError::Persistence` if the incomplete records could not be saved.
    pub async fn abandon(&self, session: &mut SessionState) -> Result<usize, StudyError> {
        let records = self.controller.abandon(session)?;
        let flushed = self.persistence.append_batch(&records).await;
        match flushed {
            Ok(written) => {
                session.mark_flushed(written);
                Ok(written)
            }
            Err(err) => {
                session.mark_flushed(err.written());
                Err(err.into())
            }
        }
    }

    /// Write every buffered record, for example after a failed batch flush on
    /// a completed session.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Persistence` with the written-prefix count.
    pub async fn flush_pending(&self, session: &mut SessionState) -> Result<usize, StudyError> {
        let flushed = self.persistence.append_batch(session.pending()).await;
        match flushed {
            Ok(written) => {
                session.mark_flushed(written);
                Ok(written)
            }
            Err(err) => {
                session.mark_flushed(err.written());
                Err(err.into())
            }
        }
    }

    /// Market report over the stored history.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Persistence` when the history cannot be read.
    pub async fn report(&self, with_trajectories: bool) -> Result<StudyReport, StudyError> {
        let records = self.persistence.load_records().await?;
        Ok(StudyReport::build(
            self.controller.catalog(),
            &records,
            self.config.liquidity,
            with_trajectories,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::repository::{InMemorySheet, Storage};
    use study_core::model::{CompletionStatus, Statement};
    use study_core::time::fixed_clock;

    use crate::retry::RetryPolicy;

    fn service(sheet: &InMemorySheet, flush: FlushMode) -> StudyLoopService {
        let catalog = Catalog::new(vec![
            Statement::target("AMZN higher").unwrap(),
            Statement::test("Ice is cold", true).unwrap(),
            Statement::test("Fire is cold", false).unwrap(),
        ])
        .unwrap();
        let storage = Storage::in_memory(sheet);
        StudyLoopService::new(
            Arc::new(catalog),
            fixed_clock(),
            PersistenceAdapter::from_storage(&storage, RetryPolicy::immediate(3)),
            StudyConfig {
                flush,
                ..StudyConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn per_response_mode_writes_each_answer() {
        let sheet = InMemorySheet::new();
        let service = service(&sheet, FlushMode::PerResponse);
        let mut session = service
            .start_session_with_rng("p1", "no", &mut StdRng::seed_from_u64(9))
            .unwrap();

        let outcome = service
            .answer_current(&mut session, Answer::True)
            .await
            .unwrap();
        assert!(!outcome.is_complete);
        assert_eq!(sheet.row_count().unwrap(), 1);
        assert!(session.pending().is_empty());
    }

    #[tokio::test]
    async fn batched_mode_flushes_on_last_statement() {
        let sheet = InMemorySheet::new();
        let service = service(&sheet, FlushMode::Batched);
        let mut session = service.start_session("p1", "no").unwrap();

        for _ in 0..2 {
            service
                .answer_current(&mut session, Answer::False)
                .await
                .unwrap();
            assert_eq!(sheet.row_count().unwrap(), 0);
        }
        let outcome = service
            .answer_current(&mut session, Answer::False)
            .await
            .unwrap();
        assert!(outcome.is_complete);
        assert_eq!(outcome.score.out_of, 2);
        assert_eq!(sheet.row_count().unwrap(), 3);
        assert!(session.pending().is_empty());
    }

    #[tokio::test]
    async fn abandon_persists_buffer_as_incomplete() {
        let sheet = InMemorySheet::new();
        let service = service(&sheet, FlushMode::Batched);
        let mut session = service.start_session("p1", "no").unwrap();
        service
            .answer_current(&mut session, Answer::True)
            .await
            .unwrap();

        assert_eq!(service.abandon(&mut session).await.unwrap(), 1);
        let records = service.persistence.load_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].completion_status, CompletionStatus::Incomplete);
        assert!(matches!(
            service.answer_current(&mut session, Answer::True).await,
            Err(StudyError::Session(SessionError::Abandoned))
        ));
    }

    #[tokio::test]
    async fn report_reads_stored_history() {
        let sheet = InMemorySheet::new();
        let service = service(&sheet, FlushMode::PerResponse);
        let mut session = service.start_session("p1", "no").unwrap();
        while !session.is_complete() {
            service
                .answer_current(&mut session, Answer::True)
                .await
                .unwrap();
        }

        let report = service.report(true).await.unwrap();
        assert_eq!(report.respondents, 1);
        let market = report.market("AMZN higher").unwrap();
        assert_eq!(market.tally.yes, 1);
        assert_eq!(market.trajectory.len(), 1);
    }
}
