use std::error::Error;
use std::io::{BufRead, Write};

use services::{SessionState, StudyError, StudyLoopService, StudyReport};
use study_core::model::Answer;

/// How an interactive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Completed,
    Abandoned,
}

enum Input {
    Answer(Answer),
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    match line.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" => Input::Answer(Answer::True),
        "f" | "false" | "n" | "no" => Input::Answer(Answer::False),
        "q" | "quit" => Input::Quit,
        _ => Input::Unknown,
    }
}

/// Presents statements one at a time until the queue is done or the
/// participant quits. End of input counts as quitting.
///
/// # Errors
///
/// Returns I/O errors and study errors other than a failed save, which is
/// reported and lets the participant answer again.
pub async fn run_session<R: BufRead, W: Write>(
    study: &StudyLoopService,
    session: &mut SessionState,
    input: &mut R,
    out: &mut W,
) -> Result<SessionEnd, Box<dyn Error>> {
    let total = session.queue().len();
    while !session.is_complete() {
        let text = study.controller().current(session)?.text().to_owned();
        writeln!(out)?;
        writeln!(out, "[{}/{}] {}", session.cursor() + 1, total, text)?;
        write!(out, "(t)rue, (f)alse or (q)uit: ")?;
        out.flush()?;

        let mut line = String::new();
        let choice = if input.read_line(&mut line)? == 0 {
            Input::Quit
        } else {
            parse_input(&line)
        };

        match choice {
            Input::Answer(answer) => match study.answer_current(session, answer).await {
                Ok(outcome) => writeln!(out, "{}", outcome.record.feedback)?,
                Err(StudyError::Persistence(err)) => {
                    tracing::error!(error = %err, "response not saved");
                    writeln!(out, "Your answer could not be saved, please answer again.")?;
                }
                Err(err) => return Err(err.into()),
            },
            Input::Quit => {
                study.abandon(session).await?;
                writeln!(out)?;
                writeln!(
                    out,
                    "Session ended early after {} of {} answer(s).",
                    session.responses().len(),
                    total
                )?;
                return Ok(SessionEnd::Abandoned);
            }
            Input::Unknown => writeln!(out, "Please type t, f or q.")?,
        }
    }

    let score = study.controller().score_report(session);
    writeln!(out)?;
    writeln!(
        out,
        "You answered {} of {} known statements correctly.",
        score.correct, score.out_of
    )?;
    if session.participant().wants_results() {
        writeln!(
            out,
            "Results will be sent to {} once the outcomes are known.",
            session.participant().email()
        )?;
    }
    Ok(SessionEnd::Completed)
}

/// Prints market snapshots, pair consistency and, when present, trajectories.
///
/// # Errors
///
/// Returns I/O errors from `out`.
pub fn print_report<W: Write>(report: &StudyReport, out: &mut W) -> std::io::Result<()> {
    writeln!(
        out,
        "{} respondent(s), {} response(s)",
        report.respondents, report.records
    )?;
    for market in &report.markets {
        writeln!(out)?;
        writeln!(out, "{} [{}]", market.statement, market.kind)?;
        writeln!(
            out,
            "  yes {:>4}  no {:>4}  p(true) {:.3}  p(false) {:.3}",
            market.tally.yes, market.tally.no, market.odds.p_true, market.odds.p_false
        )?;
        for point in &market.trajectory {
            writeln!(
                out,
                "    {}  {:.3}",
                study_core::time::format_row_timestamp(point.at),
                point.p_true
            )?;
        }
    }
    if !report.consistency.is_empty() {
        writeln!(out)?;
        writeln!(out, "Target/control consistency (1.000 is coherent):")?;
        for check in &report.consistency {
            writeln!(out, "  {:.3}  {}", check.p_true_sum, check.target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use services::{Clock, PersistenceAdapter, RetryPolicy, StudyConfig};
    use storage::repository::{InMemorySheet, Storage};
    use study_core::market::Liquidity;
    use study_core::model::{Catalog, Statement};
    use study_core::time::fixed_now;

    fn study(sheet: &InMemorySheet) -> StudyLoopService {
        let catalog = Catalog::new(vec![
            Statement::target("MSFT lower").unwrap(),
            Statement::test("Ice is cold", true).unwrap(),
        ])
        .unwrap();
        let storage = Storage::in_memory(sheet);
        StudyLoopService::new(
            Arc::new(catalog),
            Clock::fixed(fixed_now()),
            PersistenceAdapter::from_storage(&storage, RetryPolicy::immediate(1)),
            StudyConfig::default(),
        )
    }

    #[tokio::test]
    async fn answers_every_statement_and_prints_score() {
        let sheet = InMemorySheet::new();
        let study = study(&sheet);
        let mut session = study.start_session("p1", "p1@example.org").unwrap();
        let mut input = Cursor::new("maybe\nt\ntrue\n");
        let mut out = Vec::new();

        let end = run_session(&study, &mut session, &mut input, &mut out)
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(end, SessionEnd::Completed);
        assert_eq!(sheet.row_count().unwrap(), 2);
        assert!(out.contains("Please type t, f or q."));
        assert!(out.contains("You answered 1 of 1 known statements correctly."));
        assert!(out.contains("p1@example.org"));
    }

    #[tokio::test]
    async fn end_of_input_abandons() {
        let sheet = InMemorySheet::new();
        let study = study(&sheet);
        let mut session = study.start_session("p1", "no").unwrap();
        let mut input = Cursor::new("f\n");
        let mut out = Vec::new();

        let end = run_session(&study, &mut session, &mut input, &mut out)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Abandoned);
        assert!(session.is_abandoned());
        assert_eq!(sheet.row_count().unwrap(), 1);
    }

    #[test]
    fn report_lists_markets() {
        let catalog = Catalog::new(vec![Statement::target("MSFT lower").unwrap()]).unwrap();
        let report = StudyReport::build(&catalog, &[], Liquidity::default(), false);
        let mut out = Vec::new();
        print_report(&report, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("0 respondent(s), 0 response(s)"));
        assert!(out.contains("MSFT lower [target]"));
        assert!(out.contains("p(true) 0.500"));
    }
}
