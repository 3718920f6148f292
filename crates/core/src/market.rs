//! Crowd-belief estimate for unresolved statements.
//!
//! The estimate is a softmax over the yes/no tallies:
//!
//! ```text
//! p_true = e^(yes/b) / (e^(yes/b) + e^(no/b))
//! ```
//!
//! where `b` is the liquidity. The formula borrows the shape of an LMSR price,
//! but there is no share inventory, no subsidy and no trading cost: it is a
//! smoothing heuristic over counts and carries none of the bounded-loss
//! guarantees of a real automated market maker.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Answer, ResponseRecord};

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum MarketError {
    #[error("liquidity must be a finite value > 0, got {0}")]
    InvalidLiquidity(f64),
}

//
// ─── LIQUIDITY ────────────────────────────────────────────────────────────────
//

/// Sensitivity of the estimate to count imbalance.
///
/// Larger values flatten the curve toward 0.5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Liquidity(f64);

impl Liquidity {
    /// # Errors
    ///
    /// Returns `MarketError::InvalidLiquidity` unless `value` is finite and > 0.
    pub fn new(value: f64) -> Result<Self, MarketError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(MarketError::InvalidLiquidity(value))
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Liquidity {
    fn default() -> Self {
        Self(1.0)
    }
}

//
// ─── ODDS ─────────────────────────────────────────────────────────────────────
//

/// Probability that a statement resolves true, and its complement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Odds {
    pub p_true: f64,
    pub p_false: f64,
}

/// Yes/no counts for one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub yes: u32,
    pub no: u32,
}

impl Tally {
    /// Counts `true`/`false` answers for `statement_text`. Unanswered records
    /// are ignored.
    #[must_use]
    pub fn of(records: &[ResponseRecord], statement_text: &str) -> Self {
        let mut tally = Self::default();
        for record in records.iter().filter(|r| r.statement_text == statement_text) {
            tally.record(record.answer);
        }
        tally
    }

    pub fn record(&mut self, answer: Answer) {
        match answer {
            Answer::True => self.yes = self.yes.saturating_add(1),
            Answer::False => self.no = self.no.saturating_add(1),
            Answer::Unanswered => {}
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.yes.saturating_add(self.no)
    }

    #[must_use]
    pub fn odds(&self, liquidity: Liquidity) -> Odds {
        score_function(self.yes, self.no, liquidity)
    }
}

/// Converts yes/no counts into `(p_true, p_false)`.
///
/// Evaluated as `1 / (1 + e^((no - yes) / b))`, which equals the softmax form
/// but stays finite for large counts.
#[must_use]
pub fn score_function(yes: u32, no: u32, liquidity: Liquidity) -> Odds {
    let b = liquidity.value();
    let diff = (f64::from(no) - f64::from(yes)) / b;
    let p_true = 1.0 / (1.0 + diff.exp());
    Odds {
        p_true,
        p_false: 1.0 - p_true,
    }
}

/// Current estimate for one statement over all records.
#[must_use]
pub fn snapshot(records: &[ResponseRecord], statement_text: &str, liquidity: Liquidity) -> Odds {
    Tally::of(records, statement_text).odds(liquidity)
}

//
// ─── TRAJECTORY ───────────────────────────────────────────────────────────────
//

/// Estimate after one more respondent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub at: DateTime<Utc>,
    pub p_true: f64,
}

/// Estimate after each matching record, in timestamp order.
///
/// Finite and single-pass over the sorted answers. Call [`trajectory`] again
/// to recompute it from the full record set.
#[derive(Debug, Clone)]
pub struct Trajectory {
    answers: Vec<(DateTime<Utc>, Answer)>,
    next: usize,
    tally: Tally,
    liquidity: Liquidity,
}

impl Iterator for Trajectory {
    type Item = TrajectoryPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let (at, answer) = *self.answers.get(self.next)?;
        self.next += 1;
        self.tally.record(answer);
        Some(TrajectoryPoint {
            at,
            p_true: self.tally.odds(self.liquidity).p_true,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.answers.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Trajectory {}

/// Probability trajectory for one statement.
///
/// Records sharing a timestamp keep their relative order.
#[must_use]
pub fn trajectory(
    records: &[ResponseRecord],
    statement_text: &str,
    liquidity: Liquidity,
) -> Trajectory {
    let mut answers: Vec<_> = records
        .iter()
        .filter(|r| r.statement_text == statement_text)
        .map(|r| (r.timestamp, r.answer))
        .collect();
    answers.sort_by_key(|(at, _)| *at);
    Trajectory {
        answers,
        next: 0,
        tally: Tally::default(),
        liquidity,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
