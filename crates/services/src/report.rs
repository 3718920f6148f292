use study_core::market::{self, Liquidity, Odds, Tally, TrajectoryPoint};
use study_core::model::{Catalog, ResponseRecord, StatementKind};

/// Aggregate estimate for one unresolved statement.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub statement: String,
    pub kind: StatementKind,
    pub tally: Tally,
    pub odds: Odds,
    /// Empty unless the report was built with trajectories.
    pub trajectory: Vec<TrajectoryPoint>,
}

/// A target and its negation. Coherent respondents push `p_true_sum` toward 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyCheck {
    pub target: String,
    pub control: String,
    pub p_true_sum: f64,
}

/// Market estimates over the whole response history.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyReport {
    pub respondents: usize,
    pub records: usize,
    pub markets: Vec<MarketSnapshot>,
    pub consistency: Vec<ConsistencyCheck>,
}

impl StudyReport {
    /// One snapshot per target/control statement in catalog order.
    ///
    /// Records for statements outside the catalog are counted in `records`
    /// but produce no snapshot.
    #[must_use]
    pub fn build(
        catalog: &Catalog,
        records: &[ResponseRecord],
        liquidity: Liquidity,
        with_trajectories: bool,
    ) -> Self {
        let markets: Vec<MarketSnapshot> = catalog
            .unresolved()
            .map(|statement| {
                let tally = Tally::of(records, statement.text());
                let trajectory = if with_trajectories {
                    market::trajectory(records, statement.text(), liquidity).collect()
                } else {
                    Vec::new()
                };
                MarketSnapshot {
                    statement: statement.text().to_owned(),
                    kind: statement.kind(),
                    tally,
                    odds: tally.odds(liquidity),
                    trajectory,
                }
            })
            .collect();

        let consistency = catalog
            .control_pairs()
            .into_iter()
            .map(|(target, control)| ConsistencyCheck {
                target: target.text().to_owned(),
                control: control.text().to_owned(),
                p_true_sum: market::snapshot(records, target.text(), liquidity).p_true
                    + market::snapshot(records, control.text(), liquidity).p_true,
            })
            .collect();

        let mut respondents: Vec<&str> = records.iter().map(|r| r.participant_id.as_str()).collect();
        respondents.sort_unstable();
        respondents.dedup();

        Self {
            respondents: respondents.len(),
            records: records.len(),
            markets,
            consistency,
        }
    }

    #[must_use]
    pub fn market(&self, statement: &str) -> Option<&MarketSnapshot> {
        self.markets.iter().find(|m| m.statement == statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{Answer, CompletionStatus, Statement};
    use study_core::time::fixed_now;

    fn catalog() -> Catalog {
        let target = Statement::target("MSFT lower").unwrap();
        let control = Statement::control_of(&target, "MSFT not lower").unwrap();
        Catalog::new(vec![
            target,
            control,
            Statement::test("Ice is cold", true).unwrap(),
        ])
        .unwrap()
    }

    fn record(participant: &str, statement: &str, answer: Answer, secs: i64) -> ResponseRecord {
        ResponseRecord {
            participant_id: participant.to_owned(),
            email: "no".to_owned(),
            statement_text: statement.to_owned(),
            answer,
            feedback: String::new(),
            timestamp: fixed_now() + chrono::Duration::seconds(secs),
            completion_status: CompletionStatus::Completed,
        }
    }

    #[test]
    fn snapshots_cover_unresolved_statements_only() {
        let records = vec![
            record("a", "MSFT lower", Answer::True, 0),
            record("b", "MSFT lower", Answer::True, 1),
            record("a", "MSFT not lower", Answer::False, 2),
            record("a", "Ice is cold", Answer::True, 3),
        ];
        let report = StudyReport::build(&catalog(), &records, Liquidity::default(), false);

        assert_eq!(report.respondents, 2);
        assert_eq!(report.records, 4);
        assert_eq!(report.markets.len(), 2);
        assert!(report.market("Ice is cold").is_none());

        let target = report.market("MSFT lower").unwrap();
        assert_eq!(target.tally, Tally { yes: 2, no: 0 });
        assert!(target.odds.p_true > 0.5);
        assert!(target.trajectory.is_empty());
    }

    #[test]
    fn empty_history_reports_even_odds() {
        let report = StudyReport::build(&catalog(), &[], Liquidity::default(), true);
        assert_eq!(report.respondents, 0);
        for market in &report.markets {
            assert_eq!(market.odds.p_true, 0.5);
            assert!(market.trajectory.is_empty());
        }
        assert_eq!(report.consistency.len(), 1);
        assert!((report.consistency[0].p_true_sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn trajectories_follow_timestamps() {
        let records = vec![
            record("b", "MSFT lower", Answer::False, 10),
            record("a", "MSFT lower", Answer::True, 0),
        ];
        let report = StudyReport::build(&catalog(), &records, Liquidity::default(), true);
        let points = &report.market("MSFT lower").unwrap().trajectory;
        assert_eq!(points.len(), 2);
        assert!(points[0].at < points[1].at);
        assert!(points[0].p_true > 0.5);
        assert!((points[1].p_true - 0.5).abs() < 1e-12);
    }

    #[test]
    fn coherent_answers_keep_pair_sum_near_one() {
        let records = vec![
            record("a", "MSFT lower", Answer::True, 0),
            record("a", "MSFT not lower", Answer::False, 1),
        ];
        let report = StudyReport::build(&catalog(), &records, Liquidity::default(), false);
        assert!((report.consistency[0].p_true_sum - 1.0).abs() < 1e-12);
    }
}
