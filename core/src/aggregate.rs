//! Running aggregates over the whole run.
//!
//! O(1) memory per transaction: counters, a score histogram, and
//! per-reason frequencies. summarize() consumes the aggregator, so a
//! run can only ever be finalized once.

use crate::config::EngineConfig;
use crate::rules::ScoredTransaction;
use crate::types::Score;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many reason codes the summary lists.
pub const TOP_REASONS_LIMIT: usize = 10;

#[derive(Debug, Default)]
pub struct RunAggregator {
    total_rows: u64,
    parse_failures: u64,
    flagged: u64,
    score_histogram: BTreeMap<Score, u64>,
    reason_counts: BTreeMap<String, u64>,
}

impl RunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one row that failed to parse.
    pub fn record_failure(&mut self) {
        self.total_rows += 1;
        self.parse_failures += 1;
    }

    /// Fold in one scored transaction.
    pub fn record_scored(&mut self, scored: &ScoredTransaction, flagged: bool) {
        self.total_rows += 1;
        if flagged {
            self.flagged += 1;
        }
        *self.score_histogram.entry(scored.score).or_insert(0) += 1;
        for reason in &scored.reasons {
            *self.reason_counts.entry(reason.code.to_string()).or_insert(0) += 1;
        }
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn parse_failures(&self) -> u64 {
        self.parse_failures
    }

    pub fn flagged(&self) -> u64 {
        self.flagged
    }

    /// Finalize the run. Consuming self means a second summary for
    /// the same run cannot even compile.
    pub fn summarize(self, config: &EngineConfig) -> SummaryDocument {
        let parsed_rows = self.total_rows - self.parse_failures;
        let scored_total: u64 = self.score_histogram.values().sum();
        assert_eq!(
            scored_total, parsed_rows,
            "score histogram does not cover every parsed row"
        );
        assert!(
            self.flagged <= parsed_rows,
            "flagged count {} exceeds parsed rows {}",
            self.flagged,
            parsed_rows
        );

        let flagged_rate_pct = if parsed_rows == 0 {
            0.0
        } else {
            self.flagged as f64 * 100.0 / parsed_rows as f64
        };

        let mut top_reasons: Vec<ReasonCount> = self
            .reason_counts
            .into_iter()
            .map(|(code, count)| ReasonCount { code, count })
            .collect();
        // Most frequent first; ties break on code so output is stable.
        top_reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));
        top_reasons.truncate(TOP_REASONS_LIMIT);

        SummaryDocument {
            total_rows: self.total_rows,
            parsed_rows,
            parse_failures: self.parse_failures,
            flagged_count: self.flagged,
            flagged_rate_pct,
            threshold: config.threshold,
            simulation_enabled: config.simulation,
            score_distribution: self.score_histogram,
            top_reasons,
        }
    }
}

/// One reason code with its run-wide fire count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasonCount {
    pub code: String,
    pub count: u64,
}

/// The run summary written as summary.json. The dashboard reads this
/// file verbatim, so field names are part of the output contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryDocument {
    pub total_rows: u64,
    pub parsed_rows: u64,
    pub parse_failures: u64,
    pub flagged_count: u64,
    pub flagged_rate_pct: f64,
    pub threshold: Score,
    pub simulation_enabled: bool,
    /// Risk-score distribution over parsed rows.
    pub score_distribution: BTreeMap<Score, u64>,
    /// The most frequent reason codes, capped at TOP_REASONS_LIMIT.
    pub top_reasons: Vec<ReasonCount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Reason;
    use crate::transaction::Transaction;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap as Map;

    fn scored(score: Score, reason_codes: &[&'static str]) -> ScoredTransaction {
        let reasons = reason_codes
            .iter()
            .map(|code| Reason {
                code,
                description: format!("{code} fired"),
                weight: 1,
            })
            .collect();
        ScoredTransaction {
            transaction: Transaction {
                transaction_id: "T1".to_string(),
                entity_id: "E1".to_string(),
                timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
                amount: 10.0,
                extras: Map::new(),
            },
            reasons,
            score,
        }
    }

    #[test]
    fn counts_and_rate_add_up() {
        let mut agg = RunAggregator::new();
        agg.record_scored(&scored(5, &["A", "B"]), true);
        agg.record_scored(&scored(0, &[]), false);
        agg.record_failure();

        let summary = agg.summarize(&EngineConfig::default());
        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.parsed_rows, 2);
        assert_eq!(summary.parse_failures, 1);
        assert_eq!(summary.flagged_count, 1);
        assert_eq!(summary.flagged_rate_pct, 50.0);
        assert_eq!(summary.score_distribution.get(&5), Some(&1));
        assert_eq!(summary.score_distribution.get(&0), Some(&1));
    }

    #[test]
    fn top_reasons_sort_by_count_then_code() {
        let mut agg = RunAggregator::new();
        agg.record_scored(&scored(2, &["ZZZ", "MMM"]), false);
        agg.record_scored(&scored(2, &["ZZZ", "AAA"]), false);
        agg.record_scored(&scored(1, &["MMM"]), false);

        let summary = agg.summarize(&EngineConfig::default());
        let codes: Vec<&str> = summary.top_reasons.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["MMM", "ZZZ", "AAA"], "count desc, then code asc");
        assert_eq!(summary.top_reasons[0].count, 2);
        assert_eq!(summary.top_reasons[2].count, 1);
    }

    #[test]
    fn empty_run_summarizes_to_zeros() {
        let summary = RunAggregator::new().summarize(&EngineConfig::default());
        assert_eq!(summary.total_rows, 0);
        assert_eq!(summary.parsed_rows, 0);
        assert_eq!(summary.flagged_count, 0);
        assert_eq!(summary.flagged_rate_pct, 0.0);
        assert!(summary.score_distribution.is_empty());
        assert!(summary.top_reasons.is_empty());
    }
}
