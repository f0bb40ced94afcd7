//! The rule catalog and scoring.
//!
//! Rules are registered once, in a fixed order, and every transaction
//! runs through all of them. Each rule yields at most one weighted
//! Reason; the score is the sum of fired weights. Reason order is the
//! registration order, so ledgers are reproducible byte for byte.
//!
//! CATALOG ORDER (fixed, never reordered):
//!   1. LARGE_AMT       weight 3   abs(amount) at or above $10k
//!   2. STRUCT_9K       weight 2   abs(amount) in the $9k..$10k band
//!   3. GEO_HIGH_RISK   weight 2   country on the high-risk list
//!   4. CHAN_HIGH_RISK  weight 1   channel is a high-risk rail
//!   5. ODD_HOURS       weight 1   booked 00:00-04:59 UTC
//!   6. VEL_BURST       weight 3   velocity window past its tolerance

use crate::error::{EngineError, EngineResult};
use crate::transaction::Transaction;
use crate::types::Score;
use crate::velocity::VelocitySample;
use chrono::Timelike;
use serde::Serialize;
use std::collections::HashSet;

// ── Catalog constants ────────────────────────────────────────────────────────

const LARGE_AMOUNT_THRESHOLD: f64 = 10_000.0; // the CTR reporting line
const STRUCTURING_FLOOR: f64 = 9_000.0; // just-under-the-line band starts here
const ODD_HOURS_END: u32 = 5; // 00:00-04:59 UTC

/// Jurisdictions the GEO rule treats as high risk.
pub(crate) const HIGH_RISK_COUNTRIES: [&str; 6] = ["IR", "KP", "MM", "SY", "CU", "PA"];

/// Payment rails the CHAN rule treats as high risk.
const HIGH_RISK_CHANNELS: [&str; 3] = ["wire", "rtp", "crypto"];

// ── Outcome types ────────────────────────────────────────────────────────────

/// One fired rule: stable code, display text, score contribution.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Reason {
    pub code: &'static str,
    pub description: String,
    pub weight: Score,
}

/// A transaction with its evaluation outcome attached. Only flagged
/// instances outlive the chunk that produced them.
#[derive(Debug, Clone)]
pub struct ScoredTransaction {
    pub transaction: Transaction,
    /// Fired reasons in catalog order.
    pub reasons: Vec<Reason>,
    pub score: Score,
}

impl ScoredTransaction {
    pub fn is_flagged(&self, threshold: Score) -> bool {
        self.score >= threshold
    }
}

// ── The rule seam ────────────────────────────────────────────────────────────

/// The contract every rule fulfills. Rules are independent: each sees
/// one transaction (plus the velocity sample when simulation is on)
/// and yields at most one Reason. No rule sees another rule's output.
pub trait RiskRule: Send {
    /// Stable code, unique across the registered set.
    fn code(&self) -> &'static str;

    /// Score contribution when the rule fires.
    fn weight(&self) -> Score;

    fn evaluate(&self, txn: &Transaction, velocity: Option<&VelocitySample>) -> Option<Reason>;
}

/// The fixed, ordered rule catalog.
pub struct RuleSet {
    rules: Vec<Box<dyn RiskRule>>,
}

impl RuleSet {
    /// The standard catalog in its documented order.
    pub fn standard() -> EngineResult<Self> {
        Self::from_rules(vec![
            Box::new(LargeAmountRule),
            Box::new(StructuringRule),
            Box::new(HighRiskCountryRule),
            Box::new(HighRiskChannelRule),
            Box::new(OddHoursRule),
            Box::new(VelocityBurstRule),
        ])
    }

    /// Build a catalog from explicit rules. Duplicate codes are a
    /// configuration fault, rejected before any input is read.
    pub fn from_rules(rules: Vec<Box<dyn RiskRule>>) -> EngineResult<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.code()) {
                return Err(EngineError::InvalidConfig {
                    message: format!("duplicate rule code '{}'", rule.code()),
                });
            }
        }
        Ok(Self { rules })
    }

    /// Evaluate every rule in catalog order and attach the outcome.
    pub fn evaluate(
        &self,
        transaction: Transaction,
        velocity: Option<&VelocitySample>,
    ) -> ScoredTransaction {
        let mut reasons = Vec::new();
        for rule in &self.rules {
            if let Some(reason) = rule.evaluate(&transaction, velocity) {
                reasons.push(reason);
            }
        }
        let score = reasons
            .iter()
            .fold(0, |acc: Score, reason| acc.saturating_add(reason.weight));
        ScoredTransaction {
            transaction,
            reasons,
            score,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ── The standard catalog ─────────────────────────────────────────────────────

/// Absolute amount at or above the $10k reporting line.
struct LargeAmountRule;

impl RiskRule for LargeAmountRule {
    fn code(&self) -> &'static str {
        "LARGE_AMT"
    }

    fn weight(&self) -> Score {
        3
    }

    fn evaluate(&self, txn: &Transaction, _velocity: Option<&VelocitySample>) -> Option<Reason> {
        if txn.amount.abs() < LARGE_AMOUNT_THRESHOLD {
            return None;
        }
        Some(Reason {
            code: self.code(),
            description: format!(
                "amount ${:.2} at or above the ${LARGE_AMOUNT_THRESHOLD:.0} reporting line",
                txn.amount.abs()
            ),
            weight: self.weight(),
        })
    }
}

/// Absolute amount parked just under the reporting line.
struct StructuringRule;

impl RiskRule for StructuringRule {
    fn code(&self) -> &'static str {
        "STRUCT_9K"
    }

    fn weight(&self) -> Score {
        2
    }

    fn evaluate(&self, txn: &Transaction, _velocity: Option<&VelocitySample>) -> Option<Reason> {
        let magnitude = txn.amount.abs();
        if !(STRUCTURING_FLOOR..LARGE_AMOUNT_THRESHOLD).contains(&magnitude) {
            return None;
        }
        Some(Reason {
            code: self.code(),
            description: format!(
                "amount ${magnitude:.2} sits just under the ${LARGE_AMOUNT_THRESHOLD:.0} reporting line"
            ),
            weight: self.weight(),
        })
    }
}

/// Optional `country` column on the high-risk jurisdiction list.
struct HighRiskCountryRule;

impl RiskRule for HighRiskCountryRule {
    fn code(&self) -> &'static str {
        "GEO_HIGH_RISK"
    }

    fn weight(&self) -> Score {
        2
    }

    fn evaluate(&self, txn: &Transaction, _velocity: Option<&VelocitySample>) -> Option<Reason> {
        let country = txn.field("country")?;
        if !HIGH_RISK_COUNTRIES
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(country))
        {
            return None;
        }
        Some(Reason {
            code: self.code(),
            description: format!("country '{country}' is on the high-risk jurisdiction list"),
            weight: self.weight(),
        })
    }
}

/// Optional `channel` column naming a high-risk payment rail.
struct HighRiskChannelRule;

impl RiskRule for HighRiskChannelRule {
    fn code(&self) -> &'static str {
        "CHAN_HIGH_RISK"
    }

    fn weight(&self) -> Score {
        1
    }

    fn evaluate(&self, txn: &Transaction, _velocity: Option<&VelocitySample>) -> Option<Reason> {
        let channel = txn.field("channel")?;
        if !HIGH_RISK_CHANNELS
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(channel))
        {
            return None;
        }
        Some(Reason {
            code: self.code(),
            description: format!("channel '{channel}' is a high-risk rail"),
            weight: self.weight(),
        })
    }
}

/// Booked during the overnight dead hours, UTC.
struct OddHoursRule;

impl RiskRule for OddHoursRule {
    fn code(&self) -> &'static str {
        "ODD_HOURS"
    }

    fn weight(&self) -> Score {
        1
    }

    fn evaluate(&self, txn: &Transaction, _velocity: Option<&VelocitySample>) -> Option<Reason> {
        let hour = txn.timestamp.hour();
        if hour >= ODD_HOURS_END {
            return None;
        }
        Some(Reason {
            code: self.code(),
            description: format!(
                "booked at {hour:02}:{:02} UTC, inside the 00:00-04:59 window",
                txn.timestamp.minute()
            ),
            weight: self.weight(),
        })
    }
}

/// Velocity window past its tolerated size. Registered in both modes;
/// without a sample (simulation off) it never fires, so reason order
/// is identical either way.
struct VelocityBurstRule;

impl RiskRule for VelocityBurstRule {
    fn code(&self) -> &'static str {
        "VEL_BURST"
    }

    fn weight(&self) -> Score {
        3
    }

    fn evaluate(&self, _txn: &Transaction, velocity: Option<&VelocitySample>) -> Option<Reason> {
        let sample = velocity?;
        if !sample.is_burst() {
            return None;
        }
        Some(Reason {
            code: self.code(),
            description: format!(
                "{} transactions within {}s for one entity, above the tolerated {}",
                sample.window_len, sample.window_secs, sample.max_events
            ),
            weight: self.weight(),
        })
    }
}
