//! Row parsing: raw CSV records into typed transactions.
//!
//! Required columns: transaction_id, entity_id, timestamp, amount.
//! Every other column is preserved verbatim in `extras` so rules can
//! inspect optional fields (country, channel, counterparty, ...).
//!
//! A row that cannot be parsed is a recoverable event: the caller
//! counts it and moves on. Parsing never aborts a run.

use crate::types::EntityId;
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// One parsed input record. Immutable once built; identity is
/// `transaction_id`.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub entity_id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub amount: f64,
    /// Optional columns keyed by header name, in stable order.
    pub extras: BTreeMap<String, String>,
}

impl Transaction {
    /// Look up an optional column. Absent and blank both read as None.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.extras
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Timestamp as epoch seconds, the unit velocity windows use.
    pub fn epoch_secs(&self) -> i64 {
        self.timestamp.timestamp()
    }
}

/// Why a row could not become a Transaction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("malformed timestamp '{value}'")]
    MalformedTimestamp { value: String },

    #[error("malformed amount '{value}'")]
    MalformedAmount { value: String },

    #[error("unreadable row: {message}")]
    UnreadableRow { message: String },
}

/// Parse one data record against the header record.
///
/// Values are trimmed; a blank required field counts as missing. A
/// record shorter than the header simply lacks the trailing columns.
pub fn parse_row(headers: &StringRecord, record: &StringRecord) -> Result<Transaction, ParseFailure> {
    let mut transaction_id = None;
    let mut entity_id = None;
    let mut raw_timestamp = None;
    let mut raw_amount = None;
    let mut extras = BTreeMap::new();

    for (name, value) in headers.iter().zip(record.iter()) {
        let value = value.trim();
        match name {
            "transaction_id" => transaction_id = non_blank(value),
            "entity_id" => entity_id = non_blank(value),
            "timestamp" => raw_timestamp = non_blank(value),
            "amount" => raw_amount = non_blank(value),
            _ => {
                extras.insert(name.to_string(), value.to_string());
            }
        }
    }

    let transaction_id = transaction_id.ok_or(ParseFailure::MissingField {
        field: "transaction_id",
    })?;
    let entity_id = entity_id.ok_or(ParseFailure::MissingField { field: "entity_id" })?;
    let raw_timestamp = raw_timestamp.ok_or(ParseFailure::MissingField { field: "timestamp" })?;
    let raw_amount = raw_amount.ok_or(ParseFailure::MissingField { field: "amount" })?;

    let timestamp = parse_timestamp(raw_timestamp).ok_or_else(|| ParseFailure::MalformedTimestamp {
        value: raw_timestamp.to_string(),
    })?;

    let amount = raw_amount
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| ParseFailure::MalformedAmount {
            value: raw_amount.to_string(),
        })?;

    Ok(Transaction {
        transaction_id: transaction_id.to_string(),
        entity_id: entity_id.to_string(),
        timestamp,
        amount,
        extras,
    })
}

/// Accepted timestamp shapes, tried in order: RFC 3339,
/// `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, integer epoch
/// seconds. Naive forms are read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn non_blank(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
