//! riskengine-core: an explainable, rule-based transaction risk
//! scorer for large CSV datasets.
//!
//! Input is processed in bounded chunks; an optional velocity
//! simulator carries per-entity state across chunk boundaries, so
//! chunk size never changes an outcome. Every flagged transaction
//! carries the full list of reasons that flagged it.

pub mod aggregate;
pub mod config;
pub mod datagen;
pub mod engine;
pub mod error;
pub mod report;
pub mod rng;
pub mod rules;
pub mod transaction;
pub mod types;
pub mod velocity;
