//! Run configuration.
//!
//! All knobs a run accepts, with the documented defaults. Validation
//! happens once, before any input is read: a bad config must never
//! survive into the chunk loop.

use crate::error::{EngineError, EngineResult};
use crate::types::Score;
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: Score = 4; // flag when score >= 4
pub const DEFAULT_CHUNK_SIZE: usize = 500_000; // rows per chunk
pub const DEFAULT_VELOCITY_WINDOW_SECS: i64 = 300; // 5-minute sliding window
pub const DEFAULT_VELOCITY_MAX_EVENTS: usize = 5; // tolerated window size

/// Knobs for the velocity simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityConfig {
    /// Sliding window width in seconds.
    pub window_secs: i64,
    /// Tolerated number of transactions inside the window. The burst
    /// rule fires when the window grows past this.
    pub max_events: usize,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_VELOCITY_WINDOW_SECS,
            max_events: DEFAULT_VELOCITY_MAX_EVENTS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum score that flags a transaction.
    pub threshold: Score,
    /// Whether the velocity simulator runs.
    pub simulation: bool,
    /// Rows per ingestion chunk. The final chunk may be smaller.
    pub chunk_size: usize,
    pub velocity: VelocityConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            simulation: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            velocity: VelocityConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Check every knob and report all violations at once.
    pub fn validate(&self) -> EngineResult<()> {
        let mut problems = Vec::new();
        if self.chunk_size == 0 {
            problems.push("chunk_size must be at least 1");
        }
        if self.velocity.window_secs <= 0 {
            problems.push("velocity window_secs must be positive");
        }
        if self.velocity.max_events == 0 {
            problems.push("velocity max_events must be at least 1");
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(EngineError::InvalidConfig {
                message: problems.join("; "),
            })
        }
    }
}
