//! Shared primitive types used across the entire engine.

/// A stable identifier for the account or customer a transaction
/// belongs to. Velocity state is keyed by this.
pub type EntityId = String;

/// An integer risk score: the sum of fired rule weights.
pub type Score = u32;
