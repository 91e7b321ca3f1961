//! Serialized schema/data contracts.

/// Ledger event schema types.
pub mod events;
/// Ledger identity and variant types.
pub mod ledger;
