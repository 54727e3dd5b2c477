//! Utilities shared across the crate.

/// Keyed single-flight caching
pub mod synchronization;
