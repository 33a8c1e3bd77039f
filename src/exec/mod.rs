//! # Execution Module
//!
//! Turns plans into orders: the venue interface, its rate-limit wrapper and
//! the per-portfolio execution pass.

/// Per-portfolio execution pass
pub mod executor;
/// Test helpers and utilities
#[cfg(test)]
pub(crate) mod test_helpers;
/// Rate limiting around a venue
pub mod throttle;
/// Venue interface
pub mod venue;
