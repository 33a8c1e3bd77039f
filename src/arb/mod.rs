//! # Arbitrage Module
//!
//! Sizing core for AMM arbitrage: the weighted constant-product pool model,
//! positions and portfolios, the maximin optimization program with its solver,
//! and quantized quotes of a plan.

/// Error taxonomy of the sizing core
pub mod error;
/// Profit-maximizing allocation for one portfolio
pub mod planner;
/// Weighted constant-product pool model
pub mod pool;
/// Weighted baskets of positions
pub mod portfolio;
/// Sides, positions and holdings
pub mod position;
/// Solver-agnostic optimization program
pub mod program;
/// Quantization and simulation of a plan
pub mod quote;
/// Solver backends
pub mod solver;
/// Test helpers and utilities
#[cfg(test)]
pub(crate) mod test_helpers;
