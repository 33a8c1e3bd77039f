/*!
 * # Maniarb - Prediction Market Arbitrage
 *
 * Maniarb sizes and executes arbitrage trades across logically linked binary
 * markets on a constant-product market maker venue.
 *
 * ## Core Features
 *
 * - **Sizing**: Solves the maximin allocation of capital across a weighted
 *   portfolio of positions
 * - **Execution Policy**: Quantizes, simulates and gates every plan before
 *   any capital is committed
 * - **Scheduling**: Ranks curated portfolios by return and trades them one
 *   at a time
 *
 * ## Module Structure
 *
 * - `arb`: AMM model, portfolios, the optimization program and its solver
 * - `exec`: Venue interface, rate limiting and the per-portfolio executor
 * - `bot`: Cycle scheduling over the curated portfolios
 * - `listing`: Curated market groupings
 * - `manifold`: REST venue implementation
 * - `config`: Environment configuration
 * - `utils`: Utility functions and helpers
 */

/// Sizing core
pub mod arb;
/// Cycle scheduling
pub mod bot;
/// Environment configuration
pub mod config;
/// Venue interface and execution policy
pub mod exec;
/// Curated market groupings
pub mod listing;
/// Manifold REST venue
pub mod manifold;
/// Utility functions and helpers
pub mod utils;
