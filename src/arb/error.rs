//! Error taxonomy for the arbitrage core.
//!
//! Model errors are data or programming defects and abort the current plan.
//! Portfolio errors are construction-time defects in curated listings.
//! Solver errors are pass-local: the portfolio is skipped for this cycle.

use thiserror::Error;

use super::position::{Position, Side};
use super::solver::SolutionStatus;

/// Invariant violations of the AMM state model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Spending is one-directional; shorting is buying the complement.
    #[error("cannot spend a negative amount: {0}")]
    NegativeAmount(f64),

    /// NaN or infinite spend.
    #[error("spend amount must be finite: {0}")]
    NonFiniteAmount(f64),

    /// A pool snapshot with an empty or negative side.
    #[error("pool sizes must be positive and finite: yes={pool_yes}, no={pool_no}")]
    NonPositivePool {
        /// Size of the YES pool
        pool_yes: f64,
        /// Size of the NO pool
        pool_no: f64,
    },

    /// AMM weight outside the open unit interval.
    #[error("amm weight p must lie in (0, 1): {0}")]
    InvalidWeight(f64),

    /// A buy large enough to drive a pool to zero (or out of f64 range).
    #[error("buying {amount} of {side} drains the pool: yes={pool_yes}, no={pool_no}")]
    Liquidity {
        /// Amount of capital spent
        amount: f64,
        /// Side being bought
        side: Side,
        /// Resulting YES pool size
        pool_yes: f64,
        /// Resulting NO pool size
        pool_no: f64,
    },
}

/// Violations of the portfolio construction invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortfolioError {
    /// Both a position and its complement were given as keys.
    #[error("portfolio holds both {0} and its complement")]
    ComplementPresent(Position),

    /// Weights must be strictly positive.
    #[error("portfolio weight for {0} must be positive")]
    ZeroWeight(Position),

    /// Weight accumulation overflowed.
    #[error("portfolio weight for {0} overflows")]
    WeightOverflow(Position),

    /// A portfolio needs at least one position.
    #[error("portfolio is empty")]
    Empty,
}

/// The solver did not return an optimal allocation.
///
/// Carries the full program dump so the failure can be diagnosed from logs.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("solver {solver} returned {status:?} for program:\n{program}")]
pub struct SolverError {
    /// Name of the solver backend
    pub solver: &'static str,
    /// Termination status reported by the solver
    pub status: SolutionStatus,
    /// Display dump of the program (variables, constraints, objective)
    pub program: String,
}

/// Reasons the planner could not produce an allocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The caller did not supply market state for a position.
    #[error("no market state for {0}")]
    MissingState(Position),

    /// The portfolio had no positions.
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    /// Simulating the allocation against a pool snapshot failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Solver failure or non-optimal status.
    #[error(transparent)]
    Solver(#[from] SolverError),
}
