//! # Solvers
//!
//! The [`Solver`] trait is the seam between the planner and whatever backend
//! solves an [`ArbProgram`]. The built-in [`MaximinSolver`] exploits the
//! structure of the program instead of solving it as a general convex problem:
//!
//! - at the optimum every leg holds exactly `weight * t` shares for a common
//!   basket count `t`, because any extra shares on one leg cost capital without
//!   raising the `min`;
//! - the cheapest spend for `q` shares on one pool is the AMM buy that mints
//!   `q` shares, so the geometric-mean constraint is tight;
//! - profit as a function of `t` is concave, with derivative
//!   `true_value - sum_i weight_i * price_i(after buying weight_i * t)`.
//!
//! Maximizing profit is then a one-dimensional root search on that derivative
//! over `[0, t_max]`, where `t_max` comes from the spending and holding caps.

use super::pool::PoolState;
use super::position::Side;
use super::program::{ArbProgram, Leg, LegValues};

/// Termination status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolutionStatus {
    /// The values are optimal within the solver tolerance
    Optimal,
    /// No point satisfies the constraints
    Infeasible,
    /// The objective grows without bound
    Unbounded,
    /// The iteration budget ran out before convergence
    IterationLimit,
    /// A non-finite intermediate value was produced
    NumericalError,
}

/// Result of solving an [`ArbProgram`].
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Termination status
    pub status: SolutionStatus,
    /// Variable values per leg, in program order; empty unless a point was found
    pub values: Vec<LegValues>,
    /// Objective value at `values`
    pub objective: f64,
    /// Iterations spent
    pub iterations: usize,
}

impl Solution {
    /// A solution carrying only a failure status.
    #[must_use]
    pub const fn failed(status: SolutionStatus, iterations: usize) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: f64::NAN,
            iterations,
        }
    }

    /// Whether the solver reached an optimum.
    #[must_use]
    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}

/// Backend that solves arbitrage programs.
///
/// Implementations must be thread-safe (`Send + Sync`) so a planner can be
/// shared by the scheduler and benchmarks.
pub trait Solver: Send + Sync {
    /// Solver name for logging.
    fn name(&self) -> &'static str;

    /// Solves `program`. Failures are reported through [`Solution::status`].
    fn solve(&self, program: &ArbProgram) -> Solution;
}

/// Structure-exploiting solver for the maximin basket program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaximinSolver {
    /// Relative width of the basket-count bracket at convergence
    pub tolerance: f64,
    /// Maximum bisection and bracketing steps
    pub max_iterations: usize,
}

impl Default for MaximinSolver {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 200,
        }
    }
}

/// A non-finite or model failure while evaluating a leg.
#[derive(Debug)]
struct Numerical;

/// Spend and post-trade pool of one leg buying `shares`.
fn buy_shares(leg: &Leg, shares: f64) -> Result<(f64, PoolState), Numerical> {
    let side = leg.side();
    let spend = leg
        .pool
        .amount_for_shares(shares, side)
        .map_err(|_| Numerical)?
        .min(leg.spending_cap);
    let after = leg.pool.buy(spend, side).map_err(|_| Numerical)?;
    Ok((spend, after))
}

impl MaximinSolver {
    /// Largest basket count the caps allow, or infinity when every leg is uncapped.
    fn max_baskets(program: &ArbProgram) -> Result<f64, Numerical> {
        let mut t_max = f64::INFINITY;
        for leg in program.legs() {
            let by_spend = if leg.spending_cap.is_finite() {
                leg.pool
                    .shares_received(leg.spending_cap.max(0.0), leg.side())
                    .map_err(|_| Numerical)?
            } else {
                f64::INFINITY
            };
            let shares = by_spend.min(leg.holding_room());
            if shares.is_nan() {
                return Err(Numerical);
            }
            t_max = t_max.min(shares / f64::from(leg.weight));
        }
        Ok(t_max)
    }

    /// Derivative of profit with respect to the basket count at `t`.
    fn gradient(program: &ArbProgram, t: f64) -> Result<f64, Numerical> {
        let mut marginal_cost = 0.0;
        for leg in program.legs() {
            let weight = f64::from(leg.weight);
            let (_, after) = buy_shares(leg, weight * t)?;
            marginal_cost += weight * after.price(leg.side());
        }
        let gradient = program.objective().true_value - marginal_cost;
        if gradient.is_finite() {
            Ok(gradient)
        } else {
            Err(Numerical)
        }
    }

    /// Variable values with every leg buying `weight * t` shares.
    fn values_at(program: &ArbProgram, t: f64) -> Result<Vec<LegValues>, Numerical> {
        program
            .legs()
            .iter()
            .map(|leg| {
                let target = f64::from(leg.weight) * t;
                if target <= 0.0 {
                    // capital-free point; a negative target only arises from a
                    // negative holding room and is met by returning shares to the pool
                    let mut swap = [0.0; 2];
                    swap[match leg.side() {
                        Side::Yes => 0,
                        Side::No => 1,
                    }] = -target;
                    return Ok(LegValues {
                        spend: 0.0,
                        got: target,
                        swap,
                    });
                }
                let (spend, after) = buy_shares(leg, target)?;
                let swap = [
                    after.pool_yes() - leg.pool.pool_yes(),
                    after.pool_no() - leg.pool.pool_no(),
                ];
                let got = leg.pool.pool(leg.side()) - after.pool(leg.side()) + spend;
                if !(spend.is_finite() && got.is_finite()) {
                    return Err(Numerical);
                }
                Ok(LegValues { spend, got, swap })
            })
            .collect()
    }

    /// Finds the optimal basket count and the iterations spent.
    fn optimal_baskets(&self, program: &ArbProgram) -> Result<(f64, usize), SolutionStatus> {
        let t_max = Self::max_baskets(program).map_err(|Numerical| SolutionStatus::NumericalError)?;
        if t_max <= 0.0 {
            return Ok((t_max, 0));
        }
        let gradient = |t: f64| {
            Self::gradient(program, t).map_err(|Numerical| SolutionStatus::NumericalError)
        };

        if gradient(0.0)? <= 0.0 {
            return Ok((0.0, 0));
        }

        let mut iterations = 0;
        let mut high = if t_max.is_finite() {
            if gradient(t_max)? >= 0.0 {
                return Ok((t_max, 0));
            }
            t_max
        } else {
            // uncapped: double until the marginal basket costs more than it is worth
            let mut high: f64 = 1.0;
            loop {
                if iterations >= self.max_iterations || !high.is_finite() {
                    return Err(SolutionStatus::Unbounded);
                }
                iterations += 1;
                if gradient(high)? < 0.0 {
                    break high;
                }
                high *= 2.0;
            }
        };

        let mut low = 0.0;
        loop {
            if high - low <= self.tolerance * high.max(1.0) {
                return Ok((low, iterations));
            }
            if iterations >= self.max_iterations {
                return Err(SolutionStatus::IterationLimit);
            }
            iterations += 1;
            let mid = 0.5 * (low + high);
            if gradient(mid)? > 0.0 {
                low = mid;
            } else {
                high = mid;
            }
        }
    }
}

impl Solver for MaximinSolver {
    fn name(&self) -> &'static str {
        "maximin"
    }

    fn solve(&self, program: &ArbProgram) -> Solution {
        if program.legs().is_empty() {
            return Solution::failed(SolutionStatus::Infeasible, 0);
        }

        let (baskets, iterations) = match self.optimal_baskets(program) {
            Ok(found) => found,
            Err(status) => return Solution::failed(status, 0),
        };

        let Ok(values) = Self::values_at(program, baskets) else {
            return Solution::failed(SolutionStatus::NumericalError, iterations);
        };

        let objective = program.profit(&values);
        if !objective.is_finite() {
            return Solution::failed(SolutionStatus::NumericalError, iterations);
        }

        log::debug!(
            "solver::maximin: baskets={baskets:.6}, profit={objective:.6}, iterations={iterations}"
        );

        Solution {
            status: SolutionStatus::Optimal,
            values,
            objective,
            iterations,
        }
    }
}
