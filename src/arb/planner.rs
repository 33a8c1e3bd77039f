use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};

use super::error::{PlanError, PortfolioError, SolverError};
use super::pool::PoolState;
use super::portfolio::Portfolio;
use super::position::{Holdings, Position};
use super::program::{ArbProgram, Leg, Objective};
use super::solver::{MaximinSolver, Solution, Solver};

/// Fee schedule, value assumption and per-position limits used by the planner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    /// Worst-case value of one complete basket
    pub true_value: f64,
    /// Fee charged per traded position
    pub fee_per_trade: f64,
    /// Maximum capital committed per position
    pub spending_cap: f64,
    /// Maximum net shares held per position
    pub holding_cap: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            true_value: 1.0,
            fee_per_trade: 0.25,
            spending_cap: 100.0,
            holding_cap: 1000.0,
        }
    }
}

/// Snapshot of one position's market taken at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegState {
    /// Pool reserves of the position's market or answer
    pub pool: PoolState,
    /// Shares the account owns in that market or answer
    pub holdings: Holdings,
}

/// Capital to spend per position, produced by one planning pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    /// Non-negative spend per position
    spends: BTreeMap<Position, f64>,
}

impl Allocation {
    /// Planned spend on `position`, zero if absent.
    #[must_use]
    pub fn spend(&self, position: &Position) -> f64 {
        self.spends.get(position).copied().unwrap_or(0.0)
    }

    /// Positions with their planned spends, in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&Position, f64)> {
        self.spends.iter().map(|(position, spend)| (position, *spend))
    }

    /// Sum of all planned spends.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.spends.values().sum()
    }
}

impl FromIterator<(Position, f64)> for Allocation {
    fn from_iter<I: IntoIterator<Item = (Position, f64)>>(iter: I) -> Self {
        Self {
            spends: iter
                .into_iter()
                .map(|(position, spend)| (position, spend.max(0.0)))
                .collect(),
        }
    }
}

impl Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, spend) in &self.spends {
            writeln!(f, "  {position}: {spend:.4}")?;
        }
        Ok(())
    }
}

/// Optimal allocation of a portfolio together with the solver's figures.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Capital to spend per position
    pub allocation: Allocation,
    /// Profit of the continuous optimum, before quantization
    pub expected_profit: f64,
    /// Complete baskets bought at the continuous optimum
    pub baskets: f64,
    /// Raw solver output
    pub solution: Solution,
}

/// Sizes arbitrage trades for a portfolio by solving its maximin program.
#[derive(Debug, Clone)]
pub struct ArbPlanner<S = MaximinSolver> {
    /// Fees, value and limits
    config: PlannerConfig,
    /// Backend for the optimization
    solver: S,
}

impl Default for ArbPlanner {
    fn default() -> Self {
        Self::new(PlannerConfig::default(), MaximinSolver::default())
    }
}

impl<S: Solver> ArbPlanner<S> {
    /// Creates a planner.
    #[must_use]
    pub const fn new(config: PlannerConfig, solver: S) -> Self {
        Self { config, solver }
    }

    /// Planner configuration.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Builds the optimization program for `portfolio` from pass-scoped snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if the portfolio is empty or a position has no snapshot.
    pub fn program(
        &self,
        portfolio: &Portfolio,
        states: &HashMap<Position, LegState>,
    ) -> Result<ArbProgram, PlanError> {
        if portfolio.is_empty() {
            return Err(PortfolioError::Empty.into());
        }

        let legs = portfolio
            .iter()
            .map(|(position, weight)| {
                let state = states
                    .get(position)
                    .ok_or_else(|| PlanError::MissingState(position.clone()))?;
                Ok(Leg {
                    position: position.clone(),
                    weight,
                    pool: state.pool,
                    spending_cap: self.config.spending_cap,
                    holding_cap: self.config.holding_cap,
                    holdings: state.holdings,
                })
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        Ok(ArbProgram::new(
            legs,
            Objective {
                true_value: self.config.true_value,
                fee_per_trade: self.config.fee_per_trade,
            },
        ))
    }

    /// Computes the profit-maximizing allocation for `portfolio`.
    ///
    /// # Arguments
    ///
    /// * `portfolio` - Positions and weights to buy
    /// * `states` - Pool and holdings snapshot for every position of the portfolio
    ///
    /// # Returns
    ///
    /// The optimal continuous spend per position. The caller quantizes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be built, or if the solver does
    /// not report an optimum. Solver failures are logged with the full program.
    pub fn plan(
        &self,
        portfolio: &Portfolio,
        states: &HashMap<Position, LegState>,
    ) -> Result<Plan, PlanError> {
        let program = self.program(portfolio, states)?;
        let solution = self.solver.solve(&program);

        if !solution.is_optimal() {
            log::error!(
                "planner::plan: {} returned {:?} for {portfolio}\n{program}",
                self.solver.name(),
                solution.status
            );
            return Err(SolverError {
                solver: self.solver.name(),
                status: solution.status,
                program: program.to_string(),
            }
            .into());
        }

        let allocation = program
            .legs()
            .iter()
            .zip(&solution.values)
            .map(|(leg, values)| (leg.position.clone(), values.spend))
            .collect();

        Ok(Plan {
            allocation,
            expected_profit: solution.objective,
            baskets: program.baskets(&solution.values).max(0.0),
            solution,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::position::Side;
    use crate::arb::program::LegValues;
    use crate::arb::solver::SolutionStatus;
    use crate::arb::test_helpers::*;

    /// Solver that always reports the same failure.
    struct FailingSolver(SolutionStatus);

    impl Solver for FailingSolver {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn solve(&self, _program: &ArbProgram) -> Solution {
            Solution::failed(self.0, 0)
        }
    }

    fn config() -> PlannerConfig {
        PlannerConfig {
            spending_cap: 50.0,
            ..PlannerConfig::default()
        }
    }

    #[test]
    fn test_mispriced_pair_allocates() {
        let portfolio = portfolio(&[yes("a"), yes("b")]);
        let states = states(&[
            (yes("a"), pool(100.0, 100.0, 0.45)),
            (yes("b"), pool(100.0, 100.0, 0.45)),
        ]);
        let plan = ArbPlanner::new(config(), MaximinSolver::default())
            .plan(&portfolio, &states)
            .unwrap();
        assert!(plan.allocation.total() > 0.0);
        assert!(plan.expected_profit > 0.0);
        for (_, spend) in plan.allocation.iter() {
            assert!(spend > 0.0 && spend <= 50.0);
        }
    }

    #[test]
    fn test_fair_pair_is_unprofitable() {
        let portfolio = portfolio(&[yes("a"), yes("b")]);
        let states = states(&[
            (yes("a"), pool(100.0, 100.0, 0.5)),
            (yes("b"), pool(100.0, 100.0, 0.5)),
        ]);
        let plan = ArbPlanner::new(config(), MaximinSolver::default())
            .plan(&portfolio, &states)
            .unwrap();
        assert!(plan.expected_profit <= 0.0);
        assert_eq!(plan.allocation.total(), 0.0);
        assert_eq!(plan.baskets, 0.0);
    }

    #[test]
    fn test_existing_holdings_limit_the_trade() {
        let portfolio = portfolio(&[yes("a"), no("b")]);
        let mut states = states(&[
            (yes("a"), pool(60.0, 40.0, 0.5)),
            (no("b"), pool(30.0, 70.0, 0.5)),
        ]);
        let planner = ArbPlanner::new(
            PlannerConfig {
                holding_cap: 20.0,
                ..PlannerConfig::default()
            },
            MaximinSolver::default(),
        );
        let unconstrained = planner.plan(&portfolio, &states).unwrap();

        // already 15 YES on a, so only 5 more fit under the cap
        states.get_mut(&yes("a")).unwrap().holdings = Holdings::new(15.0, 0.0);
        let constrained = planner.plan(&portfolio, &states).unwrap();
        assert!((constrained.baskets - 5.0).abs() < 1e-6);
        assert!(constrained.allocation.total() < unconstrained.allocation.total());

        // complement shares free up room again
        states.get_mut(&yes("a")).unwrap().holdings = Holdings::new(15.0, 15.0);
        let offset = planner.plan(&portfolio, &states).unwrap();
        assert!((offset.baskets - unconstrained.baskets).abs() < 1e-6);
    }

    #[test]
    fn test_missing_state() {
        let portfolio = portfolio(&[yes("a"), no("b")]);
        let states = states(&[(yes("a"), pool(60.0, 40.0, 0.5))]);
        assert_eq!(
            ArbPlanner::default().plan(&portfolio, &states).err(),
            Some(PlanError::MissingState(no("b")))
        );
    }

    #[test]
    fn test_solver_failure_is_fatal_for_the_plan() {
        let portfolio = portfolio(&[yes("a"), no("b")]);
        let states = states(&[
            (yes("a"), pool(60.0, 40.0, 0.5)),
            (no("b"), pool(30.0, 70.0, 0.5)),
        ]);
        for status in [
            SolutionStatus::Infeasible,
            SolutionStatus::Unbounded,
            SolutionStatus::IterationLimit,
            SolutionStatus::NumericalError,
        ] {
            let planner = ArbPlanner::new(config(), FailingSolver(status));
            match planner.plan(&portfolio, &states) {
                Err(PlanError::Solver(error)) => {
                    assert_eq!(error.status, status);
                    assert_eq!(error.solver, "failing");
                    assert!(error.program.contains("subject to:"));
                }
                other => panic!("expected solver error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_allocation_clamps_negative_spends() {
        let allocation: Allocation = [(yes("a"), -1e-12), (Position::no("b"), 3.0)]
            .into_iter()
            .collect();
        assert_eq!(allocation.spend(&yes("a")), 0.0);
        assert_eq!(allocation.spend(&Position::new("b", None, Side::No)), 3.0);
        assert_eq!(allocation.spend(&yes("zzz")), 0.0);
        assert_eq!(allocation.total(), 3.0);
    }

    #[test]
    fn test_program_mirrors_portfolio() {
        let portfolio = with_weights(&[(yes("a"), 2), (no("b"), 1)]);
        let states = states(&[
            (yes("a"), pool(60.0, 40.0, 0.5)),
            (no("b"), pool(30.0, 70.0, 0.5)),
        ]);
        let program = ArbPlanner::default().program(&portfolio, &states).unwrap();
        assert_eq!(program.legs().len(), 2);
        assert_eq!(program.legs()[0].weight, 2);
        assert_eq!(program.legs()[1].position, no("b"));
        let zero = vec![LegValues::default(); 2];
        assert_eq!(program.profit(&zero), -0.5);
    }
}
