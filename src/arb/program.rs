//! # Arbitrage Program
//!
//! Solver-agnostic statement of the profit-maximizing allocation problem for one
//! portfolio. For every leg `i` the decision variables are
//!
//! - `spend[i] >= 0`, capital committed,
//! - `got[i]`, net shares of the leg's own side acquired,
//! - `swap[i] = (d_yes, d_no)`, reserve deltas applied to the leg's pool,
//!
//! subject to
//!
//! - `geo_mean(pool[i] + swap[i]; [p, 1-p]) >= geo_mean(pool[i]; [p, 1-p])`,
//! - `spend[i] = swap[i].no` and `got[i] = spend[i] - swap[i].yes` for YES legs
//!   (components swapped for NO legs),
//! - `spend[i] <= spending_cap[i]`,
//! - `got[i] - complement_holding[i] + same_side_holding[i] <= holding_cap[i]`,
//!
//! maximizing
//!
//! ```text
//! true_value * min_i(got[i] / weight[i]) - sum_i spend[i] - fee_per_trade * legs
//! ```
//!
//! The `min` counts complete baskets: the portfolio is only worth `true_value`
//! once every leg holds its weighted share.

use std::fmt::{self, Display};

use super::pool::PoolState;
use super::position::{Holdings, Position, Side};

/// One position of the program with its market state and limits.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    /// Position bought by this leg
    pub position: Position,
    /// Portfolio weight of the position
    pub weight: u32,
    /// Pool snapshot before any trade
    pub pool: PoolState,
    /// Maximum capital to commit on this leg
    pub spending_cap: f64,
    /// Maximum net shares held after the trade
    pub holding_cap: f64,
    /// Shares already owned in this market or answer
    pub holdings: Holdings,
}

impl Leg {
    /// Side bought by this leg.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.position.side
    }

    /// Upper bound on `got` implied by the holding cap:
    /// `holding_cap + complement_holding - same_side_holding`.
    #[must_use]
    pub fn holding_room(&self) -> f64 {
        let side = self.side();
        self.holding_cap + self.holdings.opposite(side) - self.holdings.of(side)
    }

    /// Weights of the pool vector `(yes, no)` in its geometric mean.
    #[must_use]
    pub fn geo_weights(&self) -> [f64; 2] {
        [self.pool.p(), 1.0 - self.pool.p()]
    }

    /// Index into `swap` of the component the capital is deposited in.
    const fn deposit_index(&self) -> usize {
        match self.side() {
            Side::Yes => 1,
            Side::No => 0,
        }
    }

    /// Index into `swap` of the component the shares are withdrawn from.
    const fn withdrawal_index(&self) -> usize {
        1 - self.deposit_index()
    }
}

/// Weighted geometric mean of a pool vector, or `None` if a component is not positive.
fn geo_mean(pool: [f64; 2], weights: [f64; 2]) -> Option<f64> {
    if pool[0] > 0.0 && pool[1] > 0.0 {
        Some(pool[0].powf(weights[0]) * pool[1].powf(weights[1]))
    } else {
        None
    }
}

/// A named decision variable of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Capital committed on a leg
    Spend(usize),
    /// Net shares acquired on a leg
    Got(usize),
    /// Reserve delta on one component of a leg's pool
    Swap(usize, Side),
}

impl Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spend(leg) => write!(f, "spend[{leg}]"),
            Self::Got(leg) => write!(f, "got[{leg}]"),
            Self::Swap(leg, Side::Yes) => write!(f, "swap[{leg}].yes"),
            Self::Swap(leg, Side::No) => write!(f, "swap[{leg}].no"),
        }
    }
}

/// A constraint of the program, scoped to one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// The pool's weighted geometric mean may not decrease
    GeoMean(usize),
    /// Spend is non-negative
    NonNegativeSpend(usize),
    /// Spend equals the deposit into the opposing pool
    Deposit(usize),
    /// Shares received equal spend minus the withdrawal from the own pool
    Received(usize),
    /// Spend stays within the spending cap
    SpendingCap(usize),
    /// Net holdings stay within the holding cap
    HoldingCap(usize),
}

impl Constraint {
    /// Leg the constraint applies to.
    #[must_use]
    pub const fn leg(&self) -> usize {
        match self {
            Self::GeoMean(leg)
            | Self::NonNegativeSpend(leg)
            | Self::Deposit(leg)
            | Self::Received(leg)
            | Self::SpendingCap(leg)
            | Self::HoldingCap(leg) => *leg,
        }
    }

    /// Amount by which `values` violate the constraint; zero or negative when satisfied.
    #[must_use]
    pub fn residual(&self, leg: &Leg, values: &LegValues) -> f64 {
        match self {
            Self::GeoMean(_) => {
                let before = [leg.pool.pool_yes(), leg.pool.pool_no()];
                let after = [before[0] + values.swap[0], before[1] + values.swap[1]];
                let weights = leg.geo_weights();
                match (geo_mean(before, weights), geo_mean(after, weights)) {
                    (Some(before), Some(after)) => (before - after) / before,
                    _ => f64::INFINITY,
                }
            }
            Self::NonNegativeSpend(_) => -values.spend,
            Self::Deposit(_) => (values.spend - values.swap[leg.deposit_index()]).abs(),
            Self::Received(_) => {
                (values.got - (values.spend - values.swap[leg.withdrawal_index()])).abs()
            }
            Self::SpendingCap(_) => values.spend - leg.spending_cap,
            Self::HoldingCap(_) => values.got - leg.holding_room(),
        }
    }

    /// Human-readable statement of the constraint for program dumps.
    fn describe(&self, leg: &Leg) -> String {
        let i = self.leg();
        match self {
            Self::GeoMean(_) => {
                let [p, q] = leg.geo_weights();
                let before = geo_mean([leg.pool.pool_yes(), leg.pool.pool_no()], [p, q])
                    .unwrap_or(f64::NAN);
                format!("geo_mean(pool[{i}] + swap[{i}]; [{p:.4}, {q:.4}]) >= {before:.6}")
            }
            Self::NonNegativeSpend(_) => format!("{} >= 0", Variable::Spend(i)),
            Self::Deposit(_) => {
                let component = match leg.deposit_index() {
                    0 => Side::Yes,
                    _ => Side::No,
                };
                format!("{} == {}", Variable::Spend(i), Variable::Swap(i, component))
            }
            Self::Received(_) => {
                let component = match leg.withdrawal_index() {
                    0 => Side::Yes,
                    _ => Side::No,
                };
                format!(
                    "{} == {} - {}",
                    Variable::Got(i),
                    Variable::Spend(i),
                    Variable::Swap(i, component)
                )
            }
            Self::SpendingCap(_) => {
                format!("{} <= {:.4}", Variable::Spend(i), leg.spending_cap)
            }
            Self::HoldingCap(_) => format!(
                "{} - {:.4} + {:.4} <= {:.4}",
                Variable::Got(i),
                leg.holdings.opposite(leg.side()),
                leg.holdings.of(leg.side()),
                leg.holding_cap
            ),
        }
    }
}

/// Values of the decision variables of one leg.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LegValues {
    /// Capital committed
    pub spend: f64,
    /// Net shares acquired
    pub got: f64,
    /// Reserve deltas `(yes, no)`
    pub swap: [f64; 2],
}

/// Profit objective of the program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objective {
    /// Worst-case value of one complete basket
    pub true_value: f64,
    /// Fee charged per traded position
    pub fee_per_trade: f64,
}

/// The full optimization problem for one portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct ArbProgram {
    /// Legs in portfolio order
    legs: Vec<Leg>,
    /// Constraints over all legs
    constraints: Vec<Constraint>,
    /// Profit objective
    objective: Objective,
}

impl ArbProgram {
    /// Builds the program with the standard constraint set for every leg.
    #[must_use]
    pub fn new(legs: Vec<Leg>, objective: Objective) -> Self {
        let constraints = (0..legs.len())
            .flat_map(|i| {
                [
                    Constraint::GeoMean(i),
                    Constraint::NonNegativeSpend(i),
                    Constraint::Deposit(i),
                    Constraint::Received(i),
                    Constraint::SpendingCap(i),
                    Constraint::HoldingCap(i),
                ]
            })
            .collect();
        Self {
            legs,
            constraints,
            objective,
        }
    }

    /// Legs in portfolio order.
    #[must_use]
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// All constraints.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The profit objective.
    #[must_use]
    pub const fn objective(&self) -> &Objective {
        &self.objective
    }

    /// All decision variables, leg by leg.
    pub fn variables(&self) -> impl Iterator<Item = Variable> {
        (0..self.legs.len()).flat_map(|i| {
            [
                Variable::Spend(i),
                Variable::Got(i),
                Variable::Swap(i, Side::Yes),
                Variable::Swap(i, Side::No),
            ]
        })
    }

    /// Value of `variable` in `values`, or NaN if the leg is out of range.
    #[must_use]
    pub fn value(values: &[LegValues], variable: Variable) -> f64 {
        let leg = match variable {
            Variable::Spend(i) | Variable::Got(i) | Variable::Swap(i, _) => i,
        };
        values.get(leg).map_or(f64::NAN, |v| match variable {
            Variable::Spend(_) => v.spend,
            Variable::Got(_) => v.got,
            Variable::Swap(_, Side::Yes) => v.swap[0],
            Variable::Swap(_, Side::No) => v.swap[1],
        })
    }

    /// Number of complete baskets: `min_i(got[i] / weight[i])`.
    #[must_use]
    pub fn baskets(&self, values: &[LegValues]) -> f64 {
        self.legs
            .iter()
            .zip(values)
            .map(|(leg, v)| v.got / f64::from(leg.weight))
            .fold(f64::INFINITY, f64::min)
    }

    /// Objective value at `values`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn profit(&self, values: &[LegValues]) -> f64 {
        let spend: f64 = values.iter().map(|v| v.spend).sum();
        self.objective.true_value * self.baskets(values)
            - spend
            - self.objective.fee_per_trade * self.legs.len() as f64
    }

    /// Largest constraint residual at `values`; feasible points give zero or less.
    #[must_use]
    pub fn max_violation(&self, values: &[LegValues]) -> f64 {
        if values.len() != self.legs.len() {
            return f64::INFINITY;
        }
        self.constraints
            .iter()
            .map(|c| c.residual(&self.legs[c.leg()], &values[c.leg()]))
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl Display for ArbProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "maximize {} * min_i(got[i] / weight[i]) - sum_i spend[i] - {} * {}",
            self.objective.true_value,
            self.objective.fee_per_trade,
            self.legs.len()
        )?;
        writeln!(f, "legs:")?;
        for (i, leg) in self.legs.iter().enumerate() {
            writeln!(
                f,
                "  [{i}] {}x {} {} holdings(yes={:.4}, no={:.4})",
                leg.weight, leg.position, leg.pool, leg.holdings.yes_shares, leg.holdings.no_shares
            )?;
        }
        writeln!(f, "subject to:")?;
        for constraint in &self.constraints {
            writeln!(f, "  {}", constraint.describe(&self.legs[constraint.leg()]))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::*;

    fn program() -> ArbProgram {
        ArbProgram::new(
            vec![
                leg(yes("a"), 1, pool(60.0, 40.0, 0.5)),
                leg(no("b"), 2, pool(30.0, 70.0, 0.5)),
            ],
            Objective {
                true_value: 1.0,
                fee_per_trade: 0.25,
            },
        )
    }

    #[test]
    fn test_constraint_count() {
        let program = program();
        assert_eq!(program.constraints().len(), 12);
        assert_eq!(program.variables().count(), 8);
    }

    #[test]
    fn test_zero_point_is_feasible() {
        let program = program();
        let values = vec![LegValues::default(); 2];
        assert!(program.max_violation(&values) <= 0.0);
        assert_eq!(program.profit(&values), -0.5);
    }

    #[test]
    fn test_amm_buy_is_feasible() {
        let program = program();
        // buying 20 YES on a: no pool 40 -> 60, yes pool 60 -> 40
        let a = LegValues {
            spend: 20.0,
            got: 40.0,
            swap: [-20.0, 20.0],
        };
        // buying 20 NO on b: yes pool 30 -> 50, no pool 70 -> 42
        let b = LegValues {
            spend: 20.0,
            got: 48.0,
            swap: [20.0, -28.0],
        };
        let values = vec![a, b];
        assert!(program.max_violation(&values) < 1e-12);
        assert_eq!(program.baskets(&values), 24.0);
        assert!((program.profit(&values) - (24.0 - 40.0 - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_free_shares_violate_geo_mean() {
        let program = program();
        let values = vec![
            LegValues {
                spend: 0.0,
                got: 10.0,
                swap: [-10.0, 0.0],
            },
            LegValues::default(),
        ];
        assert!(program.max_violation(&values) > 0.0);
        let violated: Vec<_> = program
            .constraints()
            .iter()
            .filter(|c| c.residual(&program.legs()[c.leg()], &values[c.leg()]) > 0.0)
            .collect();
        assert_eq!(violated, vec![&Constraint::GeoMean(0)]);
    }

    #[test]
    fn test_holding_room() {
        let mut leg = leg(no("b"), 1, pool(30.0, 70.0, 0.5));
        leg.holding_cap = 100.0;
        leg.holdings = Holdings::new(15.0, 40.0);
        // cap + complement (yes) - same side (no)
        assert_eq!(leg.holding_room(), 75.0);
    }

    #[test]
    fn test_value_lookup_and_dump() {
        let program = program();
        let values = vec![
            LegValues {
                spend: 1.0,
                got: 2.0,
                swap: [3.0, 4.0],
            },
            LegValues::default(),
        ];
        assert_eq!(ArbProgram::value(&values, Variable::Swap(0, Side::No)), 4.0);
        assert!(ArbProgram::value(&values, Variable::Spend(5)).is_nan());

        let dump = program.to_string();
        assert!(dump.contains("spend[1] == swap[1].yes"));
        assert!(dump.contains("got[0] == spend[0] - swap[0].yes"));
        assert!(dump.contains("[1] 2x b (NO)"));
    }
}
