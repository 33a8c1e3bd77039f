use std::collections::HashMap;
use std::fmt::{self, Display};

use super::error::{ModelError, PlanError};
use super::planner::{LegState, Plan, PlannerConfig};
use super::portfolio::Portfolio;
use super::position::Position;

/// Realized figures for one position once its planned spend is quantized.
#[derive(Debug, Clone, PartialEq)]
pub struct LegQuote {
    /// Position bought
    pub position: Position,
    /// Portfolio weight of the position
    pub weight: u32,
    /// Continuous spend proposed by the planner
    pub planned_spend: f64,
    /// Integer spend that would be submitted
    pub spend: u64,
    /// Shares the integer spend buys
    pub shares: f64,
    /// YES probability before the trade
    pub prob_before: f64,
    /// YES probability after the trade, used as the limit price
    pub prob_after: f64,
    /// Shares of the complementary side already owned
    pub complement_holding: f64,
}

impl LegQuote {
    /// New shares that net against already-held complement shares.
    #[must_use]
    pub fn recombined(&self) -> f64 {
        self.shares.min(self.complement_holding)
    }

    /// Spend as capital.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn spend_amount(&self) -> f64 {
        self.spend as f64
    }
}

impl Display for LegQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x {}: planned {:.4}, spend {}, shares {:.4}, prob {:.4} -> {:.4}",
            self.weight,
            self.position,
            self.planned_spend,
            self.spend,
            self.shares,
            self.prob_before,
            self.prob_after
        )
    }
}

/// A plan after quantization and simulation against the AMM: what the orders
/// would realize if submitted now.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioQuote {
    /// One quote per position, in portfolio order
    legs: Vec<LegQuote>,
    /// Worst-case value of one complete basket
    true_value: f64,
    /// Fee charged per traded position
    fee_per_trade: f64,
}

impl PortfolioQuote {
    /// Truncates every planned spend to an integer and simulates the buy on
    /// the position's pool snapshot.
    ///
    /// # Arguments
    ///
    /// * `portfolio` - Portfolio the plan was made for
    /// * `plan` - Planner output
    /// * `states` - The same snapshots the plan was made from
    /// * `config` - Value and fee assumptions
    ///
    /// # Errors
    ///
    /// Returns an error if a snapshot is missing or the simulated buy violates
    /// the AMM model.
    pub fn new(
        portfolio: &Portfolio,
        plan: &Plan,
        states: &HashMap<Position, LegState>,
        config: &PlannerConfig,
    ) -> Result<Self, PlanError> {
        let legs = portfolio
            .iter()
            .map(|(position, weight)| {
                let state = states
                    .get(position)
                    .ok_or_else(|| PlanError::MissingState(position.clone()))?;
                quote_leg(position, weight, plan.allocation.spend(position), state)
                    .map_err(PlanError::from)
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        Ok(Self {
            legs,
            true_value: config.true_value,
            fee_per_trade: config.fee_per_trade,
        })
    }

    /// Per-position quotes.
    #[must_use]
    pub fn legs(&self) -> &[LegQuote] {
        &self.legs
    }

    /// Sum of the integer spends.
    #[must_use]
    pub fn total_spend(&self) -> u64 {
        self.legs.iter().map(|leg| leg.spend).sum()
    }

    /// Complete weighted baskets the realized shares redeem.
    #[must_use]
    pub fn baskets(&self) -> f64 {
        self.legs
            .iter()
            .map(|leg| leg.shares / f64::from(leg.weight))
            .fold(f64::INFINITY, f64::min)
    }

    /// Realized profit: basket value minus spend and fees.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn profit(&self) -> f64 {
        self.baskets() * self.true_value
            - self.total_spend() as f64
            - self.fee_per_trade * self.legs.len() as f64
    }

    /// Whether the quote makes money after fees.
    #[must_use]
    pub fn is_profitable(&self) -> bool {
        self.profit() > 0.0
    }

    /// Shares netted against already-held complements across all positions.
    #[must_use]
    pub fn recombined(&self) -> f64 {
        self.legs.iter().map(LegQuote::recombined).sum()
    }

    /// Net reduction of the cash balance once recombined shares are redeemed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn balance_decrease(&self) -> f64 {
        self.total_spend() as f64 - self.recombined()
    }

    /// Profit per unit of balance committed; unbounded when the trade frees cash.
    #[must_use]
    pub fn roi(&self) -> f64 {
        let decrease = self.balance_decrease();
        if decrease > 0.0 {
            self.profit() / decrease
        } else {
            f64::INFINITY
        }
    }
}

impl Display for PortfolioQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "spend {}, baskets {:.4}, profit {:.4}, balance decrease {:.4}, roi {:.4}",
            self.total_spend(),
            self.baskets(),
            self.profit(),
            self.balance_decrease(),
            self.roi()
        )?;
        for leg in &self.legs {
            writeln!(f, "  {leg}")?;
        }
        Ok(())
    }
}

/// Quantizes and simulates one position.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quote_leg(
    position: &Position,
    weight: u32,
    planned_spend: f64,
    state: &LegState,
) -> Result<LegQuote, ModelError> {
    if !planned_spend.is_finite() {
        return Err(ModelError::NonFiniteAmount(planned_spend));
    }
    let spend = planned_spend.max(0.0).trunc() as u64;
    let side = position.side;
    #[allow(clippy::cast_precision_loss)]
    let amount = spend as f64;
    let after = state.pool.buy(amount, side)?;

    Ok(LegQuote {
        position: position.clone(),
        weight,
        planned_spend,
        spend,
        shares: state.pool.pool(side) - after.pool(side) + amount,
        prob_before: state.pool.prob(),
        prob_after: after.prob(),
        complement_holding: state.holdings.opposite(side),
    })
}
