//! # Arbitrage Executor
//!
//! One pass over one portfolio:
//!
//! 1. refresh pool and holdings snapshots for every position,
//! 2. plan the continuous allocation,
//! 3. quantize spends to integers and
//! 4. simulate them against the snapshots,
//! 5. reject unprofitable quotes,
//! 6. reject quotes the balance cannot cover,
//! 7. net new shares against held complements and gate on ROI,
//! 8. gate every leg on the minimum trade and the per-trade ceiling,
//! 9. submit one order per position, stopping at the first failure,
//! 10. refresh every touched position again.
//!
//! Steps 1 to 8 never touch the account. Rejections there are pass-local and
//! returned as [`PassOutcome::Rejected`]. A failed or refused order, or a spend
//! above the ceiling, is run-fatal and returned as an [`ExecutionError`].

use std::collections::HashMap;
use std::fmt::{self, Display};

use thiserror::Error;

use super::venue::{Account, MarketSnapshot, OrderResult, Venue, VenueError};
use crate::arb::error::{PlanError, SolverError};
use crate::arb::planner::{ArbPlanner, LegState, PlannerConfig};
use crate::arb::portfolio::Portfolio;
use crate::arb::position::Position;
use crate::arb::quote::PortfolioQuote;
use crate::arb::solver::{MaximinSolver, Solver};

/// Limits and switches of the execution policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutorConfig {
    /// Fees, value and per-position caps handed to the planner
    pub planner: PlannerConfig,
    /// Smallest spend worth submitting on any position
    pub min_trade: u64,
    /// Largest spend ever submitted on one position; exceeding it stops the run
    pub max_trade: u64,
    /// Smallest ROI worth committing capital to
    pub min_roi: f64,
    /// Plan and gate, but never submit
    pub dry_run: bool,
    /// Largest tolerated gap between target and realized probability
    pub price_tolerance: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            min_trade: 1,
            max_trade: 500,
            min_roi: 0.01,
            dry_run: false,
            price_tolerance: 0.001,
        }
    }
}

/// Why a pass stopped before committing capital.
#[derive(Debug)]
pub enum Rejection {
    /// A position trades in a resolved or closed market
    MarketClosed(Position),
    /// Planning or simulation violated the AMM model
    Model(PlanError),
    /// The solver did not report an optimum
    Solver(SolverError),
    /// The quantized trade loses money after fees
    Unprofitable(f64),
    /// The balance cannot cover the total spend
    InsufficientBalance {
        /// Total spend of the quote
        required: u64,
        /// Balance at refresh time
        balance: f64,
    },
    /// Return on the committed balance is too small
    LowRoi {
        /// ROI of the quote
        roi: f64,
        /// Configured minimum
        min_roi: f64,
    },
    /// A leg spends less than the minimum meaningful trade
    BelowMinimumTrade {
        /// Position with the small spend
        position: Position,
        /// Quantized spend
        spend: u64,
        /// Configured minimum
        min_trade: u64,
    },
}

impl Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarketClosed(position) => write!(f, "market closed: {position}"),
            Self::Model(error) => write!(f, "model error: {error}"),
            Self::Solver(error) => {
                write!(f, "solver failure: {} returned {:?}", error.solver, error.status)
            }
            Self::Unprofitable(profit) => write!(f, "unprofitable: profit {profit:.4}"),
            Self::InsufficientBalance { required, balance } => {
                write!(f, "insufficient balance: need {required}, have {balance:.2}")
            }
            Self::LowRoi { roi, min_roi } => {
                write!(f, "roi {roi:.4} at or below minimum {min_roi:.4}")
            }
            Self::BelowMinimumTrade {
                position,
                spend,
                min_trade,
            } => write!(f, "spend {spend} on {position} below minimum trade {min_trade}"),
        }
    }
}

impl From<PlanError> for Rejection {
    fn from(error: PlanError) -> Self {
        match error {
            PlanError::Solver(error) => Self::Solver(error),
            error => Self::Model(error),
        }
    }
}

/// Run-fatal execution failures, plus venue failures surfaced to the scheduler.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// An order call errored mid-commit; open legs are unknown.
    #[error("order submission failed for {position}: {source}")]
    SubmissionFailed {
        /// Position whose order failed
        position: Position,
        /// Venue failure
        #[source]
        source: VenueError,
    },

    /// The venue refused an order mid-commit.
    #[error("order refused for {position}: {message}")]
    OrderRejected {
        /// Position whose order was refused
        position: Position,
        /// Venue message
        message: String,
    },

    /// A planned spend above the per-trade ceiling; the optimizer diverged.
    #[error("spend {spend} on {position} exceeds the per-trade ceiling {ceiling}")]
    SpendCeilingExceeded {
        /// Position with the oversized spend
        position: Position,
        /// Quantized spend
        spend: u64,
        /// Configured ceiling
        ceiling: u64,
    },

    /// Market or account data could not be read. Not fatal for the run.
    #[error(transparent)]
    Venue(#[from] VenueError),
}

impl ExecutionError {
    /// Whether the run must stop for human inspection.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Venue(_))
    }
}

/// Pass-scoped view of the venue for one portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Market snapshot per position
    pub markets: HashMap<Position, MarketSnapshot>,
    /// Pool and holdings per position
    pub states: HashMap<Position, LegState>,
    /// Cash balance of the account
    pub balance: f64,
}

/// Result of the read-only steps of a pass.
#[derive(Debug)]
pub enum Quoted {
    /// Every gate passed; the quote can be committed
    Accepted {
        /// Snapshot the quote was made from
        snapshot: Snapshot,
        /// Quantized and simulated allocation
        quote: PortfolioQuote,
    },
    /// A gate rejected the pass
    Rejected(Rejection),
}

/// Orders placed by a committed pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// The committed quote
    pub quote: PortfolioQuote,
    /// Venue response per position, in portfolio order
    pub orders: Vec<(Position, OrderResult)>,
    /// Positions whose realized probability missed the target by more than
    /// the price tolerance
    pub drifted: Vec<Position>,
}

/// Outcome of one pass.
#[derive(Debug)]
pub enum PassOutcome {
    /// Every order was accepted
    Executed(Execution),
    /// Dry run: the quote passed every gate and nothing was submitted
    DryRun(PortfolioQuote),
    /// The pass stopped before committing capital
    Rejected(Rejection),
}

/// Turns plans into bounded orders against a [`Venue`].
#[derive(Debug)]
pub struct ArbExecutor<V, S = MaximinSolver> {
    /// Market data and order submission
    venue: V,
    /// Sizing of each pass
    planner: ArbPlanner<S>,
    /// Account traded with
    account: Account,
    /// Execution policy
    config: ExecutorConfig,
}

impl<V: Venue, S: Solver> ArbExecutor<V, S> {
    /// Creates an executor.
    pub const fn new(venue: V, solver: S, account: Account, config: ExecutorConfig) -> Self {
        Self {
            venue,
            planner: ArbPlanner::new(config.planner, solver),
            account,
            config,
        }
    }

    /// The venue used by the executor.
    pub const fn venue(&self) -> &V {
        &self.venue
    }

    /// The account traded with.
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Execution policy.
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Pulls fresh market, holdings and balance snapshots for every position.
    ///
    /// # Errors
    ///
    /// Returns an error if any venue call fails.
    pub async fn refresh(&self, portfolio: &Portfolio) -> Result<Snapshot, VenueError> {
        let mut markets = HashMap::with_capacity(portfolio.len());
        let mut states = HashMap::with_capacity(portfolio.len());
        for position in portfolio.positions() {
            let market = self.venue.fetch_market_state(position).await?;
            let holdings = self.venue.fetch_holdings(&market, &self.account).await?;
            states.insert(
                position.clone(),
                LegState {
                    pool: market.pool,
                    holdings,
                },
            );
            markets.insert(position.clone(), market);
        }
        let balance = self.venue.get_balance(&self.account).await?;
        Ok(Snapshot {
            markets,
            states,
            balance,
        })
    }

    /// Runs the read-only steps of a pass: refresh, plan, quantize, simulate and gate.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::SpendCeilingExceeded`] if a leg spends above
    /// the ceiling, and [`ExecutionError::Venue`] if a refresh call fails.
    pub async fn quote(&self, portfolio: &Portfolio) -> Result<Quoted, ExecutionError> {
        let snapshot = self.refresh(portfolio).await?;

        if let Some(position) = portfolio
            .positions()
            .find(|p| snapshot.markets.get(*p).is_some_and(|m| m.is_closed))
        {
            return Ok(self.reject(portfolio, Rejection::MarketClosed(position.clone()), None));
        }

        let plan = match self.planner.plan(portfolio, &snapshot.states) {
            Ok(plan) => plan,
            Err(error) => return Ok(self.reject(portfolio, error.into(), None)),
        };
        log::debug!(
            "executor::quote: {portfolio} planned profit {:.4} over {:.4} baskets\n{}",
            plan.expected_profit,
            plan.baskets,
            plan.allocation
        );

        let quote =
            match PortfolioQuote::new(portfolio, &plan, &snapshot.states, &self.config.planner) {
                Ok(quote) => quote,
                Err(error) => return Ok(self.reject(portfolio, error.into(), None)),
            };

        let profit = quote.profit();
        if profit <= 0.0 {
            return Ok(self.reject(portfolio, Rejection::Unprofitable(profit), Some(&quote)));
        }

        #[allow(clippy::cast_precision_loss)]
        let total_spend = quote.total_spend() as f64;
        if total_spend > snapshot.balance {
            let rejection = Rejection::InsufficientBalance {
                required: quote.total_spend(),
                balance: snapshot.balance,
            };
            return Ok(self.reject(portfolio, rejection, Some(&quote)));
        }

        let roi = quote.roi();
        if roi <= self.config.min_roi {
            let rejection = Rejection::LowRoi {
                roi,
                min_roi: self.config.min_roi,
            };
            return Ok(self.reject(portfolio, rejection, Some(&quote)));
        }

        if let Some(leg) = quote.legs().iter().find(|leg| leg.spend > self.config.max_trade) {
            log::error!(
                "executor::quote: spend {} on {} exceeds ceiling {}\n{quote}",
                leg.spend,
                leg.position,
                self.config.max_trade
            );
            return Err(ExecutionError::SpendCeilingExceeded {
                position: leg.position.clone(),
                spend: leg.spend,
                ceiling: self.config.max_trade,
            });
        }

        if let Some(leg) = quote.legs().iter().find(|leg| leg.spend < self.config.min_trade) {
            let rejection = Rejection::BelowMinimumTrade {
                position: leg.position.clone(),
                spend: leg.spend,
                min_trade: self.config.min_trade,
            };
            return Ok(self.reject(portfolio, rejection, Some(&quote)));
        }

        Ok(Quoted::Accepted { snapshot, quote })
    }

    /// Runs one full pass over `portfolio`.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`ExecutionError`] if an order fails or is refused, or a
    /// spend exceeds the ceiling. Refresh failures before the commit phase are
    /// returned as [`ExecutionError::Venue`].
    pub async fn run_pass(&self, portfolio: &Portfolio) -> Result<PassOutcome, ExecutionError> {
        let (snapshot, quote) = match self.quote(portfolio).await? {
            Quoted::Accepted { snapshot, quote } => (snapshot, quote),
            Quoted::Rejected(rejection) => return Ok(PassOutcome::Rejected(rejection)),
        };

        if self.config.dry_run {
            log::info!("executor::pass: dry run, would submit for {portfolio}\n{quote}");
            return Ok(PassOutcome::DryRun(quote));
        }

        log::info!("executor::pass: committing {portfolio}\n{quote}");
        let committed = self.commit(&snapshot, &quote).await;

        match self.refresh(portfolio).await {
            Ok(after) => {
                for (position, state) in &after.states {
                    log::info!("executor::pass: after commit {position}: {}", state.pool);
                }
                log::info!("executor::pass: balance after commit {:.2}", after.balance);
            }
            Err(error) => log::warn!("executor::pass: post-commit refresh failed: {error}"),
        }

        let (orders, drifted) = committed?;
        Ok(PassOutcome::Executed(Execution {
            quote,
            orders,
            drifted,
        }))
    }

    /// Submits one order per leg, stopping at the first failure. Returns the
    /// orders and the positions that filled off target.
    async fn commit(
        &self,
        snapshot: &Snapshot,
        quote: &PortfolioQuote,
    ) -> Result<(Vec<(Position, OrderResult)>, Vec<Position>), ExecutionError> {
        let mut orders = Vec::with_capacity(quote.legs().len());
        let mut drifted = Vec::new();
        for leg in quote.legs() {
            let Some(market) = snapshot.markets.get(&leg.position) else {
                return Err(ExecutionError::SubmissionFailed {
                    position: leg.position.clone(),
                    source: VenueError::NotFound(leg.position.to_string()),
                });
            };

            log::info!(
                "executor::commit: {} at {}: pay {} for {:.2} shares, prob {:.4} -> {:.4}",
                leg.position,
                market.url,
                leg.spend,
                leg.shares,
                leg.prob_before,
                leg.prob_after
            );

            let result = self
                .venue
                .submit_order(market, leg.position.side, leg.spend, leg.prob_after)
                .await
                .map_err(|source| {
                    log::error!("executor::commit: order for {} failed: {source}", leg.position);
                    ExecutionError::SubmissionFailed {
                        position: leg.position.clone(),
                        source,
                    }
                })?;

            if !result.accepted {
                log::error!(
                    "executor::commit: order for {} refused: {}",
                    leg.position,
                    result.message
                );
                return Err(ExecutionError::OrderRejected {
                    position: leg.position.clone(),
                    message: result.message,
                });
            }

            if let Some(realized) = result.realized_prob {
                if (realized - leg.prob_after).abs() > self.config.price_tolerance {
                    log::warn!(
                        "executor::commit: {} expected final prob {:.4} but got {realized:.4}",
                        leg.position,
                        leg.prob_after
                    );
                    drifted.push(leg.position.clone());
                }
            }

            orders.push((leg.position.clone(), result));
        }
        Ok((orders, drifted))
    }

    /// Logs a rejection with the proposed allocation and wraps it.
    fn reject(
        &self,
        portfolio: &Portfolio,
        rejection: Rejection,
        quote: Option<&PortfolioQuote>,
    ) -> Quoted {
        match quote {
            Some(quote) => {
                log::info!("executor::quote: rejected {portfolio}: {rejection}\n{quote}");
            }
            None => log::info!("executor::quote: rejected {portfolio}: {rejection}"),
        }
        Quoted::Rejected(rejection)
    }
}
