use std::collections::HashSet;
use std::time::Duration;

use eyre::Result;

use crate::arb::portfolio::Portfolio;
use crate::arb::quote::PortfolioQuote;
use crate::arb::solver::{MaximinSolver, Solver};
use crate::exec::executor::{ArbExecutor, ExecutionError, PassOutcome, Quoted};
use crate::exec::venue::Venue;

/// A portfolio whose quote passed every gate, ready to be executed.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    /// Index of the portfolio in the bot's list
    pub index: usize,
    /// Quote at ranking time
    pub quote: PortfolioQuote,
}

/// Tally of one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Portfolios whose orders were all accepted
    pub executed: usize,
    /// Portfolios that passed every gate in dry-run mode
    pub dry_runs: usize,
    /// Portfolios rejected by a gate
    pub rejected: usize,
    /// Portfolios skipped because a market was already traded this cycle
    pub skipped: usize,
    /// Portfolios skipped because the venue could not be read
    pub unavailable: usize,
    /// Capital committed across the cycle
    pub committed: u64,
    /// Balance at the start of the cycle
    pub starting_balance: f64,
    /// Balance at the end of the cycle, if it could be read
    pub ending_balance: Option<f64>,
}

/// Scheduling layer: cycles over the curated portfolios one at a time.
#[derive(Debug)]
pub struct Bot<V, S = MaximinSolver> {
    /// Executes one portfolio pass at a time
    executor: ArbExecutor<V, S>,
    /// Curated portfolios
    portfolios: Vec<Portfolio>,
    /// Pause between cycles
    cycle_pause: Duration,
}

impl<V: Venue, S: Solver> Bot<V, S> {
    /// Creates a bot.
    pub const fn new(
        executor: ArbExecutor<V, S>,
        portfolios: Vec<Portfolio>,
        cycle_pause: Duration,
    ) -> Self {
        Self {
            executor,
            portfolios,
            cycle_pause,
        }
    }

    /// The executor driving each pass.
    pub const fn executor(&self) -> &ArbExecutor<V, S> {
        &self.executor
    }

    /// Curated portfolios.
    pub fn portfolios(&self) -> &[Portfolio] {
        &self.portfolios
    }

    /// Quotes every portfolio and orders the tradeable ones by ROI, best first.
    ///
    /// Rejected portfolios and portfolios whose markets cannot be read are
    /// left out.
    ///
    /// # Errors
    ///
    /// Returns an error if quoting hits a run-fatal condition.
    pub async fn rank(&self) -> Result<Vec<Ranked>, ExecutionError> {
        let mut ranked = Vec::new();
        for (index, portfolio) in self.portfolios.iter().enumerate() {
            match self.executor.quote(portfolio).await {
                Ok(Quoted::Accepted { quote, .. }) => ranked.push(Ranked { index, quote }),
                Ok(Quoted::Rejected(_)) => {}
                Err(error) if !error.is_fatal() => {
                    log::warn!("bot::rank: skipping {portfolio}: {error}");
                }
                Err(error) => return Err(error),
            }
        }
        ranked.sort_by(|a, b| b.quote.roi().total_cmp(&a.quote.roi()));
        Ok(ranked)
    }

    /// Runs one cycle: rank, then execute portfolios in ROI order, never
    /// trading a market twice in the same cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the starting balance cannot be read or a pass hits
    /// a run-fatal condition.
    pub async fn run_cycle(&self) -> Result<CycleReport, ExecutionError> {
        let venue = self.executor.venue();
        let account = self.executor.account();
        let mut report = CycleReport {
            starting_balance: venue.get_balance(account).await?,
            ..CycleReport::default()
        };

        let ranked = self.rank().await?;
        log::info!(
            "bot::cycle: {} of {} portfolios tradeable",
            ranked.len(),
            self.portfolios.len()
        );

        let mut touched: HashSet<String> = HashSet::new();
        for Ranked { index, quote } in ranked {
            let portfolio = &self.portfolios[index];
            let markets = portfolio.markets();
            if markets.iter().any(|market| touched.contains(*market)) {
                log::debug!("bot::cycle: {portfolio} touches a market traded this cycle");
                report.skipped += 1;
                continue;
            }
            touched.extend(markets.into_iter().map(str::to_string));

            log::info!("bot::cycle: ranked roi {:.4} for {portfolio}", quote.roi());
            match self.executor.run_pass(portfolio).await {
                Ok(PassOutcome::Executed(execution)) => {
                    report.executed += 1;
                    report.committed += execution.quote.total_spend();
                }
                Ok(PassOutcome::DryRun(_)) => report.dry_runs += 1,
                Ok(PassOutcome::Rejected(_)) => report.rejected += 1,
                Err(error) if !error.is_fatal() => {
                    log::warn!("bot::cycle: skipping {portfolio}: {error}");
                    report.unavailable += 1;
                }
                Err(error) => {
                    log::error!("bot::cycle: halting on {portfolio}: {error}");
                    return Err(error);
                }
            }
        }

        report.ending_balance = match venue.get_balance(account).await {
            Ok(balance) => Some(balance),
            Err(error) => {
                log::warn!("bot::cycle: could not read ending balance: {error}");
                None
            }
        };
        log::info!(
            "bot::cycle: committed {} from starting balance {:.2} to ending balance {}",
            report.committed,
            report.starting_balance,
            report
                .ending_balance
                .map_or_else(|| "unknown".to_string(), |b| format!("{b:.2}"))
        );
        Ok(report)
    }

    /// Runs cycles until interrupted or a run-fatal error occurs.
    ///
    /// # Errors
    ///
    /// Returns an error on the first run-fatal execution error.
    pub async fn run(&self) -> Result<()> {
        log::info!(
            "bot::run: starting with {} portfolios, pause {:?}",
            self.portfolios.len(),
            self.cycle_pause
        );
        loop {
            match self.run_cycle().await {
                Ok(report) => log::info!("bot::run: cycle done {report:?}"),
                Err(error) if !error.is_fatal() => {
                    log::warn!("bot::run: cycle aborted: {error}");
                }
                Err(error) => {
                    return Err(eyre::eyre!(error).wrap_err("halted for manual inspection"));
                }
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    log::info!("bot::run: interrupted");
                    return Ok(());
                }
                () = tokio::time::sleep(self.cycle_pause) => {}
            }
        }
    }
}
