use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::venue::{Account, MarketSnapshot, OrderResult, Venue, VenueError};
use crate::arb::pool::PoolState;
use crate::arb::position::{Holdings, Position, Side};

/// A recorded venue call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchMarket(Position),
    FetchHoldings(String),
    SubmitOrder {
        contract_id: String,
        side: Side,
        amount: u64,
        limit_prob: f64,
    },
    GetBalance,
}

/// In-memory venue with scripted markets, holdings and balance.
///
/// Markets are keyed by the YES position of their outcome space and the
/// contract id is the market reference. Accepted orders report the limit
/// probability as realized unless a drift is scripted.
#[derive(Debug, Default)]
pub struct MockVenue {
    markets: HashMap<Position, MarketSnapshot>,
    holdings: HashMap<String, Holdings>,
    balance: f64,
    rejected: HashSet<String>,
    failing: HashSet<String>,
    price_drift: f64,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl MockVenue {
    pub fn new() -> Self {
        Self {
            balance: 1_000.0,
            ..Self::default()
        }
    }

    pub fn with_market(mut self, position: Position, pool: PoolState) -> Self {
        let canonical = position.canonical();
        let snapshot = MarketSnapshot {
            contract_id: canonical.market.clone(),
            answer_id: canonical.answer.clone(),
            question: format!("Will {} happen?", canonical.market),
            url: format!("https://example.test/{}", canonical.market),
            pool,
            is_closed: false,
        };
        self.markets.insert(canonical, snapshot);
        self
    }

    pub fn closed(mut self, position: &Position) -> Self {
        if let Some(snapshot) = self.markets.get_mut(&position.canonical()) {
            snapshot.is_closed = true;
        }
        self
    }

    pub fn with_holdings(mut self, market: &str, holdings: Holdings) -> Self {
        self.holdings.insert(market.to_string(), holdings);
        self
    }

    pub const fn with_balance(mut self, balance: f64) -> Self {
        self.balance = balance;
        self
    }

    /// Orders on `market` come back refused.
    pub fn rejecting(mut self, market: &str) -> Self {
        self.rejected.insert(market.to_string());
        self
    }

    /// Orders on `market` fail at the transport level.
    pub fn failing(mut self, market: &str) -> Self {
        self.failing.insert(market.to_string());
        self
    }

    pub const fn with_price_drift(mut self, drift: f64) -> Self {
        self.price_drift = drift;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn orders(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::SubmitOrder { .. }))
            .collect()
    }

    pub fn market_fetches(&self) -> Vec<Position> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::FetchMarket(position) => Some(position),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Venue for MockVenue {
    async fn fetch_market_state(&self, position: &Position) -> Result<MarketSnapshot, VenueError> {
        self.record(Call::FetchMarket(position.clone()));
        self.markets
            .get(&position.canonical())
            .cloned()
            .ok_or_else(|| VenueError::NotFound(position.market.clone()))
    }

    async fn fetch_holdings(
        &self,
        market: &MarketSnapshot,
        _account: &Account,
    ) -> Result<Holdings, VenueError> {
        self.record(Call::FetchHoldings(market.contract_id.clone()));
        Ok(self
            .holdings
            .get(&market.contract_id)
            .copied()
            .unwrap_or_default())
    }

    async fn submit_order(
        &self,
        market: &MarketSnapshot,
        side: Side,
        amount: u64,
        limit_prob: f64,
    ) -> Result<OrderResult, VenueError> {
        self.record(Call::SubmitOrder {
            contract_id: market.contract_id.clone(),
            side,
            amount,
            limit_prob,
        });
        if self.failing.contains(&market.contract_id) {
            return Err(VenueError::Transient {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        if self.rejected.contains(&market.contract_id) {
            return Ok(OrderResult::rejected("insufficient liquidity"));
        }
        Ok(OrderResult::accepted(Some(limit_prob + self.price_drift)))
    }

    async fn get_balance(&self, _account: &Account) -> Result<f64, VenueError> {
        self.record(Call::GetBalance);
        Ok(self.balance)
    }
}
