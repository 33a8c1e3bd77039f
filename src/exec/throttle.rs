use std::time::Duration;

use async_trait::async_trait;

use super::venue::{Account, MarketSnapshot, OrderResult, Venue, VenueError};
use crate::arb::position::{Holdings, Position, Side};

/// Minimum pause before every read request.
pub const DEFAULT_READ_DELAY: Duration = Duration::from_millis(10);

/// Minimum pause before every order submission.
pub const DEFAULT_ORDER_DELAY: Duration = Duration::from_secs(6);

/// Wraps a [`Venue`] and sleeps before every call to respect the venue's rate limits.
///
/// Calls are sequential, so a fixed pause before each call bounds the request rate.
#[derive(Debug, Clone)]
pub struct Throttled<V> {
    /// Wrapped venue
    inner: V,
    /// Pause before reads
    read_delay: Duration,
    /// Pause before order submissions
    order_delay: Duration,
}

impl<V: Venue> Throttled<V> {
    /// Wraps `inner` with the given delays.
    pub const fn new(inner: V, read_delay: Duration, order_delay: Duration) -> Self {
        Self {
            inner,
            read_delay,
            order_delay,
        }
    }

    /// Wraps `inner` with the default delays.
    pub const fn with_default_delays(inner: V) -> Self {
        Self::new(inner, DEFAULT_READ_DELAY, DEFAULT_ORDER_DELAY)
    }

    /// The wrapped venue.
    pub const fn inner(&self) -> &V {
        &self.inner
    }
}

#[async_trait]
impl<V: Venue> Venue for Throttled<V> {
    async fn fetch_market_state(&self, position: &Position) -> Result<MarketSnapshot, VenueError> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.fetch_market_state(position).await
    }

    async fn fetch_holdings(
        &self,
        market: &MarketSnapshot,
        account: &Account,
    ) -> Result<Holdings, VenueError> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.fetch_holdings(market, account).await
    }

    async fn submit_order(
        &self,
        market: &MarketSnapshot,
        side: Side,
        amount: u64,
        limit_prob: f64,
    ) -> Result<OrderResult, VenueError> {
        tokio::time::sleep(self.order_delay).await;
        self.inner
            .submit_order(market, side, amount, limit_prob)
            .await
    }

    async fn get_balance(&self, account: &Account) -> Result<f64, VenueError> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.get_balance(account).await
    }
}
