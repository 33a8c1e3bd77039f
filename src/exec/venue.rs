//! Collaborator interface of the trading venue.
//!
//! The executor only ever talks to the venue through [`Venue`]: pool snapshots,
//! account holdings and balance, and order submission. Implementations perform
//! no retries; transient failures surface to the scheduler.

use async_trait::async_trait;
use thiserror::Error;

use crate::arb::error::ModelError;
use crate::arb::pool::PoolState;
use crate::arb::position::{Holdings, Position, Side};

/// Account the bot trades with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    /// Public username, used for balance lookups
    pub username: String,
    /// Venue user id, used for holdings lookups
    pub user_id: String,
}

/// Pass-scoped snapshot of the market (or answer) a position trades in.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    /// Venue id of the market
    pub contract_id: String,
    /// Venue id of the answer for multi-answer markets
    pub answer_id: Option<String>,
    /// Market question, with the answer text appended for answers
    pub question: String,
    /// Public URL of the market
    pub url: String,
    /// Pool reserves at snapshot time
    pub pool: PoolState,
    /// Resolved, or past its close time
    pub is_closed: bool,
}

/// Venue response to an order submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    /// Whether the venue accepted the order
    pub accepted: bool,
    /// YES probability after the order filled, when reported
    pub realized_prob: Option<f64>,
    /// Venue message for rejected orders
    pub message: String,
}

impl OrderResult {
    /// An accepted order that moved the market to `realized_prob`.
    #[must_use]
    pub const fn accepted(realized_prob: Option<f64>) -> Self {
        Self {
            accepted: true,
            realized_prob,
            message: String::new(),
        }
    }

    /// An order the venue refused.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            realized_prob: None,
            message: message.into(),
        }
    }
}

/// Failures talking to the venue.
#[derive(Error, Debug)]
pub enum VenueError {
    /// The market, answer or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Non-success response; the scheduler may retry on a later cycle.
    #[error("venue returned {status}: {body}")]
    Transient {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// A response body that does not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Connection or protocol failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A call that needs credentials the client was built without.
    #[error("missing credential: {0}")]
    MissingCredentials(&'static str),

    /// The venue reported pool reserves the AMM model rejects.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Market data, account data and order submission.
#[async_trait]
pub trait Venue: Send + Sync {
    /// Fetches the pool snapshot of the market or answer `position` trades in.
    ///
    /// # Errors
    ///
    /// Returns [`VenueError::NotFound`] for unknown references and
    /// [`VenueError::Transient`] for other non-success responses.
    async fn fetch_market_state(&self, position: &Position) -> Result<MarketSnapshot, VenueError>;

    /// Fetches the shares `account` owns in `market`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn fetch_holdings(
        &self,
        market: &MarketSnapshot,
        account: &Account,
    ) -> Result<Holdings, VenueError>;

    /// Submits an order spending `amount` on `side` with `limit_prob` as the
    /// YES-probability limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. A refused order is
    /// `Ok` with [`OrderResult::accepted`] unset.
    async fn submit_order(
        &self,
        market: &MarketSnapshot,
        side: Side,
        amount: u64,
        limit_prob: f64,
    ) -> Result<OrderResult, VenueError>;

    /// Fetches the cash balance of `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn get_balance(&self, account: &Account) -> Result<f64, VenueError>;
}
