use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::types::{
    holdings_from_metrics, round_limit_prob, BetRequest, BetResponse, ContractJson,
    ContractMetricJson, UserJson,
};
use crate::arb::position::{Holdings, Position, Side};
use crate::exec::venue::{Account, MarketSnapshot, OrderResult, Venue, VenueError};

/// Public API root.
pub const DEFAULT_BASE_URL: &str = "https://api.manifold.markets/v0/";

/// Request timeout of the HTTP client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client of the Manifold REST API.
#[derive(Debug, Clone)]
pub struct ManifoldClient {
    /// The HTTP client
    client: Client,
    /// API root, ending in `/`
    base: Url,
    /// API key, needed only for order submission
    api_key: Option<String>,
    /// Lifetime of the unfilled remainder of an order
    order_expiry: Duration,
}

impl ManifoldClient {
    /// Creates a client against `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base: Url,
        api_key: Option<String>,
        order_expiry: Duration,
    ) -> Result<Self, VenueError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base,
            api_key,
            order_expiry,
        })
    }

    /// The API root.
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Resolves `path` against the API root.
    fn endpoint(&self, path: &str) -> Result<Url, VenueError> {
        self.base
            .join(path)
            .map_err(|error| VenueError::Decode(format!("bad endpoint {path}: {error}")))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, VenueError> {
        log::debug!("manifold::get: {url}");
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    /// `GET slug/{slug}`
    async fn market(&self, slug: &str) -> Result<ContractJson, VenueError> {
        self.get(self.endpoint(&format!("slug/{slug}"))?).await
    }
}

/// Maps non-success statuses to errors and decodes the body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, VenueError> {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await?;
    if status == StatusCode::NOT_FOUND {
        return Err(VenueError::NotFound(url.path().to_string()));
    }
    if !status.is_success() {
        return Err(VenueError::Transient {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|error| VenueError::Decode(format!("{url}: {error}")))
}

#[async_trait]
impl Venue for ManifoldClient {
    async fn fetch_market_state(&self, position: &Position) -> Result<MarketSnapshot, VenueError> {
        let contract = self.market(&position.market).await?;
        contract.snapshot(position, Utc::now().timestamp_millis())
    }

    async fn fetch_holdings(
        &self,
        market: &MarketSnapshot,
        account: &Account,
    ) -> Result<Holdings, VenueError> {
        if account.user_id.is_empty() {
            return Err(VenueError::MissingCredentials("user id"));
        }
        let mut url = self.endpoint(&format!("market/{}/positions", market.contract_id))?;
        url.query_pairs_mut().append_pair("userId", &account.user_id);
        let metrics: Vec<ContractMetricJson> = self.get(url).await?;
        Ok(holdings_from_metrics(&metrics, market.answer_id.as_deref()))
    }

    async fn submit_order(
        &self,
        market: &MarketSnapshot,
        side: Side,
        amount: u64,
        limit_prob: f64,
    ) -> Result<OrderResult, VenueError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VenueError::MissingCredentials("api key"))?;
        let expiry = chrono::Duration::from_std(self.order_expiry).unwrap_or_default();
        let request = BetRequest {
            amount,
            outcome: side,
            contract_id: market.contract_id.clone(),
            answer_id: market.answer_id.clone(),
            limit_prob: round_limit_prob(limit_prob, side),
            expires_at: (Utc::now() + expiry).timestamp_millis(),
        };
        log::info!(
            "manifold::submit_order: {amount} on {side} in {} at limit {:.2}",
            market.question,
            request.limit_prob
        );

        let response = self
            .client
            .post(self.endpoint("bet")?)
            .header("Authorization", format!("Key {api_key}"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() && status != StatusCode::NOT_FOUND {
            let body = response.text().await?;
            log::warn!("manifold::submit_order: refused with {status}: {body}");
            return Ok(OrderResult::rejected(body));
        }
        let bet: BetResponse = decode(response).await?;
        Ok(OrderResult::accepted(bet.prob_after))
    }

    async fn get_balance(&self, account: &Account) -> Result<f64, VenueError> {
        if account.username.is_empty() {
            return Err(VenueError::MissingCredentials("username"));
        }
        let user: UserJson = self
            .get(self.endpoint(&format!("user/{}", account.username))?)
            .await?;
        Ok(user.balance)
    }
}
