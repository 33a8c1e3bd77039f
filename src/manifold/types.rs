//! Wire types of the Manifold REST API and their conversion into venue snapshots.

use serde::{Deserialize, Serialize};

use crate::arb::pool::PoolState;
use crate::arb::position::{Holdings, Position, Side};
use crate::exec::venue::{MarketSnapshot, VenueError};

/// AMM weight assumed for every answer of a multi-answer market.
pub const MULTI_ANSWER_P: f64 = 0.5;

/// Pool reserves keyed by outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolJson {
    /// YES reserve
    #[serde(rename = "YES")]
    pub yes: f64,
    /// NO reserve
    #[serde(rename = "NO")]
    pub no: f64,
}

/// One answer of a multi-answer market.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerJson {
    /// Answer id
    pub id: String,
    /// Answer text, used as the answer reference
    pub text: String,
    /// Reserves in the nested form
    #[serde(default)]
    pub pool: Option<PoolJson>,
    /// YES reserve in the flat form
    #[serde(default)]
    pub pool_yes: Option<f64>,
    /// NO reserve in the flat form
    #[serde(default)]
    pub pool_no: Option<f64>,
}

impl AnswerJson {
    /// Reserves `(yes, no)` in whichever form the response used.
    #[must_use]
    pub fn reserves(&self) -> Option<(f64, f64)> {
        match (self.pool, self.pool_yes, self.pool_no) {
            (Some(pool), _, _) => Some((pool.yes, pool.no)),
            (None, Some(yes), Some(no)) => Some((yes, no)),
            _ => None,
        }
    }
}

/// A market as returned by `GET slug/{slug}` and `GET market/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractJson {
    /// Market id
    pub id: String,
    /// Market slug
    pub slug: String,
    /// Market question
    pub question: String,
    /// Public URL
    pub url: String,
    /// Reserves of a binary market
    #[serde(default)]
    pub pool: Option<PoolJson>,
    /// AMM weight of a binary market
    #[serde(default)]
    pub p: Option<f64>,
    /// Whether the market has resolved
    #[serde(default)]
    pub is_resolved: bool,
    /// Close time in milliseconds since the epoch
    #[serde(default)]
    pub close_time: Option<i64>,
    /// Answers of a multi-answer market
    #[serde(default)]
    pub answers: Vec<AnswerJson>,
}

impl ContractJson {
    /// Resolved, or past its close time at `now_ms`.
    #[must_use]
    pub fn is_closed(&self, now_ms: i64) -> bool {
        self.is_resolved || self.close_time.is_some_and(|close| close < now_ms)
    }

    /// Snapshot of the market or answer `position` trades in.
    ///
    /// # Errors
    ///
    /// Returns [`VenueError::NotFound`] if the answer does not exist,
    /// [`VenueError::Decode`] if the reserves are missing and
    /// [`VenueError::Model`] if they are not a valid pool.
    pub fn snapshot(&self, position: &Position, now_ms: i64) -> Result<MarketSnapshot, VenueError> {
        let is_closed = self.is_closed(now_ms);
        match &position.answer {
            None => {
                let (Some(pool), Some(p)) = (self.pool, self.p) else {
                    return Err(VenueError::Decode(format!(
                        "market {} has no binary pool",
                        self.slug
                    )));
                };
                Ok(MarketSnapshot {
                    contract_id: self.id.clone(),
                    answer_id: None,
                    question: self.question.clone(),
                    url: self.url.clone(),
                    pool: PoolState::new(pool.yes, pool.no, p)?,
                    is_closed,
                })
            }
            Some(text) => {
                let answer = self
                    .answers
                    .iter()
                    .find(|answer| &answer.text == text)
                    .ok_or_else(|| VenueError::NotFound(format!("{} [{text}]", self.slug)))?;
                let (yes, no) = answer.reserves().ok_or_else(|| {
                    VenueError::Decode(format!("answer {} of {} has no pool", answer.id, self.slug))
                })?;
                Ok(MarketSnapshot {
                    contract_id: self.id.clone(),
                    answer_id: Some(answer.id.clone()),
                    question: format!("{} ({text})", self.question),
                    url: self.url.clone(),
                    pool: PoolState::new(yes, no, MULTI_ANSWER_P)?,
                    is_closed,
                })
            }
        }
    }
}

/// Share totals keyed by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct SharesJson {
    /// YES shares
    #[serde(rename = "YES", default)]
    pub yes: f64,
    /// NO shares
    #[serde(rename = "NO", default)]
    pub no: f64,
}

/// A user's position in one market or answer, from `GET market/{id}/positions`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetricJson {
    /// Market id
    pub contract_id: String,
    /// Answer id for multi-answer markets
    #[serde(default)]
    pub answer_id: Option<String>,
    /// Whether any YES shares are held
    #[serde(default)]
    pub has_yes_shares: bool,
    /// Whether any NO shares are held
    #[serde(default)]
    pub has_no_shares: bool,
    /// Shares held per outcome
    #[serde(default)]
    pub total_shares: SharesJson,
}

/// Sums the metrics that belong to `answer_id` into holdings.
#[must_use]
pub fn holdings_from_metrics(metrics: &[ContractMetricJson], answer_id: Option<&str>) -> Holdings {
    metrics
        .iter()
        .filter(|metric| answer_id.is_none() || metric.answer_id.as_deref() == answer_id)
        .fold(Holdings::default(), |mut holdings, metric| {
            if metric.has_yes_shares {
                holdings.yes_shares += metric.total_shares.yes;
            }
            if metric.has_no_shares {
                holdings.no_shares += metric.total_shares.no;
            }
            holdings
        })
}

/// A user as returned by `GET user/{username}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserJson {
    /// User id
    pub id: String,
    /// Username
    pub username: String,
    /// Cash balance
    pub balance: f64,
}

/// Body of `POST bet`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRequest {
    /// Integer amount to spend
    pub amount: u64,
    /// Outcome bought
    pub outcome: Side,
    /// Market id
    pub contract_id: String,
    /// Answer id for multi-answer markets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_id: Option<String>,
    /// YES-probability limit, in whole cents
    pub limit_prob: f64,
    /// Expiry of the unfilled remainder in milliseconds since the epoch
    pub expires_at: i64,
}

/// Response of `POST bet`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetResponse {
    /// YES probability after the bet
    #[serde(default)]
    pub prob_after: Option<f64>,
}

/// Rounds a limit probability to whole cents inside `[0.01, 0.99]`, the
/// only limits the venue accepts.
///
/// A YES buy pushes the probability up, so its limit rounds up; a NO buy
/// rounds down. Either way the limit never cuts the fill short of `prob`.
#[must_use]
pub fn round_limit_prob(prob: f64, side: Side) -> f64 {
    // strip float noise such as 0.07 * 100 = 7.000000000000001
    let cents = (prob * 100.0 * 1e6).round() / 1e6;
    let cents = match side {
        Side::Yes => cents.ceil(),
        Side::No => cents.floor(),
    };
    (cents / 100.0).clamp(0.01, 0.99)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BINARY: &str = r#"{
        "id": "7saOUy7MabAtKEBq5rvg",
        "creatorUsername": "BoltonBailey",
        "closeTime": 2258427540000,
        "question": "Will Bitcoin hit $100k before it next hits $10k?",
        "slug": "will-bitcoin-hit-100k-before-it-nex",
        "url": "https://manifold.markets/BoltonBailey/will-bitcoin-hit-100k-before-it-nex",
        "pool": {"NO": 793.1264716510092, "YES": 437.8014737450576},
        "probability": 0.65,
        "p": 0.5062051978411725,
        "outcomeType": "BINARY",
        "mechanism": "cpmm-1",
        "isResolved": false
    }"#;

    const MULTI: &str = r#"{
        "id": "multi1",
        "question": "Who will be nominated?",
        "slug": "who-nominated",
        "url": "https://manifold.markets/x/who-nominated",
        "isResolved": false,
        "closeTime": 1000,
        "mechanism": "cpmm-multi-1",
        "answers": [
            {"id": "ans1", "text": "Only Biden", "poolYes": 30.0, "poolNo": 70.0, "probability": 0.7},
            {"id": "ans2", "text": "Neither", "pool": {"YES": 90.0, "NO": 10.0}}
        ]
    }"#;

    #[test]
    fn test_binary_snapshot() {
        let contract: ContractJson = serde_json::from_str(BINARY).unwrap();
        let position = Position::yes("will-bitcoin-hit-100k-before-it-nex");
        let snapshot = contract.snapshot(&position, 1_700_000_000_000).unwrap();
        assert_eq!(snapshot.contract_id, "7saOUy7MabAtKEBq5rvg");
        assert_eq!(snapshot.answer_id, None);
        assert!(!snapshot.is_closed);
        assert!((snapshot.pool.p() - 0.506_205_197_841_172_5).abs() < 1e-15);
        assert!((snapshot.pool.prob() - 0.65).abs() < 1e-3);
        // past the close time
        assert!(contract.snapshot(&position, 2_300_000_000_000).unwrap().is_closed);
    }

    #[test]
    fn test_answer_snapshot() {
        let contract: ContractJson = serde_json::from_str(MULTI).unwrap();
        for (text, id, prob) in &[("Only Biden", "ans1", 0.7), ("Neither", "ans2", 0.1)] {
            let position = Position::answer("who-nominated", *text, Side::No);
            let snapshot = contract.snapshot(&position, 0).unwrap();
            assert_eq!(snapshot.answer_id.as_deref(), Some(*id));
            assert_eq!(snapshot.pool.p(), MULTI_ANSWER_P);
            assert!((snapshot.pool.prob() - prob).abs() < 1e-12);
            assert!(snapshot.question.ends_with(&format!("({text})")));
        }

        let missing = Position::answer("who-nominated", "Both", Side::Yes);
        assert!(matches!(
            contract.snapshot(&missing, 0),
            Err(VenueError::NotFound(_))
        ));
        // a multi-answer market has no binary pool
        assert!(matches!(
            contract.snapshot(&Position::yes("who-nominated"), 0),
            Err(VenueError::Decode(_))
        ));
        assert!(contract.is_closed(2_000));
    }

    #[test]
    fn test_holdings_from_metrics() {
        let metrics: Vec<ContractMetricJson> = serde_json::from_str(
            r#"[
                {"contractId": "multi1", "answerId": "ans1", "hasYesShares": true,
                 "hasNoShares": false, "totalShares": {"YES": 12.5}},
                {"contractId": "multi1", "answerId": "ans2", "hasYesShares": false,
                 "hasNoShares": true, "totalShares": {"NO": 4.0, "YES": 0.0}}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            holdings_from_metrics(&metrics, Some("ans1")),
            Holdings::new(12.5, 0.0)
        );
        assert_eq!(
            holdings_from_metrics(&metrics, Some("ans2")),
            Holdings::new(0.0, 4.0)
        );
        assert_eq!(holdings_from_metrics(&metrics, None), Holdings::new(12.5, 4.0));
        assert_eq!(holdings_from_metrics(&[], None), Holdings::default());
    }

    #[test]
    fn test_bet_request_body() {
        let request = BetRequest {
            amount: 14,
            outcome: Side::No,
            contract_id: "abc".to_string(),
            answer_id: None,
            limit_prob: round_limit_prob(0.576_3, Side::No),
            expires_at: 1_700_000_060_000,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "amount": 14,
                "outcome": "NO",
                "contractId": "abc",
                "limitProb": 0.57,
                "expiresAt": 1_700_000_060_000_i64
            })
        );
    }

    #[test]
    fn test_round_limit_prob() {
        for (prob, side, expected) in &[
            (0.5, Side::Yes, 0.5),
            (0.5, Side::No, 0.5),
            (0.574, Side::Yes, 0.58),
            (0.574, Side::No, 0.57),
            (0.576_3, Side::No, 0.57),
            (0.121, Side::Yes, 0.13),
            (0.07, Side::Yes, 0.07),
            (0.29, Side::No, 0.29),
            (0.001, Side::No, 0.01),
            (0.999, Side::Yes, 0.99),
        ] {
            let limit = round_limit_prob(*prob, *side);
            assert!((limit - expected).abs() < 1e-12, "{side} {prob}: {limit}");
        }
    }

    #[test]
    fn test_limit_never_short_of_target() {
        for cents in 1..99 {
            for offset in &[0.0, 0.001, 0.004, 0.005, 0.009] {
                let target = f64::from(cents) / 100.0 + offset;
                if target > 0.99 {
                    continue;
                }
                assert!(round_limit_prob(target, Side::Yes) >= target - 1e-12, "YES {target}");
                assert!(round_limit_prob(target, Side::No) <= target + 1e-12, "NO {target}");
            }
        }
    }

    #[test]
    fn test_user_and_bet_response() {
        let user: UserJson =
            serde_json::from_str(r#"{"id": "u1", "username": "JointBot", "balance": 1234.5, "name": "x"}"#)
                .unwrap();
        assert_eq!(user.balance, 1234.5);
        let bet: BetResponse =
            serde_json::from_str(r#"{"betId": "b1", "probAfter": 0.42, "isFilled": true}"#).unwrap();
        assert_eq!(bet.prob_after, Some(0.42));
    }
}
