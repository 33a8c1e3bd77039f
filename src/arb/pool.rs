/// A `PoolState` is the reserve snapshot of one binary market (or one answer of a
/// multi-answer market) priced by a weighted constant-product market maker.
/// It is an immutable value: a buy returns a new state, it never mutates in place.
use std::fmt::{self, Display};

use super::error::ModelError;
use super::position::Side;

/// Upper bound on bisection steps when inverting `shares_received`.
/// Each step halves the bracket, so f64 precision is reached long before this.
const MAX_INVERSION_STEPS: usize = 200;

/// Relative width at which the inversion bracket is considered converged.
const INVERSION_TOLERANCE: f64 = 1e-12;

/// Implied YES probability of a weighted constant-product pool.
///
/// # Arguments
///
/// * `pool_yes` - Size of the YES pool
/// * `pool_no` - Size of the NO pool
/// * `p` - AMM weight of the YES pool
#[must_use]
pub fn prob_from_pool(pool_yes: f64, pool_no: f64, p: f64) -> f64 {
    pool_no * p / (pool_yes * (1.0 - p) + pool_no * p)
}

/// Reserve snapshot of a weighted constant-product market maker.
///
/// The pools satisfy `pool_yes^p * pool_no^(1-p) = invariant` across every trade
/// that does not add external liquidity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolState {
    /// Shares held by the YES pool
    pool_yes: f64,
    /// Shares held by the NO pool
    pool_no: f64,
    /// Weight of the YES pool in the invariant
    p: f64,
}

impl Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PoolState(yes={:.4}, no={:.4}, p={:.4}, prob={:.4})",
            self.pool_yes,
            self.pool_no,
            self.p,
            self.prob()
        )
    }
}

impl PoolState {
    /// Creates a validated pool snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if either pool is not strictly positive and finite,
    /// or if `p` is outside `(0, 1)`.
    pub fn new(pool_yes: f64, pool_no: f64, p: f64) -> Result<Self, ModelError> {
        if !(p > 0.0 && p < 1.0) {
            return Err(ModelError::InvalidWeight(p));
        }
        if !is_valid_pool(pool_yes, pool_no) {
            return Err(ModelError::NonPositivePool { pool_yes, pool_no });
        }
        Ok(Self {
            pool_yes,
            pool_no,
            p,
        })
    }

    /// Size of the YES pool.
    #[must_use]
    pub const fn pool_yes(&self) -> f64 {
        self.pool_yes
    }

    /// Size of the NO pool.
    #[must_use]
    pub const fn pool_no(&self) -> f64 {
        self.pool_no
    }

    /// AMM weight of the YES pool.
    #[must_use]
    pub const fn p(&self) -> f64 {
        self.p
    }

    /// Size of the pool holding shares of `side`.
    #[must_use]
    pub const fn pool(&self, side: Side) -> f64 {
        match side {
            Side::Yes => self.pool_yes,
            Side::No => self.pool_no,
        }
    }

    /// The conserved quantity `pool_yes^p * pool_no^(1-p)`.
    #[must_use]
    pub fn invariant(&self) -> f64 {
        self.pool_yes.powf(self.p) * self.pool_no.powf(1.0 - self.p)
    }

    /// Implied probability of YES.
    #[must_use]
    pub fn prob(&self) -> f64 {
        prob_from_pool(self.pool_yes, self.pool_no, self.p)
    }

    /// Marginal price of one share of `side`.
    ///
    /// This is also the reciprocal of the derivative of `shares_received` at
    /// the current state, which the solver uses as the gradient of spend.
    #[must_use]
    pub fn price(&self, side: Side) -> f64 {
        match side {
            Side::Yes => self.prob(),
            Side::No => 1.0 - self.prob(),
        }
    }

    /// Simulates spending `amount` to buy `side` shares.
    ///
    /// The capital goes into the opposing pool and the purchased pool is
    /// re-solved so that the invariant is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if `amount` is negative or not finite, or if the
    /// resulting pools are not strictly positive.
    pub fn buy(&self, amount: f64, side: Side) -> Result<Self, ModelError> {
        check_amount(amount)?;
        #[allow(clippy::float_cmp)]
        if amount == 0.0 {
            return Ok(*self);
        }

        let invariant = self.invariant();
        let (pool_yes, pool_no) = match side {
            Side::Yes => {
                let pool_no = self.pool_no + amount;
                let pool_yes = (invariant / pool_no.powf(1.0 - self.p)).powf(1.0 / self.p);
                (pool_yes, pool_no)
            }
            Side::No => {
                let pool_yes = self.pool_yes + amount;
                let pool_no = (invariant / pool_yes.powf(self.p)).powf(1.0 / (1.0 - self.p));
                (pool_yes, pool_no)
            }
        };

        if !is_valid_pool(pool_yes, pool_no) {
            return Err(ModelError::Liquidity {
                amount,
                side,
                pool_yes,
                pool_no,
            });
        }

        Ok(Self {
            pool_yes,
            pool_no,
            p: self.p,
        })
    }

    /// Shares minted to a buyer spending `amount` on `side`: the capital spent
    /// plus the decrease of the purchased pool.
    ///
    /// # Errors
    ///
    /// Same conditions as [`PoolState::buy`].
    pub fn shares_received(&self, amount: f64, side: Side) -> Result<f64, ModelError> {
        let after = self.buy(amount, side)?;
        Ok(self.pool(side) - after.pool(side) + amount)
    }

    /// Smallest spend on `side` that yields at least `shares` shares.
    ///
    /// A buy always returns at least as many shares as capital spent, so the
    /// answer lies in `[0, shares]` and is found by bisection.
    ///
    /// # Errors
    ///
    /// Returns an error if `shares` is not finite or a trial buy fails.
    pub fn amount_for_shares(&self, shares: f64, side: Side) -> Result<f64, ModelError> {
        if !shares.is_finite() {
            return Err(ModelError::NonFiniteAmount(shares));
        }
        if shares <= 0.0 {
            return Ok(0.0);
        }

        let mut low = 0.0;
        let mut high = shares;
        for _ in 0..MAX_INVERSION_STEPS {
            if high - low <= INVERSION_TOLERANCE * high.max(1.0) {
                break;
            }
            let mid = 0.5 * (low + high);
            if self.shares_received(mid, side)? < shares {
                low = mid;
            } else {
                high = mid;
            }
        }
        Ok(high)
    }
}

/// Rejects negative and non-finite spends.
fn check_amount(amount: f64) -> Result<(), ModelError> {
    if !amount.is_finite() {
        return Err(ModelError::NonFiniteAmount(amount));
    }
    if amount < 0.0 {
        return Err(ModelError::NegativeAmount(amount));
    }
    Ok(())
}

/// Both pools strictly positive and finite.
fn is_valid_pool(pool_yes: f64, pool_no: f64) -> bool {
    pool_yes.is_finite() && pool_no.is_finite() && pool_yes > 0.0 && pool_no > 0.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::*;

    #[test]
    fn test_new_rejects_bad_snapshots() {
        assert_eq!(
            PoolState::new(100.0, 100.0, 1.0).err(),
            Some(ModelError::InvalidWeight(1.0))
        );
        assert_eq!(
            PoolState::new(0.0, 100.0, 0.5).err(),
            Some(ModelError::NonPositivePool {
                pool_yes: 0.0,
                pool_no: 100.0
            })
        );
        assert!(PoolState::new(100.0, f64::NAN, 0.5).is_err());
        assert!(PoolState::new(100.0, 100.0, f64::NAN).is_err());
    }

    #[test]
    fn test_prob() {
        for (pool_yes, pool_no, p, expected) in &[
            // yes,  no,    p,    prob
            (100.0, 100.0, 0.5, 0.5),
            (60.0, 40.0, 0.5, 0.4),
            (30.0, 70.0, 0.5, 0.7),
            (100.0, 100.0, 0.45, 0.45),
            (100.0, 300.0, 0.25, 0.5),
        ] {
            let state = pool(*pool_yes, *pool_no, *p);
            assert!((state.prob() - expected).abs() < 1e-12, "{state}");
            assert!((state.price(Side::No) - (1.0 - expected)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invariant_conserved() {
        for (pool_yes, pool_no, p) in &[
            (100.0, 100.0, 0.5),
            (60.0, 40.0, 0.5),
            (437.8, 793.1, 0.506),
            (1_000.0, 50.0, 0.2),
            (50.0, 1_000.0, 0.8),
        ] {
            let state = pool(*pool_yes, *pool_no, *p);
            for amount in [0.0, 0.5, 1.0, 10.0, 75.0, 400.0] {
                for side in [Side::Yes, Side::No] {
                    let after = state.buy(amount, side).unwrap();
                    let drift = (after.invariant() - state.invariant()).abs() / state.invariant();
                    assert!(drift < 1e-9, "{state} buy {amount} {side} drift {drift}");
                }
            }
        }
    }

    #[test]
    fn test_zero_amount_is_fixed_point() {
        let state = pool(437.8, 793.1, 0.506);
        for side in [Side::Yes, Side::No] {
            assert_eq!(state.buy(0.0, side).unwrap(), state);
            assert_eq!(state.shares_received(0.0, side).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_negative_amount_rejected() {
        let state = pool(100.0, 100.0, 0.5);
        assert_eq!(
            state.buy(-1.0, Side::Yes).err(),
            Some(ModelError::NegativeAmount(-1.0))
        );
        assert!(state.shares_received(f64::INFINITY, Side::No).is_err());
    }

    #[test]
    fn test_buy_moves_opposing_pool() {
        let state = pool(60.0, 40.0, 0.5);
        let after = state.buy(20.0, Side::Yes).unwrap();
        assert!((after.pool_no() - 60.0).abs() < 1e-12);
        // 60 * 40 = 2400 = yes' * 60
        assert!((after.pool_yes() - 40.0).abs() < 1e-9);
        assert!((state.shares_received(20.0, Side::Yes).unwrap() - 40.0).abs() < 1e-9);

        let after = state.buy(20.0, Side::No).unwrap();
        assert!((after.pool_yes() - 80.0).abs() < 1e-12);
        assert!((after.pool_no() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_monotonicity() {
        for (pool_yes, pool_no, p) in &[(100.0, 100.0, 0.5), (60.0, 40.0, 0.3), (10.0, 900.0, 0.7)] {
            let state = pool(*pool_yes, *pool_no, *p);
            for side in [Side::Yes, Side::No] {
                let mut last_shares = 0.0;
                let mut last_prob = state.prob();
                for amount in [1.0, 2.0, 5.0, 10.0, 50.0, 200.0] {
                    let shares = state.shares_received(amount, side).unwrap();
                    let prob = state.buy(amount, side).unwrap().prob();
                    assert!(shares > last_shares, "{side} {amount}");
                    match side {
                        Side::Yes => assert!(prob > last_prob),
                        Side::No => assert!(prob < last_prob),
                    }
                    last_shares = shares;
                    last_prob = prob;
                }
            }
        }
    }

    #[test]
    fn test_shares_at_least_spend() {
        let state = pool(30.0, 70.0, 0.5);
        for amount in [0.1, 1.0, 11.0, 100.0] {
            for side in [Side::Yes, Side::No] {
                assert!(state.shares_received(amount, side).unwrap() >= amount);
            }
        }
    }

    #[test]
    fn test_amount_for_shares_inverts() {
        let state = pool(437.8, 793.1, 0.506);
        for side in [Side::Yes, Side::No] {
            for amount in [0.25, 3.0, 14.0, 120.0] {
                let shares = state.shares_received(amount, side).unwrap();
                let recovered = state.amount_for_shares(shares, side).unwrap();
                assert!((recovered - amount).abs() < 1e-8, "{side} {amount} {recovered}");
            }
            assert_eq!(state.amount_for_shares(0.0, side).unwrap(), 0.0);
            assert_eq!(state.amount_for_shares(-3.0, side).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_marginal_price_matches_slope() {
        let state = pool(60.0, 40.0, 0.4);
        let delta = 1e-6;
        for side in [Side::Yes, Side::No] {
            let slope = state.shares_received(delta, side).unwrap() / delta;
            assert!((slope * state.price(side) - 1.0).abs() < 1e-4);
        }
    }
}
