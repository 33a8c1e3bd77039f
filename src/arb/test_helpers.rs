use std::collections::HashMap;

use super::planner::LegState;
use super::pool::PoolState;
use super::portfolio::Portfolio;
use super::position::{Holdings, Position};
use super::program::Leg;

#[allow(dead_code)]
pub fn pool(pool_yes: f64, pool_no: f64, p: f64) -> PoolState {
    PoolState::new(pool_yes, pool_no, p).unwrap()
}

#[allow(dead_code)]
pub fn yes(market: &str) -> Position {
    Position::yes(market)
}

#[allow(dead_code)]
pub fn no(market: &str) -> Position {
    Position::no(market)
}

#[allow(dead_code)]
pub fn portfolio(positions: &[Position]) -> Portfolio {
    Portfolio::new(positions.iter().cloned()).unwrap()
}

#[allow(dead_code)]
pub fn with_weights(weights: &[(Position, u32)]) -> Portfolio {
    Portfolio::with_weights(weights.iter().cloned()).unwrap()
}

/// Snapshots with no existing holdings.
#[allow(dead_code)]
pub fn states(pools: &[(Position, PoolState)]) -> HashMap<Position, LegState> {
    pools
        .iter()
        .map(|(position, pool)| {
            (
                position.clone(),
                LegState {
                    pool: *pool,
                    holdings: Holdings::default(),
                },
            )
        })
        .collect()
}

/// A leg with the default caps and no holdings.
#[allow(dead_code)]
pub fn leg(position: Position, weight: u32, pool: PoolState) -> Leg {
    Leg {
        position,
        weight,
        pool,
        spending_cap: 100.0,
        holding_cap: 1000.0,
        holdings: Holdings::default(),
    }
}
