use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use maniarb::arb::{
    planner::{ArbPlanner, LegState, PlannerConfig},
    pool::PoolState,
    portfolio::Portfolio,
    position::{Holdings, Position},
    quote::PortfolioQuote,
};

/// Random pool between 5% and 95% probability with reserves in `[50, 5050)`.
fn random_pool() -> PoolState {
    let pool_yes = 50.0 + fastrand::f64() * 5_000.0;
    let pool_no = 50.0 + fastrand::f64() * 5_000.0;
    let p = 0.05 + fastrand::f64() * 0.9;
    PoolState::new(pool_yes, pool_no, p).unwrap()
}

/// Random portfolio of `legs` distinct markets with weights 1 to 3, plus a
/// snapshot for every position.
fn generate_portfolio(legs: usize) -> (Portfolio, HashMap<Position, LegState>) {
    let positions: Vec<(Position, u32)> = (0..legs)
        .map(|i| {
            let market = format!("market-{i}-{}", fastrand::u32(..));
            let position = if fastrand::bool() {
                Position::yes(market)
            } else {
                Position::no(market)
            };
            (position, fastrand::u32(1..=3))
        })
        .collect();

    let states = positions
        .iter()
        .map(|(position, _)| {
            let holdings = Holdings::new(fastrand::f64() * 20.0, fastrand::f64() * 20.0);
            (
                position.clone(),
                LegState {
                    pool: random_pool(),
                    holdings,
                },
            )
        })
        .collect();

    (Portfolio::with_weights(positions).unwrap(), states)
}

fn bench_planner(c: &mut Criterion) {
    fastrand::seed(7);
    let planner = ArbPlanner::default();
    let config = PlannerConfig::default();

    let mut group = c.benchmark_group("planner");
    for legs in [2, 4, 8] {
        let cases: Vec<_> = (0..32).map(|_| generate_portfolio(legs)).collect();

        group.bench_with_input(BenchmarkId::new("plan", legs), &cases, |b, cases| {
            b.iter(|| {
                for (portfolio, states) in cases {
                    black_box(planner.plan(portfolio, states).ok());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("plan_and_quote", legs), &cases, |b, cases| {
            b.iter(|| {
                for (portfolio, states) in cases {
                    if let Ok(plan) = planner.plan(portfolio, states) {
                        black_box(PortfolioQuote::new(portfolio, &plan, states, &config).ok());
                    }
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_planner);
criterion_main!(benches);
