//! Curated market groupings and the portfolios they imply.
//!
//! The listing file is JSON:
//!
//! ```json
//! {
//!   "fungible": [[{"market": "btc-60k"}, {"market": "btc-60k-2024"}]],
//!   "ascending": [[{"market": "btc-50k"}], [{"market": "btc-60k"}]],
//!   "complementary": [[{"market": "trump-nominee"},
//!                      {"market": "who-nominated", "answer": "Only Biden"}]]
//! }
//! ```
//!
//! - `fungible` groups resolve identically, so every ordered pair `(a, b)`
//!   gives the portfolio `{a, ~b}`.
//! - `ascending` is a chain where each group implies the one before it, so
//!   every `a` in group `k` and `b` in group `k + 1` gives `{a, ~b}`. Each
//!   ascending group is also fungible and expands like a `fungible` group.
//! - `complementary` lists explicit portfolios, each entry with an optional
//!   `weight` (default 1).

use std::path::Path;

use eyre::{Result, WrapErr};
use itertools::{iproduct, Itertools};
use serde::{Deserialize, Serialize};

use crate::arb::error::PortfolioError;
use crate::arb::portfolio::Portfolio;
use crate::arb::position::Position;

/// Default weight of a listed position.
const fn one() -> u32 {
    1
}

/// A position with its portfolio weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedPosition {
    /// The listed position
    #[serde(flatten)]
    pub position: Position,
    /// Weight inside a complementary portfolio; ignored in groups
    #[serde(default = "one")]
    pub weight: u32,
}

/// Curated groupings of logically linked markets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Groups of positions that resolve identically
    #[serde(default)]
    pub fungible: Vec<Vec<WeightedPosition>>,
    /// Chain of groups where group `k + 1` implies group `k`
    #[serde(default)]
    pub ascending: Vec<Vec<WeightedPosition>>,
    /// Explicit portfolios worth at least one unit
    #[serde(default)]
    pub complementary: Vec<Vec<WeightedPosition>>,
}

impl Listing {
    /// Reads a listing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid listing.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading listing {}", path.display()))?;
        serde_json::from_str(&raw).wrap_err_with(|| format!("parsing listing {}", path.display()))
    }

    /// Expands the groupings into distinct portfolios.
    ///
    /// # Errors
    ///
    /// Returns an error if a generated or listed portfolio holds a position
    /// together with its complement, or has no positions.
    pub fn portfolios(&self) -> Result<Vec<Portfolio>, PortfolioError> {
        let fungible = self.fungible.iter().chain(&self.ascending).flat_map(|group| {
            group
                .iter()
                .map(|entry| &entry.position)
                .permutations(2)
                .filter(|pair| pair[0] != pair[1])
                .map(|pair| vec![(pair[0].clone(), 1), (pair[1].complement(), 1)])
        });

        let ascending = self
            .ascending
            .iter()
            .tuple_windows()
            .flat_map(|(lower, higher)| {
                iproduct!(lower, higher)
                    .map(|(a, b)| vec![(a.position.clone(), 1), (b.position.complement(), 1)])
                    .collect::<Vec<_>>()
            });

        let complementary = self.complementary.iter().map(|entries| {
            entries
                .iter()
                .map(|entry| (entry.position.clone(), entry.weight))
                .collect::<Vec<_>>()
        });

        let portfolios = ascending
            .chain(fungible)
            .chain(complementary)
            .map(Portfolio::with_weights)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(portfolios.into_iter().unique().collect())
    }
}
