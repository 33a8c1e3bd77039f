use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};
use std::ops::{Add, Mul, Neg, Sub};

use super::error::PortfolioError;
use super::position::{AnswerRef, MarketRef, Position, Side};

/// Outcome space of a position: the market and optional answer, without the side.
type OutcomeKey = (MarketRef, Option<AnswerRef>);

/// A weighted basket of positions that resolves to at least one unit of value.
///
/// Owning `N` copies of the portfolio means holding `N * weight` shares of each
/// position. No position may appear together with its complement.
///
/// The arithmetic operators work on the weight mapping with a position and its
/// complement cancelling each other (a complete YES/NO set is riskless cash), so
/// negation is the same as [`Portfolio::complement`]. Sums, differences and
/// products fail with [`PortfolioError::WeightOverflow`] when a weight leaves
/// the `u32` range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Portfolio {
    /// Map of positions to their strictly positive weights
    weights: BTreeMap<Position, u32>,
}

impl Display for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let legs = self
            .weights
            .iter()
            .map(|(position, weight)| format!("{weight}x {position}"))
            .collect::<Vec<_>>()
            .join(" + ");
        write!(f, "Portfolio({legs})")
    }
}

impl Portfolio {
    /// Creates a portfolio where each listed position has weight one.
    /// Repeated positions accumulate weight.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or holds a position and its complement.
    pub fn new(positions: impl IntoIterator<Item = Position>) -> Result<Self, PortfolioError> {
        Self::with_weights(positions.into_iter().map(|position| (position, 1)))
    }

    /// Creates a portfolio from explicit weights. Repeated positions accumulate weight.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, a weight is zero or overflows,
    /// or a position and its complement are both present.
    pub fn with_weights(
        weights: impl IntoIterator<Item = (Position, u32)>,
    ) -> Result<Self, PortfolioError> {
        let mut map: BTreeMap<Position, u32> = BTreeMap::new();
        for (position, weight) in weights {
            if weight == 0 {
                return Err(PortfolioError::ZeroWeight(position));
            }
            let entry = map.entry(position.clone()).or_insert(0);
            *entry = entry
                .checked_add(weight)
                .ok_or(PortfolioError::WeightOverflow(position))?;
        }

        if map.is_empty() {
            return Err(PortfolioError::Empty);
        }

        if let Some(position) = map.keys().find(|p| map.contains_key(&p.complement())) {
            return Err(PortfolioError::ComplementPresent(position.clone()));
        }

        Ok(Self { weights: map })
    }

    /// Weight of `position`, if it is part of the portfolio.
    #[must_use]
    pub fn weight(&self, position: &Position) -> Option<u32> {
        self.weights.get(position).copied()
    }

    /// Positions with their weights, in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&Position, u32)> {
        self.weights.iter().map(|(position, weight)| (position, *weight))
    }

    /// Positions in a stable order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.weights.keys()
    }

    /// Number of distinct positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the portfolio has no positions. Only arithmetic can produce this.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Markets touched by any position.
    #[must_use]
    pub fn markets(&self) -> BTreeSet<&str> {
        self.weights.keys().map(|p| p.market.as_str()).collect()
    }

    /// Every position replaced by its complement, same weights.
    #[must_use]
    pub fn complement(&self) -> Self {
        Self {
            weights: self
                .weights
                .iter()
                .map(|(position, weight)| (position.complement(), *weight))
                .collect(),
        }
    }

    /// Signed weights keyed by outcome space: YES positive, NO negative.
    fn signed(&self) -> BTreeMap<OutcomeKey, i64> {
        let mut signed = BTreeMap::new();
        for (position, weight) in &self.weights {
            let weight = i64::from(*weight);
            let value = match position.side {
                Side::Yes => weight,
                Side::No => -weight,
            };
            *signed
                .entry((position.market.clone(), position.answer.clone()))
                .or_insert(0) += value;
        }
        signed
    }

    /// Rebuilds a portfolio from signed weights, dropping cancelled outcomes.
    fn from_signed(signed: BTreeMap<OutcomeKey, i64>) -> Result<Self, PortfolioError> {
        let weights = signed
            .into_iter()
            .filter(|(_, weight)| *weight != 0)
            .map(|((market, answer), weight)| {
                let side = if weight > 0 { Side::Yes } else { Side::No };
                let position = Position::new(market, answer, side);
                match u32::try_from(weight.unsigned_abs()) {
                    Ok(weight) => Ok((position, weight)),
                    Err(_) => Err(PortfolioError::WeightOverflow(position)),
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { weights })
    }
}

impl Add for &Portfolio {
    type Output = Result<Portfolio, PortfolioError>;

    fn add(self, other: &Portfolio) -> Self::Output {
        let mut signed = self.signed();
        for (key, weight) in other.signed() {
            *signed.entry(key).or_insert(0) += weight;
        }
        Portfolio::from_signed(signed)
    }
}

impl Add for Portfolio {
    type Output = Result<Self, PortfolioError>;

    fn add(self, other: Self) -> Self::Output {
        &self + &other
    }
}

impl Neg for &Portfolio {
    type Output = Portfolio;

    fn neg(self) -> Portfolio {
        self.complement()
    }
}

impl Neg for Portfolio {
    type Output = Self;

    fn neg(self) -> Self {
        self.complement()
    }
}

impl Sub for &Portfolio {
    type Output = Result<Portfolio, PortfolioError>;

    fn sub(self, other: &Portfolio) -> Self::Output {
        self + &other.complement()
    }
}

impl Sub for Portfolio {
    type Output = Result<Self, PortfolioError>;

    fn sub(self, other: Self) -> Self::Output {
        &self - &other
    }
}

impl Mul<u32> for &Portfolio {
    type Output = Result<Portfolio, PortfolioError>;

    fn mul(self, factor: u32) -> Self::Output {
        Portfolio::from_signed(
            self.signed()
                .into_iter()
                .map(|(key, weight)| (key, weight.saturating_mul(i64::from(factor))))
                .collect(),
        )
    }
}

impl Mul<u32> for Portfolio {
    type Output = Result<Self, PortfolioError>;

    fn mul(self, factor: u32) -> Self::Output {
        &self * factor
    }
}
