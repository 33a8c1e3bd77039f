use std::fmt::{self, Display};
use std::ops::Not;

use derive_more::Display as DeriveDisplay;
use serde::{Deserialize, Serialize};

/// Reference to a market on the venue (its slug).
pub type MarketRef = String;

/// Reference to one answer of a multi-answer market (its text).
pub type AnswerRef = String;

/// One of the two outcomes of a binary market or answer.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    DeriveDisplay,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// The event happens
    #[default]
    #[display("YES")]
    Yes,
    /// The event does not happen
    #[display("NO")]
    No,
}

impl Side {
    /// The opposite outcome.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }
}

impl Not for Side {
    type Output = Self;

    fn not(self) -> Self {
        self.flip()
    }
}

/// A tradeable unit: one side of one market, or of one answer of a multi-answer market.
///
/// Being long a side is the same as being short its complement, so a position
/// and its complement must never be distinct keys of the same portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Market the position trades in
    pub market: MarketRef,
    /// Answer within a multi-answer market, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerRef>,
    /// Outcome held
    #[serde(default)]
    pub side: Side,
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.answer {
            Some(answer) => write!(f, "{} [{}] ({})", self.market, answer, self.side),
            None => write!(f, "{} ({})", self.market, self.side),
        }
    }
}

impl Position {
    /// Creates a position on a market or market answer.
    pub fn new(market: impl Into<MarketRef>, answer: Option<AnswerRef>, side: Side) -> Self {
        Self {
            market: market.into(),
            answer,
            side,
        }
    }

    /// YES on a binary market.
    pub fn yes(market: impl Into<MarketRef>) -> Self {
        Self::new(market, None, Side::Yes)
    }

    /// NO on a binary market.
    pub fn no(market: impl Into<MarketRef>) -> Self {
        Self::new(market, None, Side::No)
    }

    /// A side of one answer of a multi-answer market.
    pub fn answer(market: impl Into<MarketRef>, answer: impl Into<AnswerRef>, side: Side) -> Self {
        Self::new(market, Some(answer.into()), side)
    }

    /// The same market and answer with the side flipped.
    #[must_use]
    pub fn complement(&self) -> Self {
        Self {
            market: self.market.clone(),
            answer: self.answer.clone(),
            side: self.side.flip(),
        }
    }

    /// Whether `other` is the complement of this position.
    #[must_use]
    pub fn is_complement_of(&self, other: &Self) -> bool {
        self.same_outcome_space(other) && self.side != other.side
    }

    /// Whether both positions trade on the same market and answer.
    #[must_use]
    pub fn same_outcome_space(&self, other: &Self) -> bool {
        self.market == other.market && self.answer == other.answer
    }

    /// The YES-side position of the same market and answer.
    #[must_use]
    pub fn canonical(&self) -> Self {
        match self.side {
            Side::Yes => self.clone(),
            Side::No => self.complement(),
        }
    }
}

impl Not for &Position {
    type Output = Position;

    fn not(self) -> Position {
        self.complement()
    }
}

impl Not for Position {
    type Output = Self;

    fn not(self) -> Self {
        Self {
            side: self.side.flip(),
            ..self
        }
    }
}

/// Shares the account already owns in one market or answer.
///
/// Snapshotted at plan time; the venue stays the source of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Holdings {
    /// YES shares owned
    pub yes_shares: f64,
    /// NO shares owned
    pub no_shares: f64,
}

impl Holdings {
    /// Creates a holdings snapshot.
    #[must_use]
    pub const fn new(yes_shares: f64, no_shares: f64) -> Self {
        Self {
            yes_shares,
            no_shares,
        }
    }

    /// Shares owned of `side`.
    #[must_use]
    pub const fn of(&self, side: Side) -> f64 {
        match side {
            Side::Yes => self.yes_shares,
            Side::No => self.no_shares,
        }
    }

    /// Shares owned of the side opposite to `side`.
    #[must_use]
    pub const fn opposite(&self, side: Side) -> f64 {
        self.of(side.flip())
    }
}
