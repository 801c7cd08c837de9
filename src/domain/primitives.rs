//! Domain primitives: Leg, PerLeg, Side, Offset, Timestamp.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// One of the three instruments that make up the spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    /// The spread's primary leg; its side defines the spread direction.
    Pr,
    /// First hedge leg.
    Ta,
    /// Second hedge leg.
    Eg,
}

impl Leg {
    /// All legs in processing order.
    pub const ALL: [Leg; 3] = [Leg::Pr, Leg::Ta, Leg::Eg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Pr => "pr",
            Leg::Ta => "ta",
            Leg::Eg => "eg",
        }
    }

    /// True for the hedge legs, which sit on the opposite side of the spread direction.
    pub fn is_hedge(&self) -> bool {
        !matches!(self, Leg::Pr)
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per leg, indexable by [`Leg`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerLeg<T> {
    pub pr: T,
    pub ta: T,
    pub eg: T,
}

impl<T> PerLeg<T> {
    pub fn new(pr: T, ta: T, eg: T) -> Self {
        Self { pr, ta, eg }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Leg, &T) -> U) -> PerLeg<U> {
        PerLeg {
            pr: f(Leg::Pr, &self.pr),
            ta: f(Leg::Ta, &self.ta),
            eg: f(Leg::Eg, &self.eg),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Leg, &T)> {
        [(Leg::Pr, &self.pr), (Leg::Ta, &self.ta), (Leg::Eg, &self.eg)].into_iter()
    }
}

impl<T> Index<Leg> for PerLeg<T> {
    type Output = T;

    fn index(&self, leg: Leg) -> &T {
        match leg {
            Leg::Pr => &self.pr,
            Leg::Ta => &self.ta,
            Leg::Eg => &self.eg,
        }
    }
}

impl<T> IndexMut<Leg> for PerLeg<T> {
    fn index_mut(&mut self, leg: Leg) -> &mut T {
        match leg {
            Leg::Pr => &mut self.pr,
            Leg::Ta => &mut self.ta,
            Leg::Eg => &mut self.eg,
        }
    }
}

/// Trade side: Buy or Sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Whether a fill opens new exposure or closes existing exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Offset {
    Open,
    Close,
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Offset::Open => write!(f, "OPEN"),
            Offset::Close => write!(f, "CLOSE"),
        }
    }
}

/// Local wall-clock timestamp with microsecond precision.
///
/// Rows are ordered by this value; equal timestamps keep their log order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub NaiveDateTime);

impl Timestamp {
    pub fn new(at: NaiveDateTime) -> Self {
        Timestamp(at)
    }

    /// Current local time truncated to microseconds.
    pub fn now() -> Self {
        let now = Local::now().naive_local();
        let truncated = now
            .with_nanosecond(now.nanosecond() / 1_000 * 1_000)
            .unwrap_or(now);
        Timestamp(truncated)
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S%.6f"))
    }
}
