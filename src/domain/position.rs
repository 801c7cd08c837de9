//! Strategy position per leg and its persisted row form.

use crate::domain::{PerLeg, Side, Timestamp};
use serde::{Deserialize, Serialize};

/// Long and short lots held on one leg. Both sides are tracked independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegPosition {
    pub long: i64,
    pub short: i64,
}

impl LegPosition {
    pub fn new(long: i64, short: i64) -> Self {
        Self { long, short }
    }

    /// Net position: positive = long, negative = short.
    pub fn net(&self) -> i64 {
        self.long - self.short
    }

    /// Lots an order on `side` would close before opening anything.
    pub fn opposing(&self, side: Side) -> i64 {
        match side {
            Side::Buy => self.short,
            Side::Sell => self.long,
        }
    }

    /// Apply a confirmed CLOSE fill of `volume` lots traded on `side`.
    pub fn apply_close(&mut self, side: Side, volume: i64) {
        match side {
            Side::Buy => self.short -= volume,
            Side::Sell => self.long -= volume,
        }
    }

    /// Apply a confirmed OPEN fill of `volume` lots traded on `side`.
    pub fn apply_open(&mut self, side: Side, volume: i64) {
        match side {
            Side::Buy => self.long += volume,
            Side::Sell => self.short += volume,
        }
    }
}

pub type Position = PerLeg<LegPosition>;

impl Position {
    pub fn net(&self) -> PerLeg<i64> {
        self.map(|_, p| p.net())
    }
}

/// One row of the position log. The last row is the authoritative state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub timestamp: Timestamp,
    pub pr_long: i64,
    pub pr_short: i64,
    pub ta_long: i64,
    pub ta_short: i64,
    pub eg_long: i64,
    pub eg_short: i64,
    pub layer: i32,
}

impl PositionRecord {
    pub fn new(timestamp: Timestamp, position: &Position, layer: i32) -> Self {
        Self {
            timestamp,
            pr_long: position.pr.long,
            pr_short: position.pr.short,
            ta_long: position.ta.long,
            ta_short: position.ta.short,
            eg_long: position.eg.long,
            eg_short: position.eg.short,
            layer,
        }
    }

    pub fn position(&self) -> Position {
        PerLeg::new(
            LegPosition::new(self.pr_long, self.pr_short),
            LegPosition::new(self.ta_long, self.ta_short),
            LegPosition::new(self.eg_long, self.eg_short),
        )
    }
}
