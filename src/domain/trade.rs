//! Trade log row types: raw per-leg fills, merged spread trades, and ledger rows.

use crate::domain::{Decimal, Leg, LegPosition, Offset, PerLeg, Position, Side, Timestamp};
use serde::{Deserialize, Serialize};

/// Serialize a boolean state column as `0`/`1`.
pub(crate) mod flag_bit {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(serde::de::Error::custom(format!(
                "flag must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

/// One fill segment on one leg, as appended by the order sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTrade {
    /// Shared by every leg of one rebalance.
    pub trade_id: String,
    pub timestamp: Timestamp,
    pub leg: Leg,
    pub contract: String,
    pub action: Side,
    /// Volume-weighted fill price of the segment.
    pub price: Decimal,
    pub volume: i64,
    pub offset: Offset,
    pub commission: Decimal,
    /// Spread fee that triggered the rebalance.
    pub fee: Decimal,
    /// Reference quote the fee was computed from for this leg.
    pub quote: Decimal,
    pub pr_long: i64,
    pub pr_short: i64,
    pub ta_long: i64,
    pub ta_short: i64,
    pub eg_long: i64,
    pub eg_short: i64,
    /// `1` until the grouper has folded the row into a merged trade.
    #[serde(rename = "flag", with = "flag_bit")]
    pub pending: bool,
}

impl RawTrade {
    /// Fill in the position snapshot columns.
    pub fn with_position(mut self, position: &Position) -> Self {
        self.pr_long = position.pr.long;
        self.pr_short = position.pr.short;
        self.ta_long = position.ta.long;
        self.ta_short = position.ta.short;
        self.eg_long = position.eg.long;
        self.eg_short = position.eg.short;
        self
    }

    pub fn position(&self) -> Position {
        PerLeg::new(
            LegPosition::new(self.pr_long, self.pr_short),
            LegPosition::new(self.ta_long, self.ta_short),
            LegPosition::new(self.eg_long, self.eg_short),
        )
    }
}

/// Quote, price and volume of one leg inside a merged trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegFill {
    pub quote: Decimal,
    pub price: Decimal,
    pub volume: i64,
}

/// One atomic three-leg spread trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedTrade {
    pub trade_id: String,
    pub timestamp: Timestamp,
    /// Side of the pr leg; the hedge legs trade the opposite side.
    pub direction: Side,
    pub offset: Offset,
    pub fee_target: Decimal,
    pub fee_actual: Decimal,
    pub slippage: Decimal,
    pub commission: Decimal,
    pub pr_quote: Decimal,
    pub pr_price: Decimal,
    pub pr_volume: i64,
    pub ta_quote: Decimal,
    pub ta_price: Decimal,
    pub ta_volume: i64,
    pub eg_quote: Decimal,
    pub eg_price: Decimal,
    pub eg_volume: i64,
    /// `1` once the row is fully matched and no longer eligible.
    #[serde(rename = "flag", with = "flag_bit")]
    pub matched: bool,
    pub pr_left: i64,
    pub ta_left: i64,
    pub eg_left: i64,
    pub profit: Decimal,
    /// Counterparty trade ids, `;`-separated.
    pub matched_trade_id: Option<String>,
    /// `1` once the row has been applied to the ledger's running books.
    #[serde(with = "flag_bit")]
    pub booked: bool,
}

impl MergedTrade {
    pub fn leg(&self, leg: Leg) -> LegFill {
        match leg {
            Leg::Pr => LegFill {
                quote: self.pr_quote,
                price: self.pr_price,
                volume: self.pr_volume,
            },
            Leg::Ta => LegFill {
                quote: self.ta_quote,
                price: self.ta_price,
                volume: self.ta_volume,
            },
            Leg::Eg => LegFill {
                quote: self.eg_quote,
                price: self.eg_price,
                volume: self.eg_volume,
            },
        }
    }

    pub fn prices(&self) -> PerLeg<Decimal> {
        PerLeg::new(self.pr_price, self.ta_price, self.eg_price)
    }

    pub fn volumes(&self) -> PerLeg<i64> {
        PerLeg::new(self.pr_volume, self.ta_volume, self.eg_volume)
    }

    /// Remaining unmatched volume per leg.
    pub fn left(&self) -> PerLeg<i64> {
        PerLeg::new(self.pr_left, self.ta_left, self.eg_left)
    }

    pub fn set_left(&mut self, left: PerLeg<i64>) {
        self.pr_left = left.pr;
        self.ta_left = left.ta;
        self.eg_left = left.eg;
    }

    /// Append a counterparty id to `matched_trade_id`.
    pub fn note_counterparty(&mut self, trade_id: &str) {
        match self.matched_trade_id.as_mut() {
            Some(ids) if !ids.is_empty() => {
                ids.push(';');
                ids.push_str(trade_id);
            }
            _ => self.matched_trade_id = Some(trade_id.to_string()),
        }
    }

    /// Whether the row may still take part in matching.
    pub fn is_open_lot(&self) -> bool {
        self.offset == Offset::Open && !self.matched
    }
}

/// Running ledger snapshot written once per processed merged trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitLedgerRow {
    pub timestamp: Timestamp,
    pub trade_id: String,
    pub today_close_profit: Decimal,
    pub history_close_profit: Decimal,
    pub total_close_profit: Decimal,
    pub pr_long: i64,
    pub pr_short: i64,
    pub pr_avg_price: Decimal,
    pub ta_long: i64,
    pub ta_short: i64,
    pub ta_avg_price: Decimal,
    pub eg_long: i64,
    pub eg_short: i64,
    pub eg_avg_price: Decimal,
}
