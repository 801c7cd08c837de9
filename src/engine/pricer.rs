use crate::domain::decimal::{self, Decimal};
use crate::domain::{LegQuotes, Quote, Side};
use serde::{Deserialize, Serialize};

/// Fixed hedge ratios applied to the ta and eg legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HedgeRatios {
    #[serde(deserialize_with = "decimal::lenient")]
    pub ta: Decimal,
    #[serde(deserialize_with = "decimal::lenient")]
    pub eg: Decimal,
}

impl Default for HedgeRatios {
    fn default() -> Self {
        Self {
            ta: Decimal::from_str_canonical("0.857").unwrap_or_default(),
            eg: Decimal::from_str_canonical("0.335").unwrap_or_default(),
        }
    }
}

/// Computes the synthetic spread value ("processing fee") from live leg quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadPricer {
    ratios: HedgeRatios,
}

impl SpreadPricer {
    pub fn new(ratios: HedgeRatios) -> Self {
        Self { ratios }
    }

    pub fn ratios(&self) -> HedgeRatios {
        self.ratios
    }

    /// Fee evaluated for a spread trade on `side`.
    ///
    /// SELL: `pr.bid - k_ta*ta.ask - k_eg*eg.ask`.
    /// BUY: `pr.ask - k_ta*ta.bid - k_eg*eg.bid`.
    pub fn fee(&self, quotes: &LegQuotes, side: Side) -> Decimal {
        let pr = quotes.pr.marketable(side);
        let hedge = side.opposite();
        self.spread_value(pr, quotes.ta.marketable(hedge), quotes.eg.marketable(hedge))
    }

    /// `pr - k_ta*ta - k_eg*eg` for arbitrary leg prices.
    pub fn spread_value(&self, pr: Decimal, ta: Decimal, eg: Decimal) -> Decimal {
        pr - self.ratios.ta * ta - self.ratios.eg * eg
    }

    /// Quote recorded against a fill traded on `action`: the same quote the fee used.
    pub fn reference_quote(quote: &Quote, action: Side) -> Decimal {
        quote.marketable(action)
    }
}
