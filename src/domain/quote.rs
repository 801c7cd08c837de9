//! Market quote types consumed from the quote source.

use crate::domain::{Decimal, PerLeg, Side};
use serde::{Deserialize, Serialize};

/// Best bid/ask for one leg, sampled at decision time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Quote {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self { bid, ask }
    }

    /// The price a marketable order on `side` trades against.
    pub fn marketable(&self, side: Side) -> Decimal {
        match side {
            Side::Buy => self.ask,
            Side::Sell => self.bid,
        }
    }

    /// A quote is usable once both sides are positive.
    pub fn is_valid(&self) -> bool {
        self.bid.is_positive() && self.ask.is_positive()
    }
}

/// The three live leg quotes the pricer works from.
pub type LegQuotes = PerLeg<Quote>;

/// Full market view of one contract as exposed by the quote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub contract: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    /// Session open price.
    pub open: Decimal,
    pub upper_limit: Decimal,
    pub lower_limit: Decimal,
    pub open_interest: i64,
    pub volume_multiple: i64,
    pub expire_rest_days: i64,
}

impl MarketQuote {
    pub fn top_of_book(&self) -> Quote {
        Quote::new(self.bid, self.ask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_marketable_side() {
        let q = Quote::new(d("100"), d("101"));
        assert_eq!(q.marketable(Side::Buy), d("101"));
        assert_eq!(q.marketable(Side::Sell), d("100"));
    }

    #[test]
    fn test_quote_validity() {
        assert!(Quote::new(d("1"), d("2")).is_valid());
        assert!(!Quote::new(d("0"), d("2")).is_valid());
        assert!(!Quote::default().is_valid());
    }
}
