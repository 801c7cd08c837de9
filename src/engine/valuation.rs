use crate::domain::{Decimal, Leg, MarketQuote, PerLeg};
use crate::engine::matcher::LedgerState;
use serde::Serialize;

const MIN_EXPIRE_REST_DAYS: i64 = 40;
const MIN_OPEN_INTEREST: i64 = 10_000;

/// Mark-to-market view of the ledger's open books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Valuation {
    /// Open books marked against last price vs average entry.
    pub float_profit: Decimal,
    /// Open books marked against last price vs session open.
    pub today_float_profit: Decimal,
    pub total_close_profit: Decimal,
    pub total_profit: Decimal,
}

/// Mark the ledger's books to the latest quotes.
pub fn value(state: &LedgerState, quotes: &PerLeg<MarketQuote>) -> Valuation {
    let mut float_profit = Decimal::zero();
    let mut today_float_profit = Decimal::zero();
    for leg in Leg::ALL {
        let book = &state.books[leg];
        let quote = &quotes[leg];
        let long = Decimal::from(book.long);
        let short = Decimal::from(book.short);
        float_profit += (quote.last - book.avg_price) * long + (book.avg_price - quote.last) * short;
        today_float_profit += (quote.last - quote.open) * long + (quote.open - quote.last) * short;
    }
    Valuation {
        float_profit: float_profit.round_money(),
        today_float_profit: today_float_profit.round_money(),
        total_close_profit: state.total_close_profit.round_money(),
        total_profit: (float_profit + state.total_close_profit).round_money(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HealthWarning {
    NearExpiry { days: i64 },
    LowOpenInterest { open_interest: i64, threshold: i64 },
    NearLowerLimit,
    NearUpperLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractHealth {
    pub leg: Leg,
    pub contract: String,
    pub warnings: Vec<HealthWarning>,
}

/// Liquidity and expiry checks for each leg contract.
///
/// The open interest threshold scales with the pr contract's multiplier relative to the leg's.
pub fn health(quotes: &PerLeg<MarketQuote>) -> Vec<ContractHealth> {
    let pr_multiple = quotes.pr.volume_multiple;
    let near = Decimal::from_str_canonical("0.01").unwrap_or_default();

    Leg::ALL
        .iter()
        .map(|&leg| {
            let quote = &quotes[leg];
            let mut warnings = Vec::new();

            if quote.expire_rest_days < MIN_EXPIRE_REST_DAYS {
                warnings.push(HealthWarning::NearExpiry {
                    days: quote.expire_rest_days,
                });
            }

            let threshold = if quote.volume_multiple > 0 {
                (MIN_OPEN_INTEREST * pr_multiple / quote.volume_multiple).min(MIN_OPEN_INTEREST)
            } else {
                MIN_OPEN_INTEREST
            };
            if quote.open_interest < threshold {
                warnings.push(HealthWarning::LowOpenInterest {
                    open_interest: quote.open_interest,
                    threshold,
                });
            }

            if quote.lower_limit.is_positive()
                && (quote.last - quote.lower_limit) / quote.lower_limit < near
            {
                warnings.push(HealthWarning::NearLowerLimit);
            }
            if quote.upper_limit.is_positive()
                && (quote.upper_limit - quote.last) / quote.upper_limit < near
            {
                warnings.push(HealthWarning::NearUpperLimit);
            }

            ContractHealth {
                leg,
                contract: quote.contract.clone(),
                warnings,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::matcher::LegBook;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn quote(contract: &str, last: &str, open: &str, multiple: i64) -> MarketQuote {
        MarketQuote {
            contract: contract.to_string(),
            bid: d(last),
            ask: d(last),
            last: d(last),
            open: d(open),
            upper_limit: d(last) * d("1.1"),
            lower_limit: d(last) * d("0.9"),
            open_interest: 50_000,
            volume_multiple: multiple,
            expire_rest_days: 90,
        }
    }

    #[test]
    fn test_float_profit_marks_both_sides() {
        let state = LedgerState {
            total_close_profit: d("100"),
            books: PerLeg::new(
                LegBook { long: 0, short: 2, avg_price: d("6000") },
                LegBook { long: 5, short: 0, avg_price: d("4800") },
                LegBook::default(),
            ),
            ..Default::default()
        };
        let quotes = PerLeg::new(
            quote("pr", "5990", "6005", 10),
            quote("ta", "4801", "4790", 10),
            quote("eg", "4300", "4300", 10),
        );
        let v = value(&state, &quotes);
        // pr short: (6000-5990)*2 = 20; ta long: (4801-4800)*5 = 5
        assert_eq!(v.float_profit, d("25"));
        // pr: (6005-5990)*2 = 30; ta: (4801-4790)*5 = 55
        assert_eq!(v.today_float_profit, d("85"));
        assert_eq!(v.total_profit, d("125"));
    }

    #[test]
    fn test_health_flags() {
        let mut eg = quote("eg", "100", "100", 5);
        eg.expire_rest_days = 10;
        eg.open_interest = 9_999;
        eg.lower_limit = d("99.5");
        let quotes = PerLeg::new(quote("pr", "6000", "6000", 10), quote("ta", "4800", "4800", 20), eg);

        let report = health(&quotes);
        assert!(report[0].warnings.is_empty());
        // ta threshold: min(10000*10/20, 10000) = 5000
        assert!(report[1].warnings.is_empty());
        assert_eq!(
            report[2].warnings,
            vec![
                HealthWarning::NearExpiry { days: 10 },
                HealthWarning::LowOpenInterest {
                    open_interest: 9_999,
                    threshold: 10_000
                },
                HealthWarning::NearLowerLimit,
            ]
        );
    }
}
