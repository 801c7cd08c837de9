//! Stable trade ordering for deterministic ledger processing.

use crate::domain::{MergedTrade, Timestamp};

/// Stable ordering key for merged trades.
///
/// Ordering: timestamp -> position in the merged log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TradeOrderingKey {
    /// Trade timestamp (primary sort).
    pub timestamp: Timestamp,
    /// Row index in the merged log (tie-break).
    pub seq: usize,
}

impl TradeOrderingKey {
    pub fn new(trade: &MergedTrade, seq: usize) -> Self {
        TradeOrderingKey {
            timestamp: trade.timestamp,
            seq,
        }
    }
}

/// Indices of rows matching `keep`, oldest first.
pub fn oldest_first(rows: &[MergedTrade], keep: impl Fn(&MergedTrade) -> bool) -> Vec<usize> {
    let mut keys: Vec<TradeOrderingKey> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| keep(row))
        .map(|(seq, row)| TradeOrderingKey::new(row, seq))
        .collect();
    keys.sort();
    keys.into_iter().map(|key| key.seq).collect()
}

/// Indices of rows matching `keep`, most recent first.
pub fn newest_first(rows: &[MergedTrade], keep: impl Fn(&MergedTrade) -> bool) -> Vec<usize> {
    let mut seqs = oldest_first(rows, keep);
    seqs.reverse();
    seqs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, Offset, Side};
    use chrono::NaiveDate;

    fn at(second: u32) -> Timestamp {
        Timestamp::new(
            NaiveDate::from_ymd_opt(2025, 5, 7)
                .unwrap()
                .and_hms_opt(9, 0, second)
                .unwrap(),
        )
    }

    fn row(id: &str, second: u32) -> MergedTrade {
        MergedTrade {
            trade_id: id.to_string(),
            timestamp: at(second),
            direction: Side::Buy,
            offset: Offset::Open,
            fee_target: Decimal::zero(),
            fee_actual: Decimal::zero(),
            slippage: Decimal::zero(),
            commission: Decimal::zero(),
            pr_quote: Decimal::zero(),
            pr_price: Decimal::zero(),
            pr_volume: 1,
            ta_quote: Decimal::zero(),
            ta_price: Decimal::zero(),
            ta_volume: 1,
            eg_quote: Decimal::zero(),
            eg_price: Decimal::zero(),
            eg_volume: 1,
            matched: false,
            pr_left: 1,
            ta_left: 1,
            eg_left: 1,
            profit: Decimal::zero(),
            matched_trade_id: None,
            booked: false,
        }
    }

    #[test]
    fn test_oldest_first_sorts_by_time_then_log_order() {
        let rows = vec![row("c", 3), row("a", 1), row("b1", 2), row("b2", 2)];
        let order: Vec<&str> = oldest_first(&rows, |_| true)
            .into_iter()
            .map(|i| rows[i].trade_id.as_str())
            .collect();
        assert_eq!(order, vec!["a", "b1", "b2", "c"]);
    }

    #[test]
    fn test_newest_first_with_filter() {
        let mut rows = vec![row("a", 1), row("b", 2), row("c", 3)];
        rows[2].matched = true;
        let order: Vec<&str> = newest_first(&rows, |r| !r.matched)
            .into_iter()
            .map(|i| rows[i].trade_id.as_str())
            .collect();
        assert_eq!(order, vec!["b", "a"]);
    }
}
