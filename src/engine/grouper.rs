use crate::domain::{Decimal, Leg, MergedTrade, Offset, PerLeg, RawTrade, Side};
use crate::engine::SpreadPricer;
use std::collections::HashMap;
use thiserror::Error;

/// Why a pending trade group could not be merged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupRejection {
    #[error("expected 3 or 6 rows, found {0}")]
    UnexpectedSize(usize),
    #[error("rollover group does not split 3/3 by offset (close {close}, open {open})")]
    UnevenRollover { close: usize, open: usize },
    #[error("leg {0} appears {1} times in a three-row group")]
    LegCount(Leg, usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedGroup {
    pub trade_id: String,
    pub rows: usize,
    pub reason: GroupRejection,
}

#[derive(Debug, Default)]
pub struct GroupingReport {
    /// New merged rows, ready to append with `flag = 0`.
    pub merged: Vec<MergedTrade>,
    pub rejected: Vec<RejectedGroup>,
    /// Raw rows flipped from pending to merged.
    pub consumed_rows: usize,
}

/// Folds per-leg raw trade rows into atomic spread trades.
#[derive(Debug, Clone, Copy, Default)]
pub struct TradeGrouper {
    pricer: SpreadPricer,
}

impl TradeGrouper {
    pub fn new(pricer: SpreadPricer) -> Self {
        Self { pricer }
    }

    /// Merge every pending group in `rows`, clearing the pending flag on consumed rows.
    ///
    /// Rejected groups keep their pending flag for manual inspection.
    pub fn group(&self, rows: &mut [RawTrade]) -> GroupingReport {
        let mut report = GroupingReport::default();

        for (trade_id, members) in pending_groups(rows) {
            match self.merge_group(&trade_id, rows, &members) {
                Ok(merged) => {
                    for &i in &members {
                        rows[i].pending = false;
                    }
                    report.consumed_rows += members.len();
                    report.merged.extend(merged);
                }
                Err(reason) => {
                    tracing::warn!(
                        "Rejected trade group {} ({} rows): {}",
                        trade_id,
                        members.len(),
                        reason
                    );
                    report.rejected.push(RejectedGroup {
                        trade_id,
                        rows: members.len(),
                        reason,
                    });
                }
            }
        }

        report
    }

    fn merge_group(
        &self,
        trade_id: &str,
        rows: &[RawTrade],
        members: &[usize],
    ) -> Result<Vec<MergedTrade>, GroupRejection> {
        match members.len() {
            3 => Ok(vec![self.merge_three(trade_id.to_string(), rows, members)?]),
            6 => {
                let (close, open): (Vec<usize>, Vec<usize>) = members
                    .iter()
                    .partition(|&&i| rows[i].offset == Offset::Close);
                if close.len() != 3 || open.len() != 3 {
                    return Err(GroupRejection::UnevenRollover {
                        close: close.len(),
                        open: open.len(),
                    });
                }
                Ok(vec![
                    self.merge_three(format!("{}_close", trade_id), rows, &close)?,
                    self.merge_three(format!("{}_open", trade_id), rows, &open)?,
                ])
            }
            n => Err(GroupRejection::UnexpectedSize(n)),
        }
    }

    fn merge_three(
        &self,
        trade_id: String,
        rows: &[RawTrade],
        members: &[usize],
    ) -> Result<MergedTrade, GroupRejection> {
        let mut legs = PerLeg::<Option<&RawTrade>>::default();
        for leg in Leg::ALL {
            let matching: Vec<&RawTrade> = members
                .iter()
                .map(|&i| &rows[i])
                .filter(|row| row.leg == leg)
                .collect();
            if matching.len() != 1 {
                return Err(GroupRejection::LegCount(leg, matching.len()));
            }
            legs[leg] = Some(matching[0]);
        }
        let (pr, ta, eg) = match (legs.pr, legs.ta, legs.eg) {
            (Some(pr), Some(ta), Some(eg)) => (pr, ta, eg),
            _ => return Err(GroupRejection::UnexpectedSize(members.len())),
        };

        let timestamp = [pr.timestamp, ta.timestamp, eg.timestamp]
            .into_iter()
            .min()
            .unwrap_or(pr.timestamp);
        let direction = pr.action;
        let fee_target = self
            .pricer
            .spread_value(pr.quote, ta.quote, eg.quote)
            .round_money();
        let fee_actual = self
            .pricer
            .spread_value(pr.price, ta.price, eg.price)
            .round_money();
        let slippage = match direction {
            Side::Sell => fee_target - fee_actual,
            Side::Buy => fee_actual - fee_target,
        }
        .round_money();
        let commission: Decimal = [pr.commission, ta.commission, eg.commission]
            .into_iter()
            .sum::<Decimal>()
            .round_money();

        Ok(MergedTrade {
            trade_id,
            timestamp,
            direction,
            offset: pr.offset,
            fee_target,
            fee_actual,
            slippage,
            commission,
            pr_quote: pr.quote,
            pr_price: pr.price,
            pr_volume: pr.volume,
            ta_quote: ta.quote,
            ta_price: ta.price,
            ta_volume: ta.volume,
            eg_quote: eg.quote,
            eg_price: eg.price,
            eg_volume: eg.volume,
            matched: false,
            pr_left: pr.volume,
            ta_left: ta.volume,
            eg_left: eg.volume,
            profit: Decimal::zero(),
            matched_trade_id: None,
            booked: false,
        })
    }
}

/// Pending rows grouped by trade id, in order of first appearance.
fn pending_groups(rows: &[RawTrade]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate().filter(|(_, row)| row.pending) {
        match index.get(row.trade_id.as_str()) {
            Some(&g) => groups[g].1.push(i),
            None => {
                index.insert(row.trade_id.as_str(), groups.len());
                groups.push((row.trade_id.clone(), vec![i]));
            }
        }
    }
    groups
}
