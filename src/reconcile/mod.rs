//! Batch reconciliation: raw trade logs to merged trades to the profit ledger.

use crate::domain::RawTrade;
use crate::engine::{PositionPnLMatcher, RejectedGroup, SpreadPricer, TradeGrouper};
use crate::store::{StoreError, StrategyStore};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub trade_files: usize,
    /// Merged trades appended to the merged log.
    pub merged: usize,
    /// Groups skipped because their merged rows already exist.
    pub duplicates: usize,
    pub rejected: Vec<RejectedGroup>,
    pub pairings: usize,
    pub ledger_rows: usize,
}

/// One pass over a strategy directory. Safe to re-run: rows already merged, matched or
/// booked are left alone.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: StrategyStore,
    grouper: TradeGrouper,
}

impl Reconciler {
    pub fn new(store: StrategyStore, pricer: SpreadPricer) -> Self {
        Self {
            store,
            grouper: TradeGrouper::new(pricer),
        }
    }

    pub fn run(&self) -> Result<ReconcileReport, ReconcileError> {
        self.store.ensure_dir()?;
        let mut report = ReconcileReport::default();
        let mut merged = self.store.read_merged()?;
        let mut known: HashSet<String> = merged.iter().map(|m| m.trade_id.clone()).collect();

        let mut touched_files: Vec<(PathBuf, Vec<RawTrade>)> = Vec::new();
        for path in self.store.trade_files()? {
            report.trade_files += 1;
            let mut rows = self.store.read_trades(&path)?;
            let grouping = self.grouper.group(&mut rows);

            for trade in grouping.merged {
                if known.insert(trade.trade_id.clone()) {
                    merged.push(trade);
                    report.merged += 1;
                } else {
                    tracing::warn!("Merged trade {} already recorded, skipping", trade.trade_id);
                    report.duplicates += 1;
                }
            }
            report.rejected.extend(grouping.rejected);
            if grouping.consumed_rows > 0 {
                touched_files.push((path, rows));
            }
        }

        let mut matcher = PositionPnLMatcher::resume(self.store.last_ledger()?.as_ref());
        matcher.process_all(&mut merged);
        report.pairings = matcher.pairings().len();
        let ledger = matcher.into_ledger();
        report.ledger_rows = ledger.len();

        // Merged log before trade logs: pending rows whose ids are already merged are
        // dropped on the next pass.
        self.store.rewrite_merged(&merged)?;
        self.store.append_ledger(&ledger)?;
        for (path, rows) in &touched_files {
            self.store.rewrite_trades(path, rows)?;
        }

        tracing::info!(
            "Reconciled {} trade files: {} merged, {} rejected, {} pairings, {} ledger rows",
            report.trade_files,
            report.merged,
            report.rejected.len(),
            report.pairings,
            report.ledger_rows
        );
        Ok(report)
    }
}
