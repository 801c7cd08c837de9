//! File-backed persistence for one strategy's logs.
//!
//! Layout under `<log_dir>/<strategy_name>/`:
//! - `position.csv`: position snapshots, last row authoritative
//! - `<yymmdd>_trade.csv`: raw per-leg fills, one file per trading day
//! - `merged_data.csv`: merged spread trades
//! - `profit.csv`: append-only profit ledger

use crate::domain::{MergedTrade, PositionRecord, ProfitLedgerRow, RawTrade};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod csv_log;

const POSITION_FILE: &str = "position.csv";
const MERGED_FILE: &str = "merged_data.csv";
const PROFIT_FILE: &str = "profit.csv";
const TRADE_SUFFIX: &str = "_trade.csv";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Paths and typed access to a strategy directory.
#[derive(Debug, Clone)]
pub struct StrategyStore {
    dir: PathBuf,
}

impl StrategyStore {
    pub fn new(log_dir: impl AsRef<Path>, strategy_name: &str) -> Self {
        Self {
            dir: log_dir.as_ref().join(strategy_name),
        }
    }

    /// Create the strategy directory if needed.
    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn position_path(&self) -> PathBuf {
        self.dir.join(POSITION_FILE)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.dir.join(MERGED_FILE)
    }

    pub fn profit_path(&self) -> PathBuf {
        self.dir.join(PROFIT_FILE)
    }

    pub fn trade_path(&self, day: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}{}", day.format("%y%m%d"), TRADE_SUFFIX))
    }

    /// Raw trade files, oldest day first.
    pub fn trade_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.dir, e))?.path();
            let is_trade_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(TRADE_SUFFIX));
            if is_trade_log {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn last_position(&self) -> Result<Option<PositionRecord>, StoreError> {
        csv_log::last_row(&self.position_path())
    }

    pub fn append_position(&self, record: &PositionRecord) -> Result<(), StoreError> {
        csv_log::append_rows(&self.position_path(), std::slice::from_ref(record))
    }

    /// Append a raw trade to the file for its own trading day.
    pub fn append_trade(&self, trade: &RawTrade) -> Result<(), StoreError> {
        let path = self.trade_path(trade.timestamp.as_naive().date());
        csv_log::append_rows(&path, std::slice::from_ref(trade))
    }

    pub fn read_trades(&self, path: &Path) -> Result<Vec<RawTrade>, StoreError> {
        csv_log::read_rows(path)
    }

    pub fn rewrite_trades(&self, path: &Path, trades: &[RawTrade]) -> Result<(), StoreError> {
        csv_log::rewrite_rows(path, trades)
    }

    pub fn read_merged(&self) -> Result<Vec<MergedTrade>, StoreError> {
        csv_log::read_rows(&self.merged_path())
    }

    pub fn rewrite_merged(&self, rows: &[MergedTrade]) -> Result<(), StoreError> {
        csv_log::rewrite_rows(&self.merged_path(), rows)
    }

    pub fn read_ledger(&self) -> Result<Vec<ProfitLedgerRow>, StoreError> {
        csv_log::read_rows(&self.profit_path())
    }

    pub fn last_ledger(&self) -> Result<Option<ProfitLedgerRow>, StoreError> {
        csv_log::last_row(&self.profit_path())
    }

    pub fn append_ledger(&self, rows: &[ProfitLedgerRow]) -> Result<(), StoreError> {
        csv_log::append_rows(&self.profit_path(), rows)
    }
}
