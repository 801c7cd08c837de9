//! Quote source replaying recorded market snapshots from CSV.

use super::{GatewayError, QuoteSource};
use crate::domain::{Decimal, MarketQuote, Timestamp};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// One recorded quote. Consecutive rows sharing a timestamp form one update.
#[derive(Debug, Deserialize)]
struct ReplayRow {
    timestamp: Timestamp,
    contract: String,
    bid: Decimal,
    ask: Decimal,
    last: Decimal,
    open: Decimal,
    upper_limit: Decimal,
    lower_limit: Decimal,
    open_interest: i64,
    volume_multiple: i64,
    expire_rest_days: i64,
}

impl From<ReplayRow> for MarketQuote {
    fn from(row: ReplayRow) -> Self {
        MarketQuote {
            contract: row.contract,
            bid: row.bid,
            ask: row.ask,
            last: row.last,
            open: row.open,
            upper_limit: row.upper_limit,
            lower_limit: row.lower_limit,
            open_interest: row.open_interest,
            volume_multiple: row.volume_multiple,
            expire_rest_days: row.expire_rest_days,
        }
    }
}

#[derive(Debug, Default)]
struct ReplayState {
    frames: VecDeque<Vec<MarketQuote>>,
    book: HashMap<String, MarketQuote>,
}

/// Replays update frames in order; each `wait_update` applies the next frame.
#[derive(Debug, Default)]
pub struct ReplayQuoteSource {
    state: Mutex<ReplayState>,
}

impl ReplayQuoteSource {
    pub fn from_frames(frames: Vec<Vec<MarketQuote>>) -> Self {
        Self {
            state: Mutex::new(ReplayState {
                frames: frames.into(),
                book: HashMap::new(),
            }),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, GatewayError> {
        let file = std::fs::File::open(path)
            .map_err(|e| GatewayError::Connection(format!("{}: {}", path.display(), e)))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, GatewayError> {
        let mut frames: Vec<Vec<MarketQuote>> = Vec::new();
        let mut current: Option<Timestamp> = None;

        let mut csv = csv::Reader::from_reader(reader);
        for record in csv.deserialize::<ReplayRow>() {
            let row = record.map_err(|e| GatewayError::Parse(e.to_string()))?;
            if current != Some(row.timestamp) || frames.is_empty() {
                current = Some(row.timestamp);
                frames.push(Vec::new());
            }
            if let Some(frame) = frames.last_mut() {
                frame.push(row.into());
            }
        }

        tracing::info!("Loaded {} quote updates for replay", frames.len());
        Ok(Self::from_frames(frames))
    }

    /// Updates not yet applied.
    pub fn remaining(&self) -> usize {
        self.lock().frames.len()
    }

    fn lock(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl QuoteSource for ReplayQuoteSource {
    async fn wait_update(&self) -> Result<bool, GatewayError> {
        let mut state = self.lock();
        match state.frames.pop_front() {
            Some(frame) => {
                for quote in frame {
                    state.book.insert(quote.contract.clone(), quote);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn quote(&self, contract: &str) -> Result<MarketQuote, GatewayError> {
        self.lock()
            .book
            .get(contract)
            .cloned()
            .ok_or_else(|| GatewayError::NoQuote(contract.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
timestamp,contract,bid,ask,last,open,upper_limit,lower_limit,open_interest,volume_multiple,expire_rest_days
2025-05-07T09:00:00,pr2509,6000,6002,6001,5990,6500,5500,200000,10,120
2025-05-07T09:00:00,ta2509,4800,4802,4801,4790,5200,4400,300000,5,120
2025-05-07T09:00:01,pr2509,6001,6003,6002,5990,6500,5500,200000,10,120
";

    #[tokio::test]
    async fn test_replay_groups_rows_by_timestamp() {
        let source = ReplayQuoteSource::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(source.remaining(), 2);

        assert!(matches!(source.quote("pr2509").await, Err(GatewayError::NoQuote(_))));

        assert!(source.wait_update().await.unwrap());
        let pr = source.quote("pr2509").await.unwrap();
        assert_eq!(pr.bid, Decimal::from(6000));
        assert_eq!(pr.volume_multiple, 10);
        assert_eq!(source.quote("ta2509").await.unwrap().ask, Decimal::from(4802));

        assert!(source.wait_update().await.unwrap());
        assert_eq!(source.quote("pr2509").await.unwrap().bid, Decimal::from(6001));
        // ta keeps its last quote.
        assert_eq!(source.quote("ta2509").await.unwrap().bid, Decimal::from(4800));

        assert!(!source.wait_update().await.unwrap());
    }

    #[test]
    fn test_malformed_csv_is_a_parse_error() {
        let bad = "timestamp,contract\nnot-a-time,x\n";
        assert!(matches!(
            ReplayQuoteSource::from_reader(bad.as_bytes()),
            Err(GatewayError::Parse(_))
        ));
    }
}
