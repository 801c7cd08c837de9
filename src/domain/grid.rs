//! Grid bucket table mapping a fee value to a discrete layer.

use crate::domain::decimal::{self, Decimal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One half-open fee range `[min, max)` and the multipliers used when it triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBucket {
    pub layer: i32,
    #[serde(deserialize_with = "decimal::lenient")]
    pub min: Decimal,
    /// `None` means unbounded above.
    #[serde(default, deserialize_with = "decimal::lenient_opt")]
    pub max: Option<Decimal>,
    /// Multiplier applied when the layer is reached by an upward (SELL) move.
    pub up: i64,
    /// Multiplier applied when the layer is reached by a downward (BUY) move.
    pub down: i64,
}

impl GridBucket {
    pub fn contains(&self, fee: Decimal) -> bool {
        fee >= self.min && self.max.map_or(true, |max| fee < max)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid table is empty")]
    Empty,
    #[error("bucket for layer {layer} has min >= max")]
    EmptyRange { layer: i32 },
    #[error("bucket for layer {layer} does not start where the previous bucket ends")]
    NotContiguous { layer: i32 },
    #[error("bucket for layer {layer} is unbounded but is not the last bucket")]
    UnboundedNotLast { layer: i32 },
}

/// Ordered, contiguous, non-overlapping bucket table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GridTable {
    buckets: Vec<GridBucket>,
}

impl GridTable {
    /// Validate and build a table from buckets listed in ascending fee order.
    pub fn new(buckets: Vec<GridBucket>) -> Result<Self, GridError> {
        if buckets.is_empty() {
            return Err(GridError::Empty);
        }

        let last = buckets.len() - 1;
        for (i, bucket) in buckets.iter().enumerate() {
            match bucket.max {
                Some(max) if max <= bucket.min => {
                    return Err(GridError::EmptyRange {
                        layer: bucket.layer,
                    })
                }
                None if i != last => {
                    return Err(GridError::UnboundedNotLast {
                        layer: bucket.layer,
                    })
                }
                _ => {}
            }
            if i > 0 && buckets[i - 1].max != Some(bucket.min) {
                return Err(GridError::NotContiguous {
                    layer: bucket.layer,
                });
            }
        }

        Ok(Self { buckets })
    }

    /// Linear scan for the bucket whose `[min, max)` contains `fee`.
    ///
    /// Returns `None` below the first bucket, or above a bounded last bucket.
    pub fn classify(&self, fee: Decimal) -> Option<&GridBucket> {
        self.buckets.iter().find(|bucket| bucket.contains(fee))
    }

    pub fn buckets(&self) -> &[GridBucket] {
        &self.buckets
    }
}

impl<'de> Deserialize<'de> for GridTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let buckets = Vec::<GridBucket>::deserialize(deserializer)?;
        GridTable::new(buckets).map_err(serde::de::Error::custom)
    }
}
