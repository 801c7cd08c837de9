//! Domain types for the spread grid strategy and its trade logs.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: Leg, PerLeg, Side, Offset, Timestamp
//! - Quotes, grid buckets, positions and the three trade log row types
//! - Stable ordering helpers for deterministic ledger processing

pub mod decimal;
pub mod grid;
pub mod ordering;
pub mod position;
pub mod primitives;
pub mod quote;
pub mod trade;

pub use decimal::Decimal;
pub use grid::{GridBucket, GridError, GridTable};
pub use ordering::TradeOrderingKey;
pub use position::{LegPosition, Position, PositionRecord};
pub use primitives::{Leg, Offset, PerLeg, Side, Timestamp};
pub use quote::{LegQuotes, MarketQuote, Quote};
pub use trade::{LegFill, MergedTrade, ProfitLedgerRow, RawTrade};
