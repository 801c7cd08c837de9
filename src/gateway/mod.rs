//! Collaborator seams: live quotes and order execution.
//!
//! The strategy only talks to these traits. `PaperGateway` and `ReplayQuoteSource` are the
//! in-process implementations used by the `run` command and the tests.

use crate::domain::{Decimal, MarketQuote, Offset, Side};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod paper;
pub mod replay;

pub use paper::{FillMode, PaperGateway};
pub use replay::ReplayQuoteSource;

/// Exchange-assigned order identifier.
pub type OrderId = String;

/// Source of market quotes for the strategy's contracts.
#[async_trait]
pub trait QuoteSource: Send + Sync + fmt::Debug {
    /// Block until the next market update.
    ///
    /// # Returns
    /// `false` once the source is exhausted and no further updates will arrive.
    async fn wait_update(&self) -> Result<bool, GatewayError>;

    /// Latest quote for `contract`.
    async fn quote(&self, contract: &str) -> Result<MarketQuote, GatewayError>;
}

/// Order entry and account queries.
///
/// Orders are non-blocking: `place_order` returns immediately and the caller polls.
#[async_trait]
pub trait TradingGateway: Send + Sync + fmt::Debug {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderId, GatewayError>;

    async fn poll_order(&self, order_id: &str) -> Result<OrderUpdate, GatewayError>;

    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError>;

    /// Commission charged on the account since the session started.
    async fn cumulative_commission(&self) -> Result<Decimal, GatewayError>;
}

/// A single-leg order as sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub contract: String,
    pub side: Side,
    pub offset: Offset,
    pub volume: i64,
}

/// Exchange-side order status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeStatus {
    /// Working on the book.
    Alive,
    /// No longer working: fully filled or cancelled.
    Finished,
    Rejected { reason: String },
}

/// One execution against an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillSegment {
    pub price: Decimal,
    pub volume: i64,
}

/// Order state as reported by a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub status: ExchangeStatus,
    pub volume: i64,
    /// Every execution so far, oldest first.
    pub fills: Vec<FillSegment>,
}

impl OrderUpdate {
    pub fn filled(&self) -> i64 {
        self.fills.iter().map(|f| f.volume).sum()
    }

    /// Volume-weighted price of all fills, `None` if nothing traded.
    pub fn average_price(&self) -> Option<Decimal> {
        let filled = self.filled();
        if filled <= 0 {
            return None;
        }
        let value: Decimal = self
            .fills
            .iter()
            .map(|f| f.price * Decimal::from(f.volume))
            .sum();
        Some(value / Decimal::from(filled))
    }
}

/// Error type for gateway operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No quote has been seen for the contract.
    NoQuote(String),
    UnknownOrder(String),
    /// Order refused before it reached the book.
    Rejected(String),
    /// Transport failure talking to the broker.
    Connection(String),
    /// Malformed data from the feed.
    Parse(String),
    Other(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::NoQuote(contract) => write!(f, "No quote for {}", contract),
            GatewayError::UnknownOrder(id) => write!(f, "Unknown order {}", id),
            GatewayError::Rejected(reason) => write!(f, "Order rejected: {}", reason),
            GatewayError::Connection(msg) => write!(f, "Connection error: {}", msg),
            GatewayError::Parse(msg) => write!(f, "Parse error: {}", msg),
            GatewayError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_gateway_error_display() {
        assert_eq!(
            GatewayError::NoQuote("rb2510".to_string()).to_string(),
            "No quote for rb2510"
        );
        assert_eq!(
            GatewayError::Rejected("insufficient margin".to_string()).to_string(),
            "Order rejected: insufficient margin"
        );
        assert_eq!(
            GatewayError::Connection("reset".to_string()).to_string(),
            "Connection error: reset"
        );
    }

    #[test]
    fn test_average_price_is_volume_weighted() {
        let update = OrderUpdate {
            order_id: "1".to_string(),
            status: ExchangeStatus::Finished,
            volume: 4,
            fills: vec![
                FillSegment { price: d("100"), volume: 1 },
                FillSegment { price: d("104"), volume: 3 },
            ],
        };
        assert_eq!(update.filled(), 4);
        assert_eq!(update.average_price(), Some(d("103")));
    }

    #[test]
    fn test_average_price_without_fills() {
        let update = OrderUpdate {
            order_id: "1".to_string(),
            status: ExchangeStatus::Alive,
            volume: 4,
            fills: vec![],
        };
        assert_eq!(update.average_price(), None);
    }
}
