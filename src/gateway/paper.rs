//! In-process paper broker filling against the quote source's top of book.

use super::{
    ExchangeStatus, FillSegment, GatewayError, OrderId, OrderRequest, OrderUpdate, QuoteSource,
    TradingGateway,
};
use crate::domain::Decimal;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// How the paper broker executes the next order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillMode {
    /// Whole volume fills on the first poll.
    Immediate,
    /// Volume fills over `n` polls.
    Split(u32),
    /// `filled` lots trade on the first poll, then the order rests until cancelled.
    Stall { filled: i64 },
    /// Every poll reports a rejection.
    Reject(String),
}

#[derive(Debug)]
struct PaperOrder {
    request: OrderRequest,
    price: Decimal,
    mode: FillMode,
    fills: Vec<FillSegment>,
    cancelled: bool,
    polls: u32,
}

impl PaperOrder {
    fn filled(&self) -> i64 {
        self.fills.iter().map(|f| f.volume).sum()
    }

    /// Volume that trades on this poll.
    fn next_fill(&self) -> i64 {
        let left = self.request.volume - self.filled();
        match &self.mode {
            FillMode::Immediate => left,
            FillMode::Split(n) => {
                let n = i64::from((*n).max(1));
                let chunk = (self.request.volume + n - 1) / n;
                chunk.min(left)
            }
            FillMode::Stall { filled } => {
                if self.polls == 0 {
                    (*filled).min(left)
                } else {
                    0
                }
            }
            FillMode::Reject(_) => 0,
        }
    }
}

#[derive(Debug, Default)]
struct Book {
    next_id: u64,
    orders: HashMap<OrderId, PaperOrder>,
    script: VecDeque<FillMode>,
    commission: Decimal,
}

/// Paper trading gateway.
///
/// BUY orders fill at the ask and SELL orders at the bid seen when the order is placed.
/// Fill behaviour can be scripted per order with [`PaperGateway::with_script`].
#[derive(Debug, Clone)]
pub struct PaperGateway {
    quotes: Arc<dyn QuoteSource>,
    commission_per_lot: Decimal,
    book: Arc<Mutex<Book>>,
}

impl PaperGateway {
    pub fn new(quotes: Arc<dyn QuoteSource>) -> Self {
        Self {
            quotes,
            commission_per_lot: Decimal::zero(),
            book: Arc::new(Mutex::new(Book::default())),
        }
    }

    pub fn with_commission_per_lot(mut self, commission: Decimal) -> Self {
        self.commission_per_lot = commission;
        self
    }

    /// Fill modes consumed one per placed order. Unscripted orders fill immediately.
    pub fn with_script(self, modes: impl IntoIterator<Item = FillMode>) -> Self {
        self.lock().script.extend(modes);
        self
    }

    /// Requests placed so far, in submission order.
    pub fn placed(&self) -> Vec<OrderRequest> {
        let book = self.lock();
        let mut orders: Vec<(&OrderId, &PaperOrder)> = book.orders.iter().collect();
        orders.sort_by_key(|(id, _)| id.trim_start_matches("paper-").parse::<u64>().unwrap_or(0));
        orders.into_iter().map(|(_, o)| o.request.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Book> {
        self.book.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TradingGateway for PaperGateway {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderId, GatewayError> {
        if request.volume <= 0 {
            return Err(GatewayError::Rejected(format!(
                "volume must be positive, got {}",
                request.volume
            )));
        }
        let quote = self.quotes.quote(&request.contract).await?;
        let price = quote.top_of_book().marketable(request.side);

        let mut book = self.lock();
        book.next_id += 1;
        let order_id = format!("paper-{}", book.next_id);
        let mode = book
            .script
            .pop_front()
            .unwrap_or(FillMode::Immediate);
        tracing::debug!(
            "Paper order {} {} {} {} x{} at {} ({:?})",
            order_id,
            request.contract,
            request.side,
            request.offset,
            request.volume,
            price,
            mode
        );
        book.orders.insert(
            order_id.clone(),
            PaperOrder {
                request: request.clone(),
                price,
                mode,
                fills: Vec::new(),
                cancelled: false,
                polls: 0,
            },
        );
        Ok(order_id)
    }

    async fn poll_order(&self, order_id: &str) -> Result<OrderUpdate, GatewayError> {
        let commission_per_lot = self.commission_per_lot;
        let mut book = self.lock();
        let order = book
            .orders
            .get_mut(order_id)
            .ok_or_else(|| GatewayError::UnknownOrder(order_id.to_string()))?;

        let mut traded = 0;
        if !order.cancelled {
            traded = order.next_fill();
            if traded > 0 {
                order.fills.push(FillSegment {
                    price: order.price,
                    volume: traded,
                });
            }
            order.polls += 1;
        }

        let status = match &order.mode {
            FillMode::Reject(reason) => ExchangeStatus::Rejected {
                reason: reason.clone(),
            },
            _ if order.cancelled || order.filled() >= order.request.volume => {
                ExchangeStatus::Finished
            }
            _ => ExchangeStatus::Alive,
        };
        let update = OrderUpdate {
            order_id: order_id.to_string(),
            status,
            volume: order.request.volume,
            fills: order.fills.clone(),
        };
        book.commission += commission_per_lot * Decimal::from(traded);
        Ok(update)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), GatewayError> {
        let mut book = self.lock();
        let order = book
            .orders
            .get_mut(order_id)
            .ok_or_else(|| GatewayError::UnknownOrder(order_id.to_string()))?;
        order.cancelled = true;
        Ok(())
    }

    async fn cumulative_commission(&self) -> Result<Decimal, GatewayError> {
        Ok(self.lock().commission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketQuote, Offset, Side};
    use crate::gateway::ReplayQuoteSource;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn market(contract: &str, bid: &str, ask: &str) -> MarketQuote {
        MarketQuote {
            contract: contract.to_string(),
            bid: d(bid),
            ask: d(ask),
            last: d(bid),
            open: d(bid),
            upper_limit: d("99999"),
            lower_limit: d("1"),
            open_interest: 100_000,
            volume_multiple: 10,
            expire_rest_days: 100,
        }
    }

    async fn gateway() -> PaperGateway {
        let quotes = ReplayQuoteSource::from_frames(vec![vec![market("x", "100", "101")]]);
        quotes.wait_update().await.unwrap();
        PaperGateway::new(Arc::new(quotes)).with_commission_per_lot(d("1.5"))
    }

    fn order(side: Side, volume: i64) -> OrderRequest {
        OrderRequest {
            contract: "x".to_string(),
            side,
            offset: Offset::Open,
            volume,
        }
    }

    #[tokio::test]
    async fn test_immediate_fill_at_marketable_price() {
        let gw = gateway().await;
        let id = gw.place_order(&order(Side::Buy, 3)).await.unwrap();
        let update = gw.poll_order(&id).await.unwrap();
        assert_eq!(update.status, ExchangeStatus::Finished);
        assert_eq!(update.filled(), 3);
        assert_eq!(update.average_price(), Some(d("101")));
        assert_eq!(gw.cumulative_commission().await.unwrap(), d("4.5"));

        let id = gw.place_order(&order(Side::Sell, 1)).await.unwrap();
        let update = gw.poll_order(&id).await.unwrap();
        assert_eq!(update.average_price(), Some(d("100")));
    }

    #[tokio::test]
    async fn test_split_fills_over_polls() {
        let gw = gateway().await.with_script([FillMode::Split(2)]);
        let id = gw.place_order(&order(Side::Buy, 3)).await.unwrap();
        let first = gw.poll_order(&id).await.unwrap();
        assert_eq!(first.status, ExchangeStatus::Alive);
        assert_eq!(first.filled(), 2);
        let second = gw.poll_order(&id).await.unwrap();
        assert_eq!(second.status, ExchangeStatus::Finished);
        assert_eq!(second.filled(), 3);
        assert_eq!(second.fills.len(), 2);
    }

    #[tokio::test]
    async fn test_stall_rests_until_cancelled() {
        let gw = gateway().await.with_script([FillMode::Stall { filled: 1 }]);
        let id = gw.place_order(&order(Side::Buy, 3)).await.unwrap();
        assert_eq!(gw.poll_order(&id).await.unwrap().filled(), 1);
        assert_eq!(gw.poll_order(&id).await.unwrap().status, ExchangeStatus::Alive);
        gw.cancel_order(&id).await.unwrap();
        let update = gw.poll_order(&id).await.unwrap();
        assert_eq!(update.status, ExchangeStatus::Finished);
        assert_eq!(update.filled(), 1);
    }

    #[tokio::test]
    async fn test_reject_mode_and_bad_volume() {
        let gw = gateway().await.with_script([FillMode::Reject("no margin".to_string())]);
        let id = gw.place_order(&order(Side::Buy, 1)).await.unwrap();
        assert_eq!(
            gw.poll_order(&id).await.unwrap().status,
            ExchangeStatus::Rejected {
                reason: "no margin".to_string()
            }
        );
        assert!(matches!(
            gw.place_order(&order(Side::Buy, 0)).await,
            Err(GatewayError::Rejected(_))
        ));
        assert_eq!(
            gw.poll_order("missing").await,
            Err(GatewayError::UnknownOrder("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_placed_keeps_submission_order() {
        let gw = gateway().await;
        for volume in 1..=11 {
            gw.place_order(&order(Side::Buy, volume)).await.unwrap();
        }
        let volumes: Vec<i64> = gw.placed().iter().map(|o| o.volume).collect();
        assert_eq!(volumes, (1..=11).collect::<Vec<_>>());
    }
}
