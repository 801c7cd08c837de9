use crate::domain::Decimal;
use crate::gateway::{ExchangeStatus, FillSegment, OrderId, OrderRequest, OrderUpdate};

/// Lifecycle of one submitted order as seen by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Submitted,
    PartiallyFilled,
    Filled,
    /// Finished short of its volume; any fills are final.
    Cancelled,
    Failed,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Cancelled | OrderState::Failed
        )
    }
}

/// Order tracked through polls until it reaches a terminal state.
#[derive(Debug, Clone)]
pub struct TrackedOrder {
    pub order_id: OrderId,
    pub request: OrderRequest,
    state: OrderState,
    fills: Vec<FillSegment>,
    reason: Option<String>,
}

impl TrackedOrder {
    pub fn new(order_id: OrderId, request: OrderRequest) -> Self {
        Self {
            order_id,
            request,
            state: OrderState::Submitted,
            fills: Vec::new(),
            reason: None,
        }
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    /// Rejection reason reported by the gateway.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn filled(&self) -> i64 {
        self.fills.iter().map(|f| f.volume).sum()
    }

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

    /// Advance the state machine with a poll result. Terminal states are sticky.
    pub fn apply(&mut self, update: &OrderUpdate) -> OrderState {
        if self.state.is_terminal() {
            return self.state;
        }
        self.fills = update.fills.clone();
        let filled = self.filled();
        self.state = match &update.status {
            ExchangeStatus::Rejected { reason } => {
                self.reason = Some(reason.clone());
                OrderState::Failed
            }
            ExchangeStatus::Finished if filled >= self.request.volume => OrderState::Filled,
            ExchangeStatus::Finished => OrderState::Cancelled,
            ExchangeStatus::Alive if filled > 0 => OrderState::PartiallyFilled,
            ExchangeStatus::Alive => OrderState::Submitted,
        };
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Offset, Side};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn tracked() -> TrackedOrder {
        TrackedOrder::new(
            "1".to_string(),
            OrderRequest {
                contract: "pr2509".to_string(),
                side: Side::Buy,
                offset: Offset::Open,
                volume: 4,
            },
        )
    }

    fn update(status: ExchangeStatus, fills: &[(&str, i64)]) -> OrderUpdate {
        OrderUpdate {
            order_id: "1".to_string(),
            status,
            volume: 4,
            fills: fills
                .iter()
                .map(|(p, v)| FillSegment {
                    price: d(p),
                    volume: *v,
                })
                .collect(),
        }
    }

    #[test]
    fn test_progresses_to_filled() {
        let mut order = tracked();
        assert_eq!(order.state(), OrderState::Submitted);
        assert_eq!(
            order.apply(&update(ExchangeStatus::Alive, &[])),
            OrderState::Submitted
        );
        assert_eq!(
            order.apply(&update(ExchangeStatus::Alive, &[("100", 1)])),
            OrderState::PartiallyFilled
        );
        assert_eq!(
            order.apply(&update(ExchangeStatus::Finished, &[("100", 1), ("104", 3)])),
            OrderState::Filled
        );
        assert_eq!(order.filled(), 4);
        assert_eq!(order.average_price(), Some(d("103")));
    }

    #[test]
    fn test_finished_short_is_cancelled() {
        let mut order = tracked();
        assert_eq!(
            order.apply(&update(ExchangeStatus::Finished, &[("100", 2)])),
            OrderState::Cancelled
        );
        assert_eq!(order.filled(), 2);
    }

    #[test]
    fn test_rejection_fails_and_sticks() {
        let mut order = tracked();
        let rejected = ExchangeStatus::Rejected {
            reason: "price limit".to_string(),
        };
        assert_eq!(order.apply(&update(rejected, &[])), OrderState::Failed);
        assert_eq!(order.reason(), Some("price limit"));
        assert_eq!(
            order.apply(&update(ExchangeStatus::Finished, &[("1", 4)])),
            OrderState::Failed
        );
        assert_eq!(order.average_price(), None);
    }
}
