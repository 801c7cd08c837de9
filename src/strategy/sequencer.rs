use super::order::{OrderState, TrackedOrder};
use super::state::StrategyState;
use super::StrategyError;
use crate::domain::{Decimal, Leg, LegQuotes, Offset, PerLeg, RawTrade, Side, Timestamp};
use crate::engine::{LegOrder, SpreadPricer};
use crate::gateway::{OrderRequest, TradingGateway};
use crate::store::StrategyStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Poll cadence and patience for a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            timeout: Duration::from_secs(30),
        }
    }
}

/// How waiting on an order ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Done(OrderState),
    TimedOut,
}

/// Context shared by every leg of one rebalance.
#[derive(Debug, Clone)]
pub struct Rebalance<'a> {
    pub trade_id: &'a str,
    pub fee: Decimal,
    /// Quotes the fee was computed from.
    pub quotes: &'a LegQuotes,
}

/// Executes planned leg orders, closing opposing lots before opening new ones.
///
/// Every confirmed fill is written to the raw trade log and followed by a position
/// snapshot before the next order is sent.
#[derive(Debug, Clone)]
pub struct OrderSequencer {
    gateway: Arc<dyn TradingGateway>,
    store: StrategyStore,
    contracts: PerLeg<String>,
    settings: SequencerSettings,
}

impl OrderSequencer {
    pub fn new(
        gateway: Arc<dyn TradingGateway>,
        store: StrategyStore,
        contracts: PerLeg<String>,
        settings: SequencerSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            contracts,
            settings,
        }
    }

    /// Run `orders` in sequence. Fills already recorded stay recorded if a later order fails.
    pub async fn execute(
        &self,
        state: &mut StrategyState,
        rebalance: &Rebalance<'_>,
        orders: &[LegOrder],
    ) -> Result<Vec<RawTrade>, StrategyError> {
        let mut commission_mark = self.gateway.cumulative_commission().await?;
        let mut trades = Vec::new();

        for order in orders {
            if order.volume <= 0 {
                continue;
            }
            let opposing = state.position[order.leg].opposing(order.side);
            let close_volume = order.volume.min(opposing);
            if close_volume > 0 {
                let trade = self
                    .segment(state, rebalance, order, Offset::Close, close_volume, &mut commission_mark)
                    .await?;
                trades.push(trade);
            }
            let open_volume = order.volume - close_volume;
            if open_volume > 0 {
                let trade = self
                    .segment(state, rebalance, order, Offset::Open, open_volume, &mut commission_mark)
                    .await?;
                trades.push(trade);
            }
        }

        Ok(trades)
    }

    async fn segment(
        &self,
        state: &mut StrategyState,
        rebalance: &Rebalance<'_>,
        order: &LegOrder,
        offset: Offset,
        volume: i64,
        commission_mark: &mut Decimal,
    ) -> Result<RawTrade, StrategyError> {
        let request = OrderRequest {
            contract: self.contracts[order.leg].clone(),
            side: order.side,
            offset,
            volume,
        };
        let order_id = self.gateway.place_order(&request).await?;
        tracing::info!(
            "Placed {} {} {} {} x{} ({})",
            order.leg,
            request.contract,
            request.side,
            offset,
            volume,
            order_id
        );

        let mut tracked = TrackedOrder::new(order_id, request);
        let completion = self.await_terminal(&mut tracked).await?;

        let filled = tracked.filled();
        let recorded = if filled > 0 {
            Some(
                self.record_fill(state, rebalance, order.leg, &tracked, commission_mark)
                    .await?,
            )
        } else {
            None
        };

        let order_id = tracked.order_id.clone();
        let contract = tracked.request.contract.clone();
        match (completion, recorded) {
            (Completion::Done(OrderState::Filled), Some(trade)) => Ok(trade),
            (Completion::Done(OrderState::Failed), _) => Err(StrategyError::OrderRejected {
                order_id,
                contract,
                reason: tracked.reason().unwrap_or("unknown").to_string(),
            }),
            (Completion::TimedOut, _) => Err(StrategyError::OrderTimeout {
                order_id,
                contract,
                filled,
                volume,
            }),
            _ => Err(StrategyError::OrderCancelled {
                order_id,
                contract,
                filled,
                volume,
            }),
        }
    }

    /// Poll until terminal. On timeout, cancel and poll once more so late fills are kept.
    async fn await_terminal(&self, tracked: &mut TrackedOrder) -> Result<Completion, StrategyError> {
        let deadline = Instant::now() + self.settings.timeout;
        loop {
            let update = self.gateway.poll_order(&tracked.order_id).await?;
            let state = tracked.apply(&update);
            if state.is_terminal() {
                return Ok(Completion::Done(state));
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }

        tracing::warn!(
            "Order {} on {} timed out after {:?} with {}/{} filled, cancelling",
            tracked.order_id,
            tracked.request.contract,
            self.settings.timeout,
            tracked.filled(),
            tracked.request.volume
        );
        self.gateway.cancel_order(&tracked.order_id).await?;
        let update = self.gateway.poll_order(&tracked.order_id).await?;
        match tracked.apply(&update) {
            OrderState::Filled => Ok(Completion::Done(OrderState::Filled)),
            _ => Ok(Completion::TimedOut),
        }
    }

    async fn record_fill(
        &self,
        state: &mut StrategyState,
        rebalance: &Rebalance<'_>,
        leg: Leg,
        tracked: &TrackedOrder,
        commission_mark: &mut Decimal,
    ) -> Result<RawTrade, StrategyError> {
        let filled = tracked.filled();
        let side: Side = tracked.request.side;
        let price = tracked.average_price().unwrap_or_default();

        let commission_now = self.gateway.cumulative_commission().await?;
        let commission = commission_now - *commission_mark;
        *commission_mark = commission_now;

        match tracked.request.offset {
            Offset::Close => state.position[leg].apply_close(side, filled),
            Offset::Open => state.position[leg].apply_open(side, filled),
        }

        let trade = RawTrade {
            trade_id: rebalance.trade_id.to_string(),
            timestamp: Timestamp::now(),
            leg,
            contract: tracked.request.contract.clone(),
            action: side,
            price,
            volume: filled,
            offset: tracked.request.offset,
            commission,
            fee: rebalance.fee,
            quote: SpreadPricer::reference_quote(&rebalance.quotes[leg], side),
            pr_long: 0,
            pr_short: 0,
            ta_long: 0,
            ta_short: 0,
            eg_long: 0,
            eg_short: 0,
            pending: true,
        }
        .with_position(&state.position);

        self.store.append_trade(&trade)?;
        state.save(&self.store)?;
        tracing::info!(
            "Filled {} {} {} x{} @ {} (commission {})",
            leg,
            trade.action,
            trade.offset,
            filled,
            price,
            commission
        );
        Ok(trade)
    }
}
