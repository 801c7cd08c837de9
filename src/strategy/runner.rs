use super::sequencer::{OrderSequencer, Rebalance, SequencerSettings};
use super::state::StrategyState;
use super::StrategyError;
use crate::config::StrategyConfig;
use crate::domain::{Decimal, LegQuotes, PerLeg, RawTrade, Side};
use crate::engine::{
    GridLayerEngine, Hold, PlanOutcome, RebalanceSignal, SpreadPricer, TargetPositionPlanner,
};
use crate::gateway::{GatewayError, QuoteSource, TradingGateway};
use crate::store::StrategyStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Cloneable handle that stops the control loop between ticks.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One rebalance carried out during a tick.
#[derive(Debug, Clone)]
pub struct ExecutedRebalance {
    pub trade_id: String,
    pub signal: RebalanceSignal,
    pub trades: Vec<RawTrade>,
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Quotes were missing or incomplete; nothing was evaluated.
    pub skipped: bool,
    pub fees: Option<(Decimal, Decimal)>,
    pub rebalances: Vec<ExecutedRebalance>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub rebalances: u64,
    /// Stopped through a [`StopHandle`] rather than by the quote source running dry.
    pub stopped: bool,
}

/// Drives the grid strategy from quote updates.
#[derive(Debug)]
pub struct StrategyRunner {
    quotes: Arc<dyn QuoteSource>,
    contracts: PerLeg<String>,
    pricer: SpreadPricer,
    grid: GridLayerEngine,
    planner: TargetPositionPlanner,
    sequencer: OrderSequencer,
    store: StrategyStore,
    state: StrategyState,
    stop: StopHandle,
}

impl StrategyRunner {
    /// Build a runner and restore its state from the store.
    pub fn new(
        config: &StrategyConfig,
        settings: SequencerSettings,
        store: StrategyStore,
        quotes: Arc<dyn QuoteSource>,
        gateway: Arc<dyn TradingGateway>,
    ) -> Result<Self, StrategyError> {
        store.ensure_dir()?;
        let state = StrategyState::load(&store)?;
        tracing::info!(
            "Restored strategy state: layer {}, net {:?}",
            state.layer,
            state.position.net()
        );
        Ok(Self {
            quotes,
            contracts: config.contracts.clone(),
            pricer: SpreadPricer::new(config.hedge_ratios),
            grid: GridLayerEngine::new(config.buckets.clone()),
            planner: TargetPositionPlanner::new(config.unit, config.policy),
            sequencer: OrderSequencer::new(gateway, store.clone(), config.contracts.clone(), settings),
            store,
            state,
            stop: StopHandle::default(),
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    /// Run until stopped, the quote source is exhausted, or an error aborts the loop.
    pub async fn run(&mut self) -> Result<RunSummary, StrategyError> {
        let mut summary = RunSummary::default();
        loop {
            if self.stop.is_stopped() {
                summary.stopped = true;
                break;
            }
            match self.quotes.wait_update().await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    tracing::error!("Quote source failed, stopping: {}", e);
                    return Err(e.into());
                }
            }
            match self.tick().await {
                Ok(report) => {
                    summary.ticks += 1;
                    summary.rebalances += report.rebalances.len() as u64;
                }
                Err(e) => {
                    tracing::error!("Strategy aborted: {}", e);
                    return Err(e);
                }
            }
        }
        tracing::info!(
            "Strategy loop finished after {} ticks, {} rebalances",
            summary.ticks,
            summary.rebalances
        );
        Ok(summary)
    }

    /// Evaluate the BUY side, then the SELL side against the possibly updated layer.
    pub async fn tick(&mut self) -> Result<TickReport, StrategyError> {
        let mut report = TickReport::default();
        let Some(quotes) = self.leg_quotes().await? else {
            report.skipped = true;
            return Ok(report);
        };

        let fee_buy = self.pricer.fee(&quotes, Side::Buy);
        let fee_sell = self.pricer.fee(&quotes, Side::Sell);
        report.fees = Some((fee_buy, fee_sell));

        for (side, fee) in [(Side::Buy, fee_buy), (Side::Sell, fee_sell)] {
            if let Some(executed) = self.evaluate_side(side, fee, &quotes).await? {
                report.rebalances.push(executed);
            }
        }
        Ok(report)
    }

    async fn evaluate_side(
        &mut self,
        side: Side,
        fee: Decimal,
        quotes: &LegQuotes,
    ) -> Result<Option<ExecutedRebalance>, StrategyError> {
        let signal = match self.grid.evaluate(side, fee, self.state.layer) {
            Ok(signal) => signal,
            Err(Hold::OutOfGrid) => {
                tracing::info!("{} fee {} is outside the grid", side, fee);
                return Ok(None);
            }
            Err(Hold::NoMove { candidate }) => {
                tracing::debug!(
                    "{} fee {} in layer {}, holding at layer {}",
                    side,
                    fee,
                    candidate,
                    self.state.layer
                );
                return Ok(None);
            }
        };

        let orders = match self.planner.plan(signal.multiplier, &self.state.position) {
            PlanOutcome::Orders(orders) => orders,
            PlanOutcome::Blocked { legs_at_target } => {
                tracing::info!(
                    "Layer {} -> {} skipped, legs already at target: {:?}",
                    signal.from_layer,
                    signal.to_layer,
                    legs_at_target
                );
                return Ok(None);
            }
            PlanOutcome::AtTarget => {
                tracing::info!(
                    "Layer {} -> {} skipped, position already at target",
                    signal.from_layer,
                    signal.to_layer
                );
                return Ok(None);
            }
        };

        let trade_id = Uuid::new_v4().to_string();
        tracing::info!(
            "{} fee {} moves layer {} -> {} (x{}), trade {}",
            side,
            fee,
            signal.from_layer,
            signal.to_layer,
            signal.multiplier,
            trade_id
        );
        let rebalance = Rebalance {
            trade_id: &trade_id,
            fee,
            quotes,
        };
        let trades = self
            .sequencer
            .execute(&mut self.state, &rebalance, &orders)
            .await?;

        self.state.layer = signal.to_layer;
        self.state.save(&self.store)?;

        Ok(Some(ExecutedRebalance {
            trade_id,
            signal,
            trades,
        }))
    }

    /// Fetch the three leg quotes concurrently. `None` when any is missing or one-sided.
    async fn leg_quotes(&self) -> Result<Option<LegQuotes>, StrategyError> {
        let fetched = futures::try_join!(
            self.quotes.quote(&self.contracts.pr),
            self.quotes.quote(&self.contracts.ta),
            self.quotes.quote(&self.contracts.eg),
        );
        let (pr, ta, eg) = match fetched {
            Ok(quotes) => quotes,
            Err(GatewayError::NoQuote(contract)) => {
                tracing::warn!("No quote yet for {}, skipping tick", contract);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let quotes = PerLeg::new(pr.top_of_book(), ta.top_of_book(), eg.top_of_book());
        if let Some((leg, _)) = quotes.iter().find(|(_, q)| !q.is_valid()) {
            tracing::warn!("Incomplete quote on {} leg, skipping tick", leg);
            return Ok(None);
        }
        Ok(Some(quotes))
    }
}
