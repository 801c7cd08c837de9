//! Live control loop: quotes in, grid decisions, sequenced leg orders out.

pub mod order;
pub mod runner;
pub mod sequencer;
pub mod state;

pub use order::{OrderState, TrackedOrder};
pub use runner::{ExecutedRebalance, RunSummary, StopHandle, StrategyRunner, TickReport};
pub use sequencer::{OrderSequencer, Rebalance, SequencerSettings};
pub use state::StrategyState;

use crate::gateway::GatewayError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors that abort the control loop. Fills recorded before the error stay recorded.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Order {order_id} on {contract} rejected: {reason}")]
    OrderRejected {
        order_id: String,
        contract: String,
        reason: String,
    },
    #[error("Order {order_id} on {contract} cancelled with {filled}/{volume} filled")]
    OrderCancelled {
        order_id: String,
        contract: String,
        filled: i64,
        volume: i64,
    },
    #[error("Order {order_id} on {contract} timed out with {filled}/{volume} filled")]
    OrderTimeout {
        order_id: String,
        contract: String,
        filled: i64,
        volume: i64,
    },
}
