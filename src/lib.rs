pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod reconcile;
pub mod store;
pub mod strategy;

pub use config::{Config, StrategyConfig};
pub use domain::{
    Decimal, GridBucket, GridTable, Leg, LegPosition, MergedTrade, Offset, PerLeg, Position,
    ProfitLedgerRow, Quote, RawTrade, Side, Timestamp,
};
pub use error::AppError;
pub use gateway::{GatewayError, PaperGateway, QuoteSource, ReplayQuoteSource, TradingGateway};
pub use reconcile::{ReconcileReport, Reconciler};
pub use store::{StoreError, StrategyStore};
pub use strategy::{StrategyError, StrategyRunner, StrategyState};
