pub mod health;
pub mod ledger;
pub mod status;
pub mod trades;

use crate::domain::PerLeg;
use crate::gateway::QuoteSource;
use crate::store::StrategyStore;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub strategy_name: String,
    pub store: StrategyStore,
    pub contracts: PerLeg<String>,
    /// Live quotes for valuation; status omits valuation without them.
    pub quotes: Option<Arc<dyn QuoteSource>>,
}

impl AppState {
    pub fn new(
        strategy_name: String,
        store: StrategyStore,
        contracts: PerLeg<String>,
        quotes: Option<Arc<dyn QuoteSource>>,
    ) -> Self {
        Self {
            strategy_name,
            store,
            contracts,
            quotes,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/status", get(status::get_status))
        .route("/v1/trades", get(trades::get_trades))
        .route("/v1/ledger", get(ledger::get_ledger))
        .layer(cors)
        .with_state(state)
}
