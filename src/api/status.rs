use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::domain::{MarketQuote, PerLeg, Position, ProfitLedgerRow};
use crate::engine::valuation::{self, ContractHealth, Valuation};
use crate::engine::LedgerState;
use crate::error::AppError;
use crate::gateway::GatewayError;
use crate::strategy::StrategyState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub strategy: String,
    pub layer: i32,
    pub position: Position,
    pub net: PerLeg<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<ProfitLedgerRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation: Option<Valuation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub health: Vec<ContractHealth>,
}

pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let strategy = StrategyState::load(&state.store)?;
    let ledger = state.store.last_ledger()?;

    let (valuation, health) = match market_quotes(&state).await? {
        Some(quotes) => {
            let books = ledger
                .as_ref()
                .map(LedgerState::from_row)
                .unwrap_or_default();
            (
                Some(valuation::value(&books, &quotes)),
                valuation::health(&quotes),
            )
        }
        None => (None, Vec::new()),
    };

    Ok(Json(StatusResponse {
        strategy: state.strategy_name.clone(),
        layer: strategy.layer,
        net: strategy.position.net(),
        position: strategy.position,
        ledger,
        valuation,
        health,
    }))
}

async fn market_quotes(state: &AppState) -> Result<Option<PerLeg<MarketQuote>>, AppError> {
    let Some(source) = state.quotes.as_ref() else {
        return Ok(None);
    };
    let fetched = futures::try_join!(
        source.quote(&state.contracts.pr),
        source.quote(&state.contracts.ta),
        source.quote(&state.contracts.eg),
    );
    match fetched {
        Ok((pr, ta, eg)) => Ok(Some(PerLeg::new(pr, ta, eg))),
        Err(GatewayError::NoQuote(contract)) => {
            tracing::debug!("No quote for {}, status without valuation", contract);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
