use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::ProfitLedgerRow;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    pub rows: Vec<ProfitLedgerRow>,
}

pub async fn get_ledger(
    Query(params): Query<LedgerQuery>,
    State(state): State<AppState>,
) -> Result<Json<LedgerResponse>, AppError> {
    let mut rows = state.store.read_ledger()?;
    if let Some(limit) = params.limit {
        let skip = rows.len().saturating_sub(limit);
        rows.drain(..skip);
    }
    Ok(Json(LedgerResponse { rows }))
}
