use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{MergedTrade, Offset};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesQuery {
    /// Only OPEN lots that still carry unmatched volume.
    pub open_only: Option<bool>,
    /// Most recent N rows.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<MergedTrade>,
}

pub async fn get_trades(
    Query(params): Query<TradesQuery>,
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    if params.limit == Some(0) {
        return Err(AppError::BadRequest("limit must be positive".to_string()));
    }

    let mut trades = state.store.read_merged()?;
    if params.open_only.unwrap_or(false) {
        trades.retain(|t| t.offset == Offset::Open && !t.matched);
    }
    if let Some(limit) = params.limit {
        let skip = trades.len().saturating_sub(limit);
        trades.drain(..skip);
    }

    Ok(Json(TradesResponse { trades }))
}
