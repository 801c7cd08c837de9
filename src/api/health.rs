use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the strategy directory exists, i.e. the strategy has run or been reconciled.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    if state.store.dir().is_dir() {
        (
            StatusCode::OK,
            Json(serde_json::json!({"status": "ready", "strategy": state.strategy_name})),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "no strategy data", "strategy": state.strategy_name})),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PerLeg;
    use crate::store::StrategyStore;
    use tempfile::TempDir;

    fn state(dir: &TempDir) -> AppState {
        AppState::new(
            "s".to_string(),
            StrategyStore::new(dir.path(), "s"),
            PerLeg::new("pr".to_string(), "ta".to_string(), "eg".to_string()),
            None,
        )
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_requires_strategy_dir() {
        let dir = TempDir::new().unwrap();
        let app_state = state(&dir);
        let (status, _) = ready(State(app_state.clone())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        app_state.store.ensure_dir().unwrap();
        let (status, Json(body)) = ready(State(app_state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["strategy"], "s");
    }
}
