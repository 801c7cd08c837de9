use axum::http::StatusCode;
use chrono::NaiveDate;
use spreadgrid::api;
use spreadgrid::domain::{MarketQuote, PositionRecord};
use spreadgrid::engine::{HedgeRatios, SpreadPricer};
use spreadgrid::gateway::QuoteSource;
use spreadgrid::{
    Decimal, Leg, LegPosition, Offset, PerLeg, RawTrade, Reconciler, ReplayQuoteSource, Side,
    StrategyStore, Timestamp,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    store: StrategyStore,
    _temp: TempDir,
}

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn at(hour: u32, second: u32) -> Timestamp {
    Timestamp::new(
        NaiveDate::from_ymd_opt(2025, 5, 6)
            .unwrap()
            .and_hms_opt(hour, 0, second)
            .unwrap(),
    )
}

fn contracts() -> PerLeg<String> {
    PerLeg::new(
        "pr2509".to_string(),
        "ta2509".to_string(),
        "eg2509".to_string(),
    )
}

fn market(contract: &str, last: &str, open: &str, expire_rest_days: i64) -> MarketQuote {
    MarketQuote {
        contract: contract.to_string(),
        bid: d(last),
        ask: d(last),
        last: d(last),
        open: d(open),
        upper_limit: d("99999"),
        lower_limit: d("1"),
        open_interest: 100_000,
        volume_multiple: 10,
        expire_rest_days,
    }
}

fn raw(id: &str, second: u32, leg: Leg, action: Side, price: &str, volume: i64) -> RawTrade {
    RawTrade {
        trade_id: id.to_string(),
        timestamp: at(9, second),
        leg,
        contract: contracts()[leg].clone(),
        action,
        price: d(price),
        volume,
        offset: Offset::Open,
        commission: d("1"),
        fee: d("376"),
        quote: d(price),
        pr_long: 0,
        pr_short: 0,
        ta_long: 0,
        ta_short: 0,
        eg_long: 0,
        eg_short: 0,
        pending: true,
    }
}

/// One open spread "a" (pr long 2, ta short 5, eg short 1), reconciled, at layer 1.
fn seed(store: &StrategyStore) {
    store.ensure_dir().unwrap();
    for row in [
        raw("a", 0, Leg::Pr, Side::Buy, "1002", 2),
        raw("a", 1, Leg::Ta, Side::Sell, "800", 5),
        raw("a", 2, Leg::Eg, Side::Sell, "450", 1),
    ] {
        store.append_trade(&row).unwrap();
    }
    let position = PerLeg::new(
        LegPosition::new(2, 0),
        LegPosition::new(0, 5),
        LegPosition::new(0, 1),
    );
    store
        .append_position(&PositionRecord::new(at(9, 3), &position, 1))
        .unwrap();
    Reconciler::new(
        store.clone(),
        SpreadPricer::new(HedgeRatios {
            ta: d("0.5"),
            eg: d("0.5"),
        }),
    )
    .run()
    .unwrap();
}

async fn setup_test_app(seeded: bool, quotes: Option<Arc<dyn QuoteSource>>) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let store = StrategyStore::new(temp_dir.path(), "spread");
    if seeded {
        seed(&store);
    }
    let state = api::AppState::new("spread".to_string(), store.clone(), contracts(), quotes);
    TestApp {
        app: api::create_router(state),
        store,
        _temp: temp_dir,
    }
}

async fn live_quotes(frame: Vec<MarketQuote>) -> Arc<dyn QuoteSource> {
    let source = ReplayQuoteSource::from_frames(vec![frame]);
    assert!(source.wait_update().await.unwrap());
    Arc::new(source)
}

async fn request(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_and_readiness() {
    let fresh = setup_test_app(false, None).await;
    let (status, json) = request(fresh.app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");

    let (status, _) = request(fresh.app, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let seeded = setup_test_app(true, None).await;
    let (status, json) = request(seeded.app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["strategy"], "spread");
}

#[tokio::test]
async fn test_status_without_quotes_reports_state_and_ledger() {
    let test_app = setup_test_app(true, None).await;

    let (status, json) = request(test_app.app, "/v1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["strategy"], "spread");
    assert_eq!(json["layer"], 1);
    assert_eq!(json["net"]["pr"], 2);
    assert_eq!(json["net"]["ta"], -5);
    assert_eq!(json["net"]["eg"], -1);
    assert_eq!(json["position"]["ta"]["short"], 5);
    assert_eq!(json["ledger"]["trade_id"], "a");
    assert_eq!(json["ledger"]["pr_avg_price"], "1002");
    assert!(json.get("valuation").is_none());
    assert!(json.get("health").is_none());
}

#[tokio::test]
async fn test_status_with_quotes_values_open_books() {
    let quotes = live_quotes(vec![
        market("pr2509", "1010", "1005", 100),
        market("ta2509", "800", "801", 100),
        market("eg2509", "450", "450", 20),
    ])
    .await;
    let test_app = setup_test_app(true, Some(quotes)).await;

    let (status, json) = request(test_app.app, "/v1/status").await;
    assert_eq!(status, StatusCode::OK);

    // (1010-1002)*2 + (800-800)*5 + (450-450)*1
    assert_eq!(json["valuation"]["float_profit"], "16");
    // (1010-1005)*2 + (801-800)*5 + 0
    assert_eq!(json["valuation"]["today_float_profit"], "15");
    assert_eq!(json["valuation"]["total_profit"], "16");

    let health = json["health"].as_array().unwrap();
    assert_eq!(health.len(), 3);
    assert_eq!(health[2]["contract"], "eg2509");
    assert_eq!(health[2]["warnings"][0]["kind"], "near_expiry");
    assert_eq!(health[2]["warnings"][0]["days"], 20);
    assert!(health[0]["warnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_without_leg_quote_skips_valuation() {
    let quotes = live_quotes(vec![market("pr2509", "1010", "1005", 100)]).await;
    let test_app = setup_test_app(true, Some(quotes)).await;

    let (status, json) = request(test_app.app, "/v1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.get("valuation").is_none());
    assert_eq!(json["layer"], 1);
}

#[tokio::test]
async fn test_trades_and_ledger_endpoints() {
    let test_app = setup_test_app(true, None).await;
    assert_eq!(test_app.store.read_merged().unwrap().len(), 1);

    let (status, json) = request(test_app.app.clone(), "/v1/trades").await;
    assert_eq!(status, StatusCode::OK);
    let trades = json["trades"].as_array().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0]["trade_id"], "a");
    assert_eq!(trades[0]["direction"], "BUY");
    assert_eq!(trades[0]["offset"], "OPEN");
    assert_eq!(trades[0]["pr_left"], 2);

    let (_, json) = request(test_app.app.clone(), "/v1/trades?openOnly=true&limit=5").await;
    assert_eq!(json["trades"].as_array().unwrap().len(), 1);

    let (status, json) = request(test_app.app.clone(), "/v1/trades?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, json) = request(test_app.app, "/v1/ledger?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["total_close_profit"], "0");
    assert_eq!(rows[0]["ta_short"], 5);
}

#[tokio::test]
async fn test_endpoints_on_empty_strategy() {
    let test_app = setup_test_app(false, None).await;

    let (status, json) = request(test_app.app.clone(), "/v1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["layer"], 0);
    assert!(json.get("ledger").is_none());

    let (status, json) = request(test_app.app, "/v1/trades").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["trades"].as_array().unwrap().is_empty());
}
