use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use estimator::{ColumnData, Frame, GbdtParams, PricingPipeline};
use modelops::{save_artifact, save_metrics, ArtifactFormat, MetricsRecord};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use valuation::access_log::read_entries;
use valuation::{
    build_router, AccessLog, ApiKeyStore, AppConfig, AppState, ModelRegistry, SlidingWindowLimiter,
};

const KEY: &str = "test-key-0123456789";
const CLIENT: &str = "10.0.0.5:40000";
const BLOCKED: &str = "10.9.9.9:40000";

struct Fixture {
    _dir: TempDir,
    app: Router,
    limiter: Arc<SlidingWindowLimiter>,
    access_log: AccessLog,
    log_path: PathBuf,
}

fn train_model(models: &std::path::Path) {
    let types = ["casa", "departamento"];
    let sectors = ["vitacura", "las condes", "providencia"];
    let n = 60;
    let area: Vec<f64> = (0..n).map(|i| 50.0 + 4.0 * i as f64).collect();
    let type_col = (0..n).map(|i| types[i % 2].to_string()).collect();
    let sector_col = (0..n).map(|i| sectors[i % 3].to_string()).collect();
    let frame = Frame::new()
        .with_column("type", ColumnData::Categorical(type_col))
        .unwrap()
        .with_column("sector", ColumnData::Categorical(sector_col))
        .unwrap()
        .with_column("net_usable_area", ColumnData::Numeric(area.clone()))
        .unwrap()
        .with_column("net_area", ColumnData::Numeric(area.iter().map(|a| a * 1.2).collect()))
        .unwrap()
        .with_column("n_rooms", ColumnData::Numeric((0..n).map(|i| (i % 5) as f64 + 1.0).collect()))
        .unwrap()
        .with_column(
            "n_bathroom",
            ColumnData::Numeric((0..n).map(|i| (i % 3) as f64 + 1.0).collect()),
        )
        .unwrap()
        .with_column("latitude", ColumnData::Numeric(vec![-33.41; n]))
        .unwrap()
        .with_column("longitude", ColumnData::Numeric(vec![-70.56; n]))
        .unwrap();
    let price: Vec<f64> = area.iter().map(|a| 1500.0 + a * 40.0).collect();

    let params = GbdtParams { n_estimators: 20, ..GbdtParams::default() };
    let pipeline = PricingPipeline::fit(&frame, &price, params).unwrap();
    save_artifact(&pipeline, &models.join("property_friends_v1"), ArtifactFormat::Bincode).unwrap();
    save_metrics(
        &models.join("model_metrics.json"),
        "property_friends_v1.bin",
        &MetricsRecord {
            rmse: 120.0,
            mape: 0.05,
            mae: 90.0,
            timestamp: "2024-06-01T10:00:00+00:00".into(),
        },
    )
    .unwrap();
}

fn fixture(client: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let models = dir.path().join("models");
    train_model(&models);

    let root = dir.path().to_path_buf();
    let cfg = AppConfig::from_lookup(|key| match key {
        "MODELS_DIR" => Some(root.join("models").display().to_string()),
        "ACCESS_LOG_PATH" => Some(root.join("logs/api_logs.json").display().to_string()),
        "SECRETS_PATH" => Some(root.join("secrets.toml").display().to_string()),
        "IP_BLACKLIST" => Some("10.9.9.9, 192.168.0.66".to_string()),
        _ => None,
    })
    .unwrap();

    let registry = Arc::new(ModelRegistry::load(&cfg.models_dir, &cfg.model_prefix).unwrap());
    let api_key = Arc::new(ApiKeyStore::from_key(&cfg.secrets_path, &cfg.api_client, KEY));
    let limiter = Arc::new(SlidingWindowLimiter::new(cfg.rate_limit, cfg.rate_window));
    let log_path = cfg.access_log_path.clone();
    let access_log = AccessLog::spawn(log_path.clone());

    let state =
        Arc::new(AppState::new(cfg, registry, api_key, limiter.clone(), access_log.clone()));
    let addr: SocketAddr = client.parse().unwrap();
    let app = build_router(state).layer(MockConnectInfo(addr));

    Fixture { _dir: dir, app, limiter, access_log, log_path }
}

fn property() -> Value {
    json!({
        "type": "departamento",
        "sector": "vitacura",
        "net_usable_area": 140.0,
        "net_area": 170.0,
        "n_rooms": 4.0,
        "n_bathroom": 3.0,
        "latitude": -33.40,
        "longitude": -70.58
    })
}

fn predict_request(key: Option<&str>, body: &Value) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json");
    if let Some(key) = key {
        req = req.header("authorization", key);
    }
    req.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, key: Option<&str>) -> Request<Body> {
    let mut req = Request::builder().uri(uri);
    if let Some(key) = key {
        req = req.header("authorization", key);
    }
    req.body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let f = fixture(CLIENT);
    let (status, body) = send(&f.app, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_predict_returns_finite_price() {
    let f = fixture(CLIENT);
    let (status, body) = send(&f.app, predict_request(Some(KEY), &property())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let price = body["price"].as_f64().unwrap();
    assert!(price.is_finite());

    // unseen categories fall back to the prior
    let mut unseen = property();
    unseen["sector"] = json!("somewhere new");
    let bearer = format!("Bearer {KEY}");
    let (status, body) = send(&f.app, predict_request(Some(bearer.as_str()), &unseen)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["price"].as_f64().unwrap().is_finite());
}

#[tokio::test]
async fn test_wrong_or_missing_key_is_unauthorized() {
    let f = fixture(CLIENT);
    let (status, body) = send(&f.app, predict_request(Some("nope"), &property())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid API Key" }));

    let (status, _) = send(&f.app, predict_request(None, &property())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&f.app, get_request("/model_history", Some("nope"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blacklist_runs_before_rate_limit_and_key() {
    let f = fixture(BLOCKED);
    let (status, body) = send(&f.app, predict_request(Some(KEY), &property())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
    assert_eq!(f.limiter.tracked_clients().await, 0);

    let (status, _) = send(&f.app, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_sixth_prediction_in_window_is_rate_limited() {
    let f = fixture(CLIENT);
    for i in 0..5 {
        let (status, _) = send(&f.app, predict_request(Some(KEY), &property())).await;
        assert_eq!(status, StatusCode::OK, "request {i}");
    }
    let (status, body) = send(&f.app, predict_request(Some(KEY), &property())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded");

    // other routes are not limited
    let (status, _) = send(&f.app, get_request("/model_metadata", Some(KEY))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_requests_with_bad_keys_count_toward_the_limit() {
    let f = fixture(CLIENT);
    for _ in 0..5 {
        let (status, _) = send(&f.app, predict_request(Some("guess"), &property())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _) = send(&f.app, predict_request(Some(KEY), &property())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let f = fixture(CLIENT);

    let mut negative = property();
    negative["net_area"] = json!(-10.0);
    let (status, body) = send(&f.app, predict_request(Some(KEY), &negative)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let mut missing = property();
    missing.as_object_mut().unwrap().remove("sector");
    let (status, _) = send(&f.app, predict_request(Some(KEY), &missing)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_model_metadata_and_history() {
    let f = fixture(CLIENT);
    let (status, meta) = send(&f.app, get_request("/model_metadata", Some(KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(meta["artifact"], "property_friends_v1.bin");
    assert_eq!(meta["version"], 1);
    assert_eq!(meta["format"], "bincode");
    assert_eq!(meta["digest"].as_str().unwrap().len(), 64);
    assert_eq!(meta["metrics"]["RMSE"], 120.0);
    assert_eq!(meta["categorical_columns"], json!(["type", "sector"]));

    let (status, history) = send(&f.app, get_request("/model_history", Some(KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["artifact"], "property_friends_v1.bin");
    assert_eq!(history[0]["MAE"], 90.0);
}

#[tokio::test]
async fn test_every_request_is_access_logged() {
    let f = fixture(CLIENT);
    send(&f.app, get_request("/health", None)).await;
    send(&f.app, predict_request(Some(KEY), &property())).await;
    send(&f.app, predict_request(Some("bad"), &property())).await;
    send(&f.app, get_request("/does-not-exist", None)).await;
    f.access_log.flush().await;

    let entries = read_entries(&f.log_path).unwrap();
    assert_eq!(entries.len(), 4);
    let statuses: Vec<u16> = entries.iter().map(|e| e.status_code).collect();
    assert_eq!(statuses, [200, 200, 401, 404]);
    assert_eq!(entries[1].endpoint, "/predict");
    assert_eq!(entries[1].method, "POST");
    assert!(entries[1].error.is_none());
    assert_eq!(entries[2].error.as_deref(), Some("Invalid API Key"));
    assert!(entries.iter().all(|e| e.duration >= 0.0));

    let (status, report) = send(&f.app, get_request("/monitoring", Some(KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_calls"], 4);
    assert_eq!(report["error_count"], 2);
    assert_eq!(report["model_history"].as_array().unwrap().len(), 1);
}
