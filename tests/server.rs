use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sleepmap::config::{CanvasConfig, RenderConfig};
use sleepmap::controller::SelectionController;
use sleepmap::render::RenderContext;
use sleepmap::server::{build_router, AppState};
use sleepmap::types::{VariableKey, ZipRecord};
use std::sync::Arc;
use tower::ServiceExt;

fn state() -> Arc<AppState> {
    let shapes = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"zcta5": "10001"},
         "geometry": {"type": "Polygon", "coordinates": [[[-74.0,40.7],[-73.9,40.7],[-73.9,40.8],[-74.0,40.8],[-74.0,40.7]]]}}
    ]}"#;
    let features = sleepmap::data::parse_geojson(shapes, "zcta5").expect("shapes");
    let records = vec![ZipRecord {
        zipcode: "10001".into(),
        neighborhood: Some("Chelsea".into()),
        sleep_deprivation: Some(42.5),
        median_income: Some(90_000.0),
        ..Default::default()
    }];
    let context = RenderContext::new(records, features, CanvasConfig::default(), RenderConfig::default());
    let controller = SelectionController::new(context, VariableKey::SleepDeprivation);
    Arc::new(AppState::new(controller, std::env::temp_dir()))
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, String) {
    let response = build_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let body = response.into_body().collect().await.expect("body").to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn index_serves_page_with_current_map() {
    let (status, body) = get(state(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"id="variable-select""#));
    assert!(body.contains("legend-gradient-sleep_deprivation"));
}

#[tokio::test]
async fn selecting_a_variable_rerenders() {
    let state = state();
    let (status, svg) = get(state.clone(), "/api/map?variable=median_income").await;
    assert_eq!(status, StatusCode::OK);
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("legend-gradient-median_income"));
    assert_eq!(svg.matches("<defs>").count(), 1);

    let (_, page) = get(state, "/").await;
    assert!(page.contains(r#"<option value="median_income" selected>"#));
}

#[tokio::test]
async fn unknown_variable_is_rejected() {
    let (status, body) = get(state(), "/api/map?variable=shoe_size").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("shoe_size"));
}

#[tokio::test]
async fn hover_hit_tests_the_active_map() {
    let state = state();
    let (x, y) = {
        let controller = state.controller.lock().expect("lock");
        controller.context().projection().project(-73.95, 40.75)
    };
    let (status, body) = get(state.clone(), &format!("/api/hover?x={}&y={}", x, y)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).expect("json");
    assert_eq!(json["content"]["zipcode"], "10001");
    assert_eq!(json["transition"]["duration_ms"], 200);
    assert!(json["tooltip"]["html"].as_str().expect("html").contains("42.50"));

    let (status, body) = get(state, "/api/hover?x=-5000&y=-5000").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).expect("json");
    assert!(json["content"].is_null());
    assert_eq!(json["transition"]["duration_ms"], 500);
    assert_eq!(json["tooltip"]["opacity"], 0.0);
}
