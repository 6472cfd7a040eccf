//! HTTP API tests
//!
//! Exercise the router in-process with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tapcoach_common::config::TomlConfig;
use tapcoach_common::{Channel, ControlMessage};
use tapcoach_engine::api::{build_router, AppContext};
use tapcoach_engine::control_loop::LoopClock;
use tapcoach_engine::hardware::{LogIndicators, SensorBus, VirtualPads};
use tapcoach_engine::notifier::EventBroadcaster;
use tapcoach_engine::session::SessionController;
use tapcoach_engine::SharedState;
use tokio::sync::mpsc;
use tower::ServiceExt;

struct TestApp {
    router: axum::Router,
    inbound: mpsc::UnboundedReceiver<ControlMessage>,
    pads: Arc<VirtualPads>,
}

fn setup() -> TestApp {
    let events = EventBroadcaster::new(16);
    let controller = SessionController::from_config(
        &TomlConfig::default(),
        Arc::new(events.clone()),
        Arc::new(LogIndicators::new()),
    )
    .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let pads = Arc::new(VirtualPads::new(LoopClock::new(), 60_000));
    let ctx = AppContext {
        state: Arc::new(SharedState::new(controller.snapshot())),
        events,
        inbound: tx,
        pads: pads.clone(),
    };

    TestApp {
        router: build_router(ctx),
        inbound: rx,
        pads,
    }
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup();
    let response = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "tapcoach-engine");
    assert_eq!(json["clients"], 0);
}

#[tokio::test]
async fn test_status_reports_idle_defaults() {
    let app = setup();
    let response = app.router.oneshot(get("/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["state"], "idle");
    assert_eq!(json["rhythm"], "4/4");
    assert_eq!(json["bpm"], 120);
    assert_eq!(json["beat_interval_ms"], 500);
    assert_eq!(json["window_open"], false);
    assert!(json["updated_at"].is_string());
}

#[tokio::test]
async fn test_post_message_queues_configuration() {
    let mut app = setup();
    let response = app
        .router
        .oneshot(post("/message", r#"{"bpm":90,"rhythm":"3/4"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    match app.inbound.try_recv().unwrap() {
        ControlMessage::Configure(update) => {
            assert_eq!(update.bpm, Some(90));
            assert_eq!(update.rhythm.as_deref(), Some("3/4"));
            assert_eq!(update.target_accuracy, None);
        }
        other => panic!("expected configuration, got {:?}", other),
    }
}

#[tokio::test]
async fn test_post_message_queues_end_session() {
    let mut app = setup();
    let response = app
        .router
        .oneshot(post("/message", r#"{"command":"endSession"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(matches!(
        app.inbound.try_recv().unwrap(),
        ControlMessage::EndSession
    ));
}

#[tokio::test]
async fn test_malformed_message_is_rejected() {
    let mut app = setup();
    for body in ["not json", r#"{"bpm":"fast"}"#, "[1,2]"] {
        let response = app.router.clone().oneshot(post("/message", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        let json = extract_json(response.into_body()).await;
        assert!(json["error"].is_string());
    }
    assert!(app.inbound.try_recv().is_err());
}

#[tokio::test]
async fn test_message_rejected_when_loop_is_gone() {
    let app = setup();
    drop(app.inbound);
    let response = app.router.oneshot(post("/message", "{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_strike_pad_holds_channel_high() {
    let app = setup();
    let response = app
        .router
        .oneshot(post("/pads/snare", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = extract_json(response.into_body()).await;
    assert_eq!(json["struck"], "snare");
    assert!(app.pads.read_digital(Channel::Snare));
    assert!(!app.pads.read_digital(Channel::Kick));
}

#[tokio::test]
async fn test_strike_unknown_pad_is_not_found() {
    let app = setup();
    let response = app
        .router
        .oneshot(post("/pads/hihat", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
