//! Feature gate middleware tests
//!
//! Drives gated routes end to end: check before the handler, typed denials,
//! and usage recorded only for 2xx responses.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::Router;
use tower::ServiceExt;

use common::{counter_row, engine};
use plaza_axum::{FeatureGateLayer, CALLER_ID_HEADER};
use plaza_db::UsageRepository;
use plaza_entitlement_core::{UsageRecorder, UsageRecorderHandle};
use plaza_types::{Feature, Period, UserId};

async fn ok_handler() -> &'static str {
    "ok"
}

async fn failing_handler() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

struct Gate {
    env: common::TestEngine,
    app: Router,
    recorder: UsageRecorder,
    handle: UsageRecorderHandle,
}

/// Build a router with one gated route
fn gated(feature: Feature, handler: axum::routing::MethodRouter) -> Gate {
    let env = engine();
    let (recorder, handle) = UsageRecorder::new(env.lifecycle.clone(), 64);

    let app = Router::new().route("/action", handler).route_layer(
        FeatureGateLayer::new(env.guard.clone(), recorder.clone(), feature),
    );

    Gate {
        env,
        app,
        recorder,
        handle,
    }
}

impl Gate {
    async fn send(&self, user: Option<&str>) -> axum::response::Response {
        let mut builder = Request::builder().method("POST").uri("/action");
        if let Some(user) = user {
            builder = builder.header(CALLER_ID_HEADER, user);
        }
        let request = builder.body(Body::empty()).unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Drop every recorder sender and wait for the background task to drain
    async fn drain(self) -> common::TestEngine {
        let Self {
            env,
            app,
            recorder,
            handle,
        } = self;
        drop(app);
        drop(recorder);
        handle.shutdown().await;
        env
    }
}

async fn error_code(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    value["error"]["code"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_allowed_request_records_usage() {
    let gate = gated(Feature::Services, post(ok_handler));
    let user = UserId::new();

    let response = gate.send(Some(&user.to_string())).await;
    assert_eq!(response.status(), StatusCode::OK);

    let env = gate.drain().await;
    let counter = env
        .usage
        .find(user.0, "services", &Period::current().to_string())
        .await
        .unwrap()
        .expect("usage counter was created");
    assert_eq!(counter.used, 1);
}

#[tokio::test]
async fn test_failed_action_does_not_consume_budget() {
    let gate = gated(Feature::Services, post(failing_handler));
    let user = UserId::new();

    let response = gate.send(Some(&user.to_string())).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let env = gate.drain().await;
    let counter = env
        .usage
        .find(user.0, "services", &Period::current().to_string())
        .await
        .unwrap();
    assert_eq!(counter.map(|row| row.used).unwrap_or(0), 0);
}

#[tokio::test]
async fn test_exhausted_budget_is_429_with_reason_code() {
    let gate = gated(Feature::Services, post(ok_handler));
    let user = UserId::new();

    gate.env.usage.insert(counter_row(
        user.0,
        "services",
        &Period::current().to_string(),
        3,
        3,
    ));

    let response = gate.send(Some(&user.to_string())).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(response).await, "USAGE_EXCEEDED");

    // The denied request neither ran the handler nor consumed budget
    let env = gate.drain().await;
    let counter = env
        .usage
        .find(user.0, "services", &Period::current().to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counter.used, 3);
}

#[tokio::test]
async fn test_capability_denial_is_403() {
    let gate = gated(Feature::Analytics, post(ok_handler));
    let user = UserId::new();

    let response = gate.send(Some(&user.to_string())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(response).await, "PLAN_LACKS_CAPABILITY");
}

#[tokio::test]
async fn test_missing_caller_header_is_401() {
    let gate = gated(Feature::Services, post(ok_handler));

    let response = gate.send(None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "CALLER_ID_REQUIRED");
}

#[tokio::test]
async fn test_malformed_caller_header_is_400() {
    let gate = gated(Feature::Services, post(ok_handler));

    let response = gate.send(Some("not-a-user-id")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "CALLER_ID_INVALID");
}

#[tokio::test]
async fn test_capability_only_gate_tracks_no_usage() {
    let gate = gated(Feature::Messaging, post(ok_handler));
    let user = UserId::new();

    let response = gate.send(Some(&user.to_string())).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Messaging carries no limit; the recorder ignores the event and no
    // counter appears.
    let env = gate.drain().await;
    assert_eq!(env.usage.count(), 0);
}
