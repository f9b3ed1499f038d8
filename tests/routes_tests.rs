// tests/routes_tests.rs
use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::routing::get;
use std::time::Duration;
use tower::ServiceExt;

use sync_ci::server::{SYNC_ACK, apply_middleware, build_router, routes};

mod helpers;
use helpers::{lazy_state, server_settings};

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, body)
}

fn sync_request(body: Body) -> Request<Body> {
    Request::post("/api/v1/ci/job/sync")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn ping_returns_pong_every_time() {
    let router = build_router(lazy_state(), &server_settings(0));

    for _ in 0..5 {
        let (status, body) = send(
            router.clone(),
            Request::get("/ping").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"pong");
    }
}

#[tokio::test]
async fn sync_with_empty_body_acknowledges() {
    let router = build_router(lazy_state(), &server_settings(0));

    let (status, body) = send(router, sync_request(Body::empty())).await;

    assert_eq!(status, StatusCode::OK);
    let ack: String = serde_json::from_slice(&body).expect("json string");
    assert_eq!(ack, SYNC_ACK);
    assert_eq!(ack, "resource");
}

#[tokio::test]
async fn sync_ignores_payload() {
    let router = build_router(lazy_state(), &server_settings(0));

    let (empty_status, empty_body) = send(router.clone(), sync_request(Body::empty())).await;

    let payload = serde_json::json!({
        "job": "tidb_ghpr_unit_test",
        "build": 58291,
        "params": { "ghprbActualCommit": "deadbeef" }
    });
    let (json_status, json_body) = send(
        router.clone(),
        sync_request(Body::from(payload.to_string())),
    )
    .await;

    let (garbage_status, garbage_body) = send(
        router,
        sync_request(Body::from("definitely { not json")),
    )
    .await;

    assert_eq!(empty_status, StatusCode::OK);
    assert_eq!(json_status, StatusCode::OK);
    assert_eq!(garbage_status, StatusCode::OK);
    assert_eq!(empty_body, json_body);
    assert_eq!(empty_body, garbage_body);
}

#[tokio::test]
async fn sync_acknowledges_bodies_past_the_default_limit() {
    let router = build_router(lazy_state(), &server_settings(0));
    let payload = vec![b'x'; 3 * 1024 * 1024];

    let request = Request::post("/api/v1/ci/job/sync")
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let (status, body) = send(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let ack: String = serde_json::from_slice(&body).expect("json string");
    assert_eq!(ack, SYNC_ACK);
}

#[tokio::test]
async fn sync_route_only_accepts_post() {
    let router = build_router(lazy_state(), &server_settings(0));

    let (status, _) = send(
        router,
        Request::get("/api/v1/ci/job/sync").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let router = build_router(lazy_state(), &server_settings(0));

    let (status, _) = send(
        router,
        Request::post("/api/v1/ci/job/unknown").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn routes_without_middleware_serve_the_same_answers() {
    let router = routes(lazy_state());

    let (status, body) = send(
        router,
        Request::get("/ping").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"pong");
}

#[tokio::test]
async fn handler_panic_becomes_internal_server_error() {
    async fn boom() -> &'static str {
        panic!("handler blew up");
    }
    let router = apply_middleware(Router::new().route("/boom", get(boom)), &server_settings(0));

    let (status, _) = send(
        router,
        Request::get("/boom").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test(start_paused = true)]
async fn slow_handler_hits_write_timeout() {
    async fn stall() -> &'static str {
        tokio::time::sleep(Duration::from_secs(60)).await;
        "too late"
    }
    let router = apply_middleware(Router::new().route("/stall", get(stall)), &server_settings(0));

    let (status, _) = send(
        router,
        Request::get("/stall").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}
