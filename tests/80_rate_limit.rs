mod common;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use common::{test_config, TestApp};
use std::net::SocketAddr;

fn limited_app(max_requests: u32, trust_forwarded_for: bool) -> TestApp {
    let mut config = test_config();
    config.api.enable_rate_limiting = true;
    config.api.rate_limit_requests = max_requests;
    config.api.rate_limit_window_secs = 60;
    config.api.trust_forwarded_for = trust_forwarded_for;
    TestApp::with_config(config)
}

fn from_peer(app: &TestApp, peer: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let addr: SocketAddr = format!("{}:40000", peer).parse().unwrap();
    let mut builder = Request::builder()
        .uri(format!("{}/classes", app.base))
        .extension(ConnectInfo(addr));
    if let Some(forwarded_for) = forwarded_for {
        builder = builder.header("x-forwarded-for", forwarded_for);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn clients_are_limited_per_window() {
    let app = limited_app(3, false);

    for _ in 0..3 {
        let (status, _) = app.send(from_peer(&app, "203.0.113.7", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = {
        use tower::ServiceExt;
        app.router
            .clone()
            .oneshot(from_peer(&app, "203.0.113.7", None))
            .await
            .unwrap()
    };
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));

    let (status, body) = app.send(from_peer(&app, "203.0.113.7", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");

    // a different client still gets through
    let (status, _) = app.send(from_peer(&app, "198.51.100.2", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rotated_forwarded_for_is_still_limited() {
    let app = limited_app(2, false);

    let mut statuses = Vec::new();
    for spoofed in ["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4"] {
        let (status, _) = app.send(from_peer(&app, "203.0.113.7", Some(spoofed))).await;
        statuses.push(status);
    }
    assert_eq!(
        statuses,
        vec![
            StatusCode::OK,
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

#[tokio::test]
async fn trusted_proxy_limits_by_forwarded_client() {
    let app = limited_app(1, true);
    let proxy = "10.0.0.2";

    let (status, _) = app.send(from_peer(&app, proxy, Some("203.0.113.7"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(from_peer(&app, proxy, Some("203.0.113.7"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // a client-supplied first hop does not change the proxy-appended last one
    let (status, _) = app
        .send(from_peer(&app, proxy, Some("9.9.9.9, 203.0.113.7")))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = app.send(from_peer(&app, proxy, Some("198.51.100.2"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn disabled_limiter_lets_everything_through() {
    let app = TestApp::new();
    for _ in 0..20 {
        let (status, _) = app.send(from_peer(&app, "203.0.113.7", None)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
