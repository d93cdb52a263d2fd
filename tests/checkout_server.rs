//! End-to-end tests against the real router and a bound listener.

use std::time::Duration;

use axum::http::StatusCode;

use wide_events::checkout::PaymentErrorCode;
use wide_events::event::MemorySink;
use wide_events::http::{HttpServer, X_REQUEST_ID, X_USER_ID};
use wide_events::lifecycle::Shutdown;
use wide_events::simulator::send_checkout;

mod common;

#[tokio::test]
async fn test_checkout_route_emits_consistent_events() {
    let sink = MemorySink::new();
    let server = HttpServer::with_emitter(common::test_config(), common::memory_emitter(&sink));
    let app = server.router();

    for i in 0..20 {
        let user = format!("user_{}", 1000 + i);
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/checkout")
            .header(X_USER_ID, user.as_str())
            .body(axum::body::Body::empty())
            .unwrap();
        let response = common::send(&app, request).await;
        let status = response.status();
        let request_id = response
            .headers()
            .get(X_REQUEST_ID)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = common::json_body(response).await;

        let events = sink.for_request(&request_id);
        assert_eq!(events.len(), 1);
        let fields = &events[0].fields;
        assert_eq!(fields["user_id"], user);
        assert_eq!(fields["action"], "checkout");
        assert_eq!(fields["http_status"], status.as_str());
        assert_eq!(body["cart_id"], fields["cart_id"].as_str());
        assert!(fields.contains_key("ff_new_checkout_flow"));

        match status {
            StatusCode::OK => {
                assert_eq!(fields["outcome"], "success");
                assert_eq!(body["success"], true);
                assert_eq!(body["total_cents"].to_string(), fields["cart_total_cents"]);
                assert!(!fields.contains_key("error_code"));
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                assert_eq!(fields["outcome"], "error");
                assert_eq!(body["success"], false);
                assert_eq!(body["error"], fields["error_code"].as_str());
                assert_eq!(body["request_id"], request_id.as_str());
                let code: PaymentErrorCode =
                    serde_json::from_value(body["error"].clone()).unwrap();
                assert_eq!(fields["error_retriable"], code.is_retriable().to_string());
            }
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(sink.len(), 20);
}

#[tokio::test]
async fn test_health_is_not_instrumented() {
    let sink = MemorySink::new();
    let server = HttpServer::with_emitter(common::test_config(), common::memory_emitter(&sink));
    let response = common::send(&server.router(), common::get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_served_over_tcp() {
    let sink = MemorySink::new();
    let server = HttpServer::with_emitter(common::test_config(), common::memory_emitter(&sink));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let url = format!("http://{}/checkout", addr);
    let (status, body) = send_checkout(&client, &url, Some("user_7777"))
        .await
        .expect("service unreachable");

    assert!(status == StatusCode::OK || status == StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body.success, status == StatusCode::OK);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].fields["user_id"], "user_7777");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not shut down")
        .unwrap()
        .unwrap();
}
