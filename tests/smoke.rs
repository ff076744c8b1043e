use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::test::{call_service, init_service, read_body, TestRequest};
use actix_web::{web, App};
use bid_ingress::broker::QueueBroker;
use bid_ingress::jwt::JwtAuth;
use bid_ingress::routing::BidRouter;
use bid_ingress::test_support::broker::{BrokerCall, InMemoryBroker};
use bid_ingress::test_support::common::{
    init_tracing_for_tests, test_issue_token, TEST_AUTH_SECRET,
};
use serde_json::json;

macro_rules! test_app {
    ($broker:expr) => {{
        init_tracing_for_tests();
        let broker: Arc<dyn QueueBroker> = $broker.clone();
        init_service(
            App::new()
                .app_data(web::Data::new(BidRouter::new(broker)))
                .configure(|cfg| {
                    bid_ingress::configure_routes(cfg, JwtAuth::new(TEST_AUTH_SECRET))
                }),
        )
        .await
    }};
}

fn bearer() -> String {
    let token = test_issue_token("bidder-1", "bidder@example.com", 3600, TEST_AUTH_SECRET);
    format!("Bearer {token}")
}

fn post_bid(body: serde_json::Value) -> TestRequest {
    TestRequest::post()
        .uri("/bid")
        .insert_header(("Authorization", bearer()))
        .set_json(body)
}

async fn body_text<B: MessageBody>(res: ServiceResponse<B>) -> String {
    String::from_utf8_lossy(&read_body(res).await).into_owned()
}

#[actix_web::test]
async fn blank_item_id_is_rejected_before_the_broker() {
    let broker = Arc::new(InMemoryBroker::with_queues(["bid"]));
    let app = test_app!(broker);

    for body in [
        json!({ "ItemId": "" }),
        json!({ "ItemId": "   " }),
        json!({ "amount": 10 }),
        serde_json::Value::Null,
    ] {
        let res = call_service(&app, post_bid(body.clone()).to_request()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(
            body_text(res).await,
            "Invalid bid. Missing ItemId or bid details."
        );
    }

    assert!(broker.calls().is_empty());
}

#[actix_web::test]
async fn malformed_body_is_a_bad_request() {
    let broker = Arc::new(InMemoryBroker::new());
    let app = test_app!(broker);

    for payload in ["{ not json", "[1, 2, 3]", "{\"ItemId\": 42}", ""] {
        let req = TestRequest::post()
            .uri("/bid")
            .insert_header(("Authorization", bearer()))
            .insert_header(("Content-Type", "application/json"))
            .set_payload(payload)
            .to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "payload: {payload:?}");
    }

    assert!(broker.calls().is_empty());
}

#[actix_web::test]
async fn missing_queue_is_not_found_and_nothing_is_published() {
    let broker = Arc::new(InMemoryBroker::new());
    let app = test_app!(broker);

    let res = call_service(
        &app,
        post_bid(json!({ "ItemId": "item42", "amount": 10 })).to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let text = body_text(res).await;
    assert!(text.contains("item42"), "unexpected body: {text}");
    assert_eq!(
        broker.calls(),
        vec![BrokerCall::CheckExists("item42bid".to_string())]
    );
    assert!(broker.queue_names().is_empty());
}

#[actix_web::test]
async fn existing_queue_receives_exactly_one_message() -> anyhow::Result<()> {
    let broker = Arc::new(InMemoryBroker::with_queues(["item42bid"]));
    let app = test_app!(broker);

    let res = call_service(
        &app,
        post_bid(json!({ "ItemId": "item42", "amount": 10 })).to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "Bid routed successfully.");

    let published = broker.published("item42bid");
    assert_eq!(published.len(), 1);
    let decoded: serde_json::Value = serde_json::from_slice(&published[0])?;
    assert_eq!(decoded, json!({ "ItemId": "item42", "amount": 10 }));
    Ok(())
}

#[actix_web::test]
async fn existence_check_failure_is_a_server_error() {
    let broker = Arc::new(InMemoryBroker::with_queues(["item42bid"]));
    broker.fail_existence_checks();
    let app = test_app!(broker);

    let res = call_service(
        &app,
        post_bid(json!({ "ItemId": "item42", "amount": 10 })).to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(res).await, "Failed to route bid.");
    assert_eq!(broker.publish_attempts(), 0);
}

#[actix_web::test]
async fn publish_failure_is_a_server_error_after_one_check() {
    let broker = Arc::new(InMemoryBroker::with_queues(["item42bid"]));
    broker.fail_publishes();
    let app = test_app!(broker);

    let res = call_service(
        &app,
        post_bid(json!({ "ItemId": "item42", "amount": 10 })).to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        broker.calls(),
        vec![
            BrokerCall::CheckExists("item42bid".to_string()),
            BrokerCall::Publish("item42bid".to_string()),
        ]
    );
}

#[actix_web::test]
async fn bid_endpoint_requires_a_valid_token() {
    let broker = Arc::new(InMemoryBroker::with_queues(["item42bid"]));
    let app = test_app!(broker);

    let anonymous = TestRequest::post()
        .uri("/bid")
        .set_json(json!({ "ItemId": "item42" }))
        .to_request();
    let res = call_service(&app, anonymous).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let forged = test_issue_token("bidder-1", "bidder@example.com", 3600, "other-secret");
    let req = TestRequest::post()
        .uri("/bid")
        .insert_header(("Authorization", format!("Bearer {forged}")))
        .set_json(json!({ "ItemId": "item42" }))
        .to_request();
    let res = call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = test_issue_token("bidder-1", "bidder@example.com", -3600, TEST_AUTH_SECRET);
    let req = TestRequest::post()
        .uri("/bid")
        .insert_header(("Authorization", format!("Bearer {expired}")))
        .set_json(json!({ "ItemId": "item42" }))
        .to_request();
    let res = call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    assert!(broker.calls().is_empty());
}

#[actix_web::test]
async fn version_is_served_anonymously() {
    let broker = Arc::new(InMemoryBroker::new());
    let app = test_app!(broker);

    let res = call_service(&app, TestRequest::get().uri("/bid/version").to_request()).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_text(res).await,
        format!("bid-ingress {}", env!("CARGO_PKG_VERSION"))
    );
    assert!(broker.calls().is_empty());
}

#[actix_web::test]
async fn routed_payload_is_the_received_document() {
    let broker = Arc::new(InMemoryBroker::with_queues(["item42bid"]));
    let app = test_app!(broker);
    let body = r#"{"amount": 123456789012345678901234567890, "price": 10.50, "ItemId": "item42"}"#;

    let req = TestRequest::post()
        .uri("/bid")
        .insert_header(("Authorization", bearer()))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
        .to_request();
    let res = call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        broker.published("item42bid"),
        vec![br#"{"amount":123456789012345678901234567890,"price":10.50,"ItemId":"item42"}"#.to_vec()]
    );
}

#[actix_web::test]
async fn lower_camel_item_id_is_routed() {
    let broker = Arc::new(InMemoryBroker::with_queues(["item42bid"]));
    let app = test_app!(broker);

    let res = call_service(&app, post_bid(json!({ "itemId": "item42" })).to_request()).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(broker.published("item42bid").len(), 1);
}

#[actix_web::test]
async fn over_long_item_id_is_not_found_and_gateway_keeps_serving() {
    let broker = Arc::new(InMemoryBroker::with_queues(["item42bid"]));
    let app = test_app!(broker);

    let long_id = "x".repeat(300);
    let res = call_service(&app, post_bid(json!({ "ItemId": long_id })).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(broker.publish_attempts(), 0);

    let res = call_service(&app, post_bid(json!({ "ItemId": "item42" })).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
}
