//! Stripe adapter against a mock HTTP server

use paybridge_payments::*;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> StripeGateway {
    let config = ProviderConfig::new()
        .set("api_key", "sk_test_123")
        .set("base_url", server.uri());
    StripeGateway::from_config(&config).unwrap()
}

fn charge_body(id: &str, amount: i64) -> serde_json::Value {
    json!({
        "id": id,
        "amount": amount,
        "amount_refunded": 0,
        "currency": "usd",
        "status": "succeeded",
        "customer": "cus_123",
        "payment_method": "pm_123",
        "description": "Order #1234",
        "failure_message": null,
        "captured": true,
        "refunded": false,
        "disputed": false,
        "created": 1_700_000_000,
        "metadata": {"order": "1234"}
    })
}

#[tokio::test]
async fn test_create_charge_sends_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("amount=5000"))
        .and(body_string_contains("currency=usd"))
        .and(body_string_contains("customer=cus_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(charge_body("ch_123", 5000)))
        .expect(1)
        .mount(&server)
        .await;

    let charge = gateway(&server)
        .create_charge(
            ChargeRequest::new(Money::usd(5000))
                .customer("cus_123")
                .description("Order #1234")
                .metadata("order", "1234"),
        )
        .await
        .unwrap();

    assert_eq!(charge.id, "ch_123");
    assert_eq!(charge.amount, Money::usd(5000));
    assert_eq!(charge.status, ChargeStatus::Succeeded);
    assert_eq!(charge.customer_id.as_deref(), Some("cus_123"));
    assert_eq!(charge.provider, "stripe");
    assert_eq!(charge.metadata.get("order").map(String::as_str), Some("1234"));
}

#[tokio::test]
async fn test_missing_charge_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/charges/ch_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"type": "invalid_request_error", "message": "No such charge: 'ch_missing'"}
        })))
        .mount(&server)
        .await;

    let err = gateway(&server).get_charge("ch_missing").await.unwrap_err();
    match err {
        PaymentError::NotFound { resource, id } => {
            assert_eq!(resource, "charge");
            assert_eq!(id, "ch_missing");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_card_error_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {
                "type": "card_error",
                "code": "card_declined",
                "message": "Your card was declined."
            }
        })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_charge(ChargeRequest::new(Money::usd(5000)).source("tok_chargeDeclined"))
        .await
        .unwrap_err();

    match err {
        PaymentError::Upstream { provider, message } => {
            assert_eq!(provider, "stripe");
            assert!(message.contains("Your card was declined."));
            assert!(message.contains("402"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_charges() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/charges"))
        .and(query_param("limit", "10"))
        .and(query_param("customer", "cus_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "has_more": false,
            "data": [charge_body("ch_1", 1000), charge_body("ch_2", 2000)]
        })))
        .mount(&server)
        .await;

    let charges = gateway(&server)
        .list_charges(Some("cus_123"), 10)
        .await
        .unwrap();

    assert_eq!(charges.len(), 2);
    assert_eq!(charges[0].id, "ch_1");
    assert_eq!(charges[1].amount.amount, 2000);
}

#[tokio::test]
async fn test_service_rejects_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(charge_body("ch_1", 10)))
        .expect(0)
        .mount(&server)
        .await;

    let service = PaymentService::new(
        std::sync::Arc::new(gateway(&server)),
        std::sync::Arc::new(GatewayRegistry::with_builtin()),
    );

    // Stripe's minimum charge is 50 minor units
    let err = service
        .create_charge(ChargeRequest::new(Money::usd(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
}

#[test]
fn test_config_validation() {
    let err = StripeGateway::from_config(&ProviderConfig::new()).err().unwrap();
    assert!(matches!(err, PaymentError::Config(_)));

    let err = StripeGateway::from_config(&ProviderConfig::new().set("api_key", "pk_live_123"))
        .err()
        .unwrap();
    assert!(matches!(err, PaymentError::Config(_)));

    let err = StripeGateway::from_config(
        &ProviderConfig::new()
            .set("api_key", "sk_test_123")
            .set("base_url", "not a url"),
    )
    .err()
    .unwrap();
    assert!(matches!(err, PaymentError::Config(_)));
}

#[tokio::test]
async fn test_unsupported_currency_is_upstream_error() {
    let server = MockServer::start().await;
    let mut body = charge_body("ch_inr", 5000);
    body["currency"] = json!("inr");
    Mock::given(method("GET"))
        .and(path("/charges/ch_inr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let err = gateway(&server).get_charge("ch_inr").await.unwrap_err();
    match err {
        PaymentError::Upstream { provider, message } => {
            assert_eq!(provider, "stripe");
            assert_eq!(message, "unsupported currency 'inr'");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_ids_are_encoded_into_one_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/charges/ch_1%2F..%2Frefunds%3Flimit=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(charge_body("ch_1", 1000)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/refunds"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let charge = gateway(&server)
        .get_charge("ch_1/../refunds?limit=1")
        .await
        .unwrap();
    assert_eq!(charge.id, "ch_1");

    let err = gateway(&server).get_charge("..").await.unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
}
