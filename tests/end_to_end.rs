//! Full-stack scenarios: settings → gateway → events, and signed webhooks

use paybridge::prelude::*;
use paybridge_payments::MemoryGateway;
use paybridge_webhooks::WebhookState;
use serde_json::json;
use std::sync::Arc;

const SECRET: &str = "whsec_test";

fn settings(provider: &str) -> Settings {
    let mut settings = Settings::default();
    settings.gateway.provider = provider.to_string();
    settings.webhooks.secret = SECRET.to_string();
    settings
}

fn alpha_registry() -> GatewayRegistry {
    let mut registry = GatewayRegistry::with_builtin();
    registry.register("alpha", |config| {
        let gateway = MemoryGateway::from_config(config)?.named("alpha");
        Ok(Arc::new(gateway) as Arc<dyn PaymentGateway>)
    });
    registry
}

fn alpha_bridge() -> (PayBridge, Arc<InMemoryPublisher>) {
    let mut settings = settings("alpha");
    settings
        .gateway
        .options
        .insert("max_payment_amount".into(), json!(100_000));

    let publisher = Arc::new(InMemoryPublisher::new());
    let bridge = PayBridge::with_registry(&settings, alpha_registry(), publisher.clone()).unwrap();
    (bridge, publisher)
}

#[tokio::test]
async fn test_alpha_provider_charge_limits() {
    let (bridge, publisher) = alpha_bridge();
    let service = bridge.service();
    assert_eq!(service.provider_name(), "alpha");
    assert_eq!(service.max_payment_amount(), 100_000);

    let err = service
        .create_charge(ChargeRequest::new(Money::usd(150_000)))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
    assert!(publisher.is_empty());

    let charge = service
        .create_charge(ChargeRequest::new(Money::usd(5000)))
        .await
        .unwrap();
    assert_eq!(charge.amount.amount, 5000);

    let events = publisher.published_of_type("charge.created");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source(), "/payments/charges");
    assert_eq!(events[0].data()["amount"], 5000);
    assert_eq!(events[0].data()["charge_id"], charge.id.as_str());
    assert_eq!(publisher.len(), 1);

    let stored = bridge.pipeline().replay_store().replay_events_by_type("charge.created");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id(), events[0].id());
}

#[tokio::test]
async fn test_failed_publish_is_dead_lettered_and_retried() {
    let (bridge, publisher) = alpha_bridge();
    publisher.set_available(false);

    let charge = bridge
        .service()
        .create_charge(ChargeRequest::new(Money::usd(2500)))
        .await
        .unwrap();
    assert_eq!(charge.amount.amount, 2500);
    assert!(publisher.is_empty());

    let dead = bridge.pipeline().dead_letters().dead_letter_events();
    assert_eq!(dead.len(), 1);
    let event_id = dead[0].event.id().to_string();

    publisher.set_available(true);
    let outcome = bridge
        .pipeline()
        .retry_dead_letter(bridge.service().topic(), &event_id)
        .await
        .unwrap();
    assert!(outcome.is_published());
    assert!(bridge.pipeline().dead_letters().is_empty());
    assert_eq!(publisher.published_of_type("charge.created").len(), 1);
}

#[tokio::test]
async fn test_switching_provider_keeps_events() {
    let (bridge, publisher) = alpha_bridge();
    let service = bridge.service();

    service
        .switch_provider("memory", &ProviderConfig::new().set("max_payment_amount", 200_000))
        .unwrap();
    assert_eq!(service.provider_name(), "memory");

    service
        .create_charge(ChargeRequest::new(Money::usd(150_000)))
        .await
        .unwrap();
    assert_eq!(publisher.published_of_type("charge.created").len(), 1);
}

#[tokio::test]
async fn test_signed_webhook_is_handled() {
    let bridge =
        PayBridge::with_publisher(&settings("memory"), Arc::new(InMemoryPublisher::new())).unwrap();

    let body =
        br#"{"id":"evt_1","type":"payment_intent.succeeded","created":1700000000,"data":{}}"#;
    let header = WebhookSignature::new(SECRET).sign(body).unwrap();

    let receipt = bridge.handle_webhook(body, &header).await.unwrap();
    assert_eq!(receipt.event_id, "evt_1");
    assert_eq!(receipt.state, WebhookState::Handled);
    assert!(receipt.dispatched);
    assert!(!receipt.duplicate);
    assert_eq!(receipt.status_code(), 200);

    let again = bridge.handle_webhook(body, &header).await.unwrap();
    assert!(again.duplicate);
    assert!(!again.dispatched);
}

#[tokio::test]
async fn test_forged_webhook_is_rejected() {
    let bridge =
        PayBridge::with_publisher(&settings("memory"), Arc::new(InMemoryPublisher::new())).unwrap();
    let body =
        br#"{"id":"evt_1","type":"payment_intent.succeeded","created":1700000000,"data":{}}"#;

    let err = bridge.handle_webhook(body, "v1=deadbeef").await.unwrap_err();
    assert!(err.is_signature_error());
    assert_eq!(err.status_code(), 400);

    let now = chrono::Utc::now().timestamp();
    let err = bridge
        .handle_webhook(body, &format!("t={},v1=deadbeef", now))
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::SignatureMismatch));
    assert!(bridge.ingestor().seen().is_empty());
}

#[tokio::test]
async fn test_webhook_refreshes_charge_through_service() {
    let bridge =
        PayBridge::with_publisher(&settings("memory"), Arc::new(InMemoryPublisher::new())).unwrap();
    let charge = bridge
        .service()
        .create_charge(ChargeRequest::new(Money::usd(4200)))
        .await
        .unwrap();

    let body = serde_json::to_vec(&json!({
        "id": "evt_2",
        "type": "charge.succeeded",
        "created": 1700000000,
        "data": {"object": {"id": charge.id, "amount": 1}}
    }))
    .unwrap();
    let header = WebhookSignature::new(SECRET).sign(&body).unwrap();

    let receipt = bridge.handle_webhook(&body, &header).await.unwrap();
    assert_eq!(receipt.state, WebhookState::Handled);

    // The payload amount is never written back
    let stored = bridge.service().get_charge(&charge.id).await.unwrap();
    assert_eq!(stored.amount.amount, 4200);
}
