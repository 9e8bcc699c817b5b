//! Webhook handlers backed by the payment service
//!
//! Webhook payloads are notifications, not state. Each handler re-reads the
//! charge or dispute through the active gateway and logs what it finds.

use async_trait::async_trait;
use paybridge_payments::{PaymentError, PaymentService};
use paybridge_webhooks::{HandlerError, HandlerResult, WebhookEvent, WebhookHandlers};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PaymentWebhookHandlers {
    service: Arc<PaymentService>,
}

impl PaymentWebhookHandlers {
    pub fn new(service: Arc<PaymentService>) -> Self {
        Self { service }
    }

    async fn refresh_charge(&self, event: &WebhookEvent, charge_id: Option<&str>) -> HandlerResult {
        let Some(charge_id) = charge_id else {
            debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "webhook carries no charge id"
            );
            return Ok(());
        };

        match self.service.get_charge(charge_id).await {
            Ok(charge) => {
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    charge_id = %charge.id,
                    status = charge.status.as_str(),
                    amount = charge.amount.amount,
                    amount_refunded = charge.amount_refunded,
                    disputed = charge.disputed,
                    provider = %charge.provider,
                    "charge state refreshed"
                );
                Ok(())
            }
            Err(err) => unresolved(event, "charge", charge_id, err),
        }
    }

    async fn refresh_dispute(&self, event: &WebhookEvent) -> HandlerResult {
        let Some(dispute_id) = event.object_id() else {
            debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "webhook carries no dispute id"
            );
            return Ok(());
        };

        match self.service.get_dispute(dispute_id).await {
            Ok(dispute) => {
                info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    dispute_id = %dispute.id,
                    charge_id = %dispute.charge_id,
                    status = dispute.status.as_str(),
                    final_state = dispute.status.is_final(),
                    "dispute state refreshed"
                );
                Ok(())
            }
            Err(err) => unresolved(event, "dispute", dispute_id, err),
        }
    }

    fn intent(&self, event: &WebhookEvent, outcome: &str) {
        info!(
            event_id = %event.id,
            payment_intent = event.object_id().unwrap_or_default(),
            status = event.object_str("status").unwrap_or(outcome),
            "payment intent {}",
            outcome
        );
    }
}

/// Records the gateway does not know are skipped; anything else asks the
/// processor to redeliver.
fn unresolved(event: &WebhookEvent, resource: &str, id: &str, err: PaymentError) -> HandlerResult {
    match err {
        PaymentError::NotFound { .. } | PaymentError::NotSupported { .. } => {
            warn!(
                event_id = %event.id,
                resource,
                id,
                error = %err,
                "webhook object not available from gateway"
            );
            Ok(())
        }
        err => Err(HandlerError::from(format!("failed to load {} {}: {}", resource, id, err))),
    }
}

#[async_trait]
impl WebhookHandlers for PaymentWebhookHandlers {
    async fn payment_intent_succeeded(&self, event: &WebhookEvent) -> HandlerResult {
        self.intent(event, "succeeded");
        self.refresh_charge(event, event.object_str("latest_charge")).await
    }

    async fn payment_intent_failed(&self, event: &WebhookEvent) -> HandlerResult {
        self.intent(event, "failed");
        self.refresh_charge(event, event.object_str("latest_charge")).await
    }

    async fn charge_succeeded(&self, event: &WebhookEvent) -> HandlerResult {
        self.refresh_charge(event, event.object_id()).await
    }

    async fn charge_failed(&self, event: &WebhookEvent) -> HandlerResult {
        self.refresh_charge(event, event.object_id()).await
    }

    async fn charge_refunded(&self, event: &WebhookEvent) -> HandlerResult {
        self.refresh_charge(event, event.object_id()).await
    }

    async fn dispute_created(&self, event: &WebhookEvent) -> HandlerResult {
        self.refresh_dispute(event).await
    }

    async fn dispute_closed(&self, event: &WebhookEvent) -> HandlerResult {
        self.refresh_dispute(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paybridge_payments::{
        ChargeRequest, GatewayRegistry, MemoryGateway, Money, PaymentGateway, PaymentResult,
        GatewayCapabilities, Charge, Customer, CustomerRequest,
    };
    use serde_json::json;

    fn service() -> Arc<PaymentService> {
        Arc::new(PaymentService::new(
            Arc::new(MemoryGateway::new()),
            Arc::new(GatewayRegistry::with_builtin()),
        ))
    }

    struct DownGateway(GatewayCapabilities);

    #[async_trait]
    impl PaymentGateway for DownGateway {
        fn provider_name(&self) -> &str {
            "down"
        }

        fn capabilities(&self) -> &GatewayCapabilities {
            &self.0
        }

        async fn create_customer(&self, _request: CustomerRequest) -> PaymentResult<Customer> {
            Err(PaymentError::Network("unreachable".into()))
        }

        async fn get_customer(&self, _id: &str) -> PaymentResult<Customer> {
            Err(PaymentError::Network("unreachable".into()))
        }

        async fn create_charge(&self, _request: ChargeRequest) -> PaymentResult<Charge> {
            Err(PaymentError::Network("unreachable".into()))
        }

        async fn get_charge(&self, _id: &str) -> PaymentResult<Charge> {
            Err(PaymentError::Network("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_charge_refreshed() {
        let service = service();
        let charge = service
            .create_charge(ChargeRequest::new(Money::usd(1500)))
            .await
            .unwrap();
        let handlers = PaymentWebhookHandlers::new(service);

        let event = WebhookEvent::new("evt_1", "charge.succeeded")
            .with_data(json!({"object": {"id": charge.id}}));
        assert!(handlers.charge_succeeded(&event).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_objects_are_skipped() {
        let handlers = PaymentWebhookHandlers::new(service());

        let event = WebhookEvent::new("evt_2", "charge.refunded")
            .with_data(json!({"object": {"id": "ch_unknown"}}));
        assert!(handlers.charge_refunded(&event).await.is_ok());

        let event = WebhookEvent::new("evt_3", "charge.dispute.created")
            .with_data(json!({"object": {"id": "dp_unknown"}}));
        assert!(handlers.dispute_created(&event).await.is_ok());

        let event = WebhookEvent::new("evt_4", "payment_intent.succeeded");
        assert!(handlers.payment_intent_succeeded(&event).await.is_ok());
    }

    #[tokio::test]
    async fn test_gateway_failure_requests_redelivery() {
        let gateway = DownGateway(GatewayCapabilities::builder().build());
        let service = Arc::new(PaymentService::new(
            Arc::new(gateway),
            Arc::new(GatewayRegistry::new()),
        ));
        let handlers = PaymentWebhookHandlers::new(service);

        let event = WebhookEvent::new("evt_5", "charge.failed")
            .with_data(json!({"object": {"id": "ch_1"}}));
        let err = handlers.charge_failed(&event).await.unwrap_err();
        assert!(err.to_string().contains("ch_1"));
    }
}
