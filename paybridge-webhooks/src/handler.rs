//! Per-kind webhook handlers

use crate::error::HandlerError;
use crate::event::{WebhookEvent, WebhookEventKind};
use async_trait::async_trait;

pub type HandlerResult = std::result::Result<(), HandlerError>;

/// One method per routed event kind.
///
/// Every method defaults to accepting the event, so implementors override
/// only what they care about. Concurrent deliveries of one id are serialized
/// by the ingestor, but a delivery whose handler failed is run again on
/// redelivery, so implementations must be idempotent.
#[async_trait]
pub trait WebhookHandlers: Send + Sync {
    async fn payment_intent_succeeded(&self, _event: &WebhookEvent) -> HandlerResult {
        Ok(())
    }

    async fn payment_intent_failed(&self, _event: &WebhookEvent) -> HandlerResult {
        Ok(())
    }

    async fn charge_succeeded(&self, _event: &WebhookEvent) -> HandlerResult {
        Ok(())
    }

    async fn charge_failed(&self, _event: &WebhookEvent) -> HandlerResult {
        Ok(())
    }

    async fn charge_refunded(&self, _event: &WebhookEvent) -> HandlerResult {
        Ok(())
    }

    async fn dispute_created(&self, _event: &WebhookEvent) -> HandlerResult {
        Ok(())
    }

    async fn dispute_closed(&self, _event: &WebhookEvent) -> HandlerResult {
        Ok(())
    }
}

/// Accepts every event without doing anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandlers;

impl WebhookHandlers for NoopHandlers {}

/// Call the handler method for `kind`
pub async fn dispatch(
    handlers: &dyn WebhookHandlers,
    kind: WebhookEventKind,
    event: &WebhookEvent,
) -> HandlerResult {
    match kind {
        WebhookEventKind::PaymentIntentSucceeded => handlers.payment_intent_succeeded(event).await,
        WebhookEventKind::PaymentIntentFailed => handlers.payment_intent_failed(event).await,
        WebhookEventKind::ChargeSucceeded => handlers.charge_succeeded(event).await,
        WebhookEventKind::ChargeFailed => handlers.charge_failed(event).await,
        WebhookEventKind::ChargeRefunded => handlers.charge_refunded(event).await,
        WebhookEventKind::DisputeCreated => handlers.dispute_created(event).await,
        WebhookEventKind::DisputeClosed => handlers.dispute_closed(event).await,
    }
}
