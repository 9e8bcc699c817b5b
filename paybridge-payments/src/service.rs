//! Unified payment service
//!
//! [`PaymentService`] fronts whichever gateway is active. It rejects requests
//! the gateway's capabilities rule out before any provider call, bounds each
//! call with a timeout, and publishes a `<resource>.created` event after every
//! successful create. Event publishing is best effort: a failure is logged and
//! the operation's result is returned unchanged.

use crate::capabilities::{Feature, GatewayCapabilities};
use crate::config::ProviderConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::money::Currency;
use crate::provider::PaymentGateway;
use crate::registry::GatewayRegistry;
use crate::types::*;
use paybridge_events::{
    DEFAULT_TOPIC, EnvelopeBuilder, EventEnvelope, EventPipeline, PublishOutcome,
};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default deadline for a single adapter call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider-neutral payment operations over a swappable gateway.
pub struct PaymentService {
    gateway: RwLock<Arc<dyn PaymentGateway>>,
    registry: Arc<GatewayRegistry>,
    events: Option<EventPipeline>,
    topic: String,
    call_timeout: Duration,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, registry: Arc<GatewayRegistry>) -> Self {
        Self {
            gateway: RwLock::new(gateway),
            registry,
            events: None,
            topic: DEFAULT_TOPIC.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Build the initial gateway from the registry
    pub fn from_registry(
        registry: Arc<GatewayRegistry>,
        provider: &str,
        config: &ProviderConfig,
    ) -> PaymentResult<Self> {
        let gateway = registry.create(provider, config)?;
        Ok(Self::new(gateway, registry))
    }

    pub fn with_events(mut self, pipeline: EventPipeline) -> Self {
        self.events = Some(pipeline);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn events(&self) -> Option<&EventPipeline> {
        self.events.as_ref()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Snapshot of the active gateway
    pub fn gateway(&self) -> Arc<dyn PaymentGateway> {
        self.gateway.read().clone()
    }

    // Provider management

    /// Replace the active gateway with a freshly built one.
    ///
    /// Calls already in flight finish against the previous gateway.
    pub fn switch_provider(&self, provider: &str, config: &ProviderConfig) -> PaymentResult<()> {
        let gateway = self.registry.create(provider, config)?;
        self.set_gateway(gateway);
        Ok(())
    }

    pub fn set_gateway(&self, gateway: Arc<dyn PaymentGateway>) {
        let name = gateway.provider_name().to_string();
        let previous = std::mem::replace(&mut *self.gateway.write(), gateway);
        info!(from = previous.provider_name(), to = %name, "switched payment provider");
    }

    pub fn provider_name(&self) -> String {
        self.gateway().provider_name().to_string()
    }

    pub fn available_providers(&self) -> Vec<String> {
        self.registry.providers()
    }

    // Capability queries

    pub fn capabilities(&self) -> GatewayCapabilities {
        self.gateway().capabilities().clone()
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.gateway().capabilities().supports(feature)
    }

    pub fn supported_currencies(&self) -> Vec<Currency> {
        self.gateway()
            .capabilities()
            .supported_currencies()
            .iter()
            .copied()
            .collect()
    }

    pub fn supported_countries(&self) -> Vec<String> {
        self.gateway()
            .capabilities()
            .supported_countries()
            .iter()
            .cloned()
            .collect()
    }

    pub fn min_payment_amount(&self) -> i64 {
        self.gateway().capabilities().min_payment_amount()
    }

    pub fn max_payment_amount(&self) -> i64 {
        self.gateway().capabilities().max_payment_amount()
    }

    /// Check a charge against the active gateway without calling it
    pub fn validate_charge(&self, request: &ChargeRequest) -> PaymentResult<()> {
        validate_charge(self.gateway().capabilities(), request)
    }

    // Customers

    pub async fn create_customer(&self, request: CustomerRequest) -> PaymentResult<Customer> {
        let gateway = self.gateway();
        let customer = self
            .call(&*gateway, "create_customer", gateway.create_customer(request))
            .await?;

        self.emit(
            EventEnvelope::builder("customer.created", "/payments/customers")
                .field("customer_id", customer.id.clone())
                .field("email", customer.email.clone())
                .field("name", customer.name.clone()),
        )
        .await;
        Ok(customer)
    }

    pub async fn get_customer(&self, id: &str) -> PaymentResult<Customer> {
        let gateway = self.gateway();
        self.call(&*gateway, "get_customer", gateway.get_customer(id)).await
    }

    pub async fn update_customer(
        &self,
        id: &str,
        request: CustomerRequest,
    ) -> PaymentResult<Customer> {
        let gateway = self.gateway();
        self.call(&*gateway, "update_customer", gateway.update_customer(id, request))
            .await
    }

    pub async fn delete_customer(&self, id: &str) -> PaymentResult<()> {
        let gateway = self.gateway();
        self.call(&*gateway, "delete_customer", gateway.delete_customer(id)).await
    }

    // Payment methods

    pub async fn add_payment_method(
        &self,
        request: PaymentMethodRequest,
    ) -> PaymentResult<PaymentMethod> {
        let gateway = self.gateway();
        self.call(&*gateway, "add_payment_method", gateway.add_payment_method(request))
            .await
    }

    pub async fn get_payment_method(&self, id: &str) -> PaymentResult<PaymentMethod> {
        let gateway = self.gateway();
        self.call(&*gateway, "get_payment_method", gateway.get_payment_method(id))
            .await
    }

    pub async fn list_payment_methods(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> PaymentResult<Vec<PaymentMethod>> {
        let gateway = self.gateway();
        self.call(
            &*gateway,
            "list_payment_methods",
            gateway.list_payment_methods(customer_id, limit),
        )
        .await
    }

    pub async fn detach_payment_method(&self, id: &str) -> PaymentResult<()> {
        let gateway = self.gateway();
        self.call(&*gateway, "detach_payment_method", gateway.detach_payment_method(id))
            .await
    }

    // Charges

    pub async fn create_charge(&self, request: ChargeRequest) -> PaymentResult<Charge> {
        let gateway = self.gateway();
        if let Err(err) = validate_charge(gateway.capabilities(), &request) {
            warn!(
                provider = gateway.provider_name(),
                amount = request.amount.amount,
                currency = request.amount.currency.code(),
                error = %err,
                "charge rejected before provider call"
            );
            return Err(err);
        }

        let charge = self
            .call(&*gateway, "create_charge", gateway.create_charge(request))
            .await?;

        self.emit(
            EventEnvelope::builder("charge.created", "/payments/charges")
                .field("charge_id", charge.id.clone())
                .field("amount", charge.amount.amount)
                .field("currency", charge.amount.currency.api_code())
                .field("status", charge.status.as_str())
                .field("customer_id", charge.customer_id.clone()),
        )
        .await;
        Ok(charge)
    }

    pub async fn get_charge(&self, id: &str) -> PaymentResult<Charge> {
        let gateway = self.gateway();
        self.call(&*gateway, "get_charge", gateway.get_charge(id)).await
    }

    pub async fn list_charges(
        &self,
        customer_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Charge>> {
        let gateway = self.gateway();
        self.call(&*gateway, "list_charges", gateway.list_charges(customer_id, limit))
            .await
    }

    // Refunds

    pub async fn create_refund(&self, request: RefundRequest) -> PaymentResult<Refund> {
        let gateway = self.gateway();
        let caps = gateway.capabilities();
        require(&*gateway, Feature::Refunds)?;
        if let Some(amount) = &request.amount {
            if !caps.supports_currency(amount.currency) {
                return Err(PaymentError::Validation(format!(
                    "currency {} is not supported",
                    amount.currency
                )));
            }
            if amount.amount > caps.max_payment_amount() {
                return Err(PaymentError::Validation(format!(
                    "refund amount {} exceeds the maximum of {}",
                    amount.amount,
                    caps.max_payment_amount()
                )));
            }
        }

        let refund = self
            .call(&*gateway, "create_refund", gateway.create_refund(request))
            .await?;

        self.emit(
            EventEnvelope::builder("refund.created", "/payments/refunds")
                .field("refund_id", refund.id.clone())
                .field("charge_id", refund.charge_id.clone())
                .field("amount", refund.amount.amount)
                .field("currency", refund.amount.currency.api_code())
                .field("status", refund.status.as_str())
                .field("reason", refund.reason.map(|r| r.as_str())),
        )
        .await;
        Ok(refund)
    }

    pub async fn get_refund(&self, id: &str) -> PaymentResult<Refund> {
        let gateway = self.gateway();
        self.call(&*gateway, "get_refund", gateway.get_refund(id)).await
    }

    pub async fn list_refunds(
        &self,
        charge_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Refund>> {
        let gateway = self.gateway();
        self.call(&*gateway, "list_refunds", gateway.list_refunds(charge_id, limit))
            .await
    }

    // Disputes

    pub async fn create_dispute(&self, request: DisputeRequest) -> PaymentResult<Dispute> {
        let gateway = self.gateway();
        require(&*gateway, Feature::Disputes)?;

        let dispute = self
            .call(&*gateway, "create_dispute", gateway.create_dispute(request))
            .await?;

        self.emit(
            EventEnvelope::builder("dispute.created", "/payments/disputes")
                .field("dispute_id", dispute.id.clone())
                .field("charge_id", dispute.charge_id.clone())
                .field("amount", dispute.amount.amount)
                .field("currency", dispute.amount.currency.api_code())
                .field("status", dispute.status.as_str())
                .field("reason", dispute.reason.clone()),
        )
        .await;
        Ok(dispute)
    }

    pub async fn get_dispute(&self, id: &str) -> PaymentResult<Dispute> {
        let gateway = self.gateway();
        self.call(&*gateway, "get_dispute", gateway.get_dispute(id)).await
    }

    pub async fn list_disputes(
        &self,
        charge_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Dispute>> {
        let gateway = self.gateway();
        self.call(&*gateway, "list_disputes", gateway.list_disputes(charge_id, limit))
            .await
    }

    pub async fn update_dispute_status(
        &self,
        id: &str,
        status: DisputeStatus,
    ) -> PaymentResult<Dispute> {
        let gateway = self.gateway();
        require(&*gateway, Feature::Disputes)?;
        self.call(
            &*gateway,
            "update_dispute_status",
            gateway.update_dispute_status(id, status),
        )
        .await
    }

    // Subscriptions

    pub async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> PaymentResult<Subscription> {
        let gateway = self.gateway();
        require(&*gateway, Feature::Subscriptions)?;
        self.call(&*gateway, "create_subscription", gateway.create_subscription(request))
            .await
    }

    pub async fn get_subscription(&self, id: &str) -> PaymentResult<Subscription> {
        let gateway = self.gateway();
        self.call(&*gateway, "get_subscription", gateway.get_subscription(id))
            .await
    }

    pub async fn cancel_subscription(
        &self,
        id: &str,
        at_period_end: bool,
    ) -> PaymentResult<Subscription> {
        let gateway = self.gateway();
        self.call(
            &*gateway,
            "cancel_subscription",
            gateway.cancel_subscription(id, at_period_end),
        )
        .await
    }

    async fn call<T, F>(
        &self,
        gateway: &dyn PaymentGateway,
        operation: &'static str,
        fut: F,
    ) -> PaymentResult<T>
    where
        F: Future<Output = PaymentResult<T>>,
    {
        let provider = gateway.provider_name();
        debug!(provider, operation, "calling payment provider");

        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                let err = err.with_provider(provider);
                warn!(provider, operation, error = %err, "payment provider call failed");
                Err(err)
            }
            Err(_) => {
                warn!(
                    provider,
                    operation,
                    timeout = ?self.call_timeout,
                    "payment provider call timed out"
                );
                Err(PaymentError::Timeout(self.call_timeout))
            }
        }
    }

    /// Publish on a spawned task so a dropped caller cannot cut delivery short
    async fn emit(&self, builder: EnvelopeBuilder) {
        let Some(pipeline) = self.events.clone() else {
            return;
        };
        let topic = self.topic.clone();
        let envelope = builder.build();
        let event_type = envelope.event_type().to_string();

        let task = tokio::spawn(async move { pipeline.publish(&topic, envelope).await });
        match task.await {
            Ok(Ok(PublishOutcome::Published { event_id, sequence })) => {
                debug!(
                    event_type = %event_type,
                    event_id = %event_id,
                    sequence,
                    "payment event published"
                );
            }
            Ok(Ok(PublishOutcome::DeadLettered { event_id, reason })) => {
                warn!(
                    event_type = %event_type,
                    event_id = %event_id,
                    reason = %reason,
                    "payment event dead-lettered"
                );
            }
            Ok(Err(err)) => {
                warn!(event_type = %event_type, error = %err, "payment event rejected");
            }
            Err(err) => {
                warn!(event_type = %event_type, error = %err, "payment event task failed");
            }
        }
    }
}

impl std::fmt::Debug for PaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService")
            .field("provider", &self.provider_name())
            .field("topic", &self.topic)
            .field("call_timeout", &self.call_timeout)
            .field("events", &self.events.is_some())
            .finish()
    }
}

fn validate_charge(caps: &GatewayCapabilities, request: &ChargeRequest) -> PaymentResult<()> {
    caps.check_charge(&request.amount)?;
    Ok(())
}

fn require(gateway: &dyn PaymentGateway, feature: Feature) -> PaymentResult<()> {
    if gateway.capabilities().supports(feature) {
        Ok(())
    } else {
        Err(PaymentError::not_supported(gateway.provider_name(), feature.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::providers::MemoryGateway;
    use async_trait::async_trait;
    use chrono::Utc;
    use paybridge_events::InMemoryPublisher;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SpyGateway {
        caps: GatewayCapabilities,
        calls: AtomicUsize,
        fail: bool,
        delay: Option<Duration>,
    }

    impl SpyGateway {
        fn new() -> Self {
            Self {
                caps: GatewayCapabilities::builder()
                    .feature(Feature::Refunds, true)
                    .min_payment_amount(50)
                    .max_payment_amount(10_000)
                    .currencies([Currency::USD])
                    .countries(["US"])
                    .build(),
                calls: AtomicUsize::new(0),
                fail: false,
                delay: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn charge(&self, request: ChargeRequest) -> Charge {
            Charge {
                id: "ch_spy".into(),
                amount: request.amount,
                amount_refunded: 0,
                status: ChargeStatus::Succeeded,
                customer_id: request.customer_id,
                payment_method_id: None,
                description: request.description,
                failure_reason: None,
                captured: true,
                refunded: false,
                disputed: false,
                metadata: HashMap::new(),
                created_at: Utc::now(),
                provider_id: "ch_spy".into(),
                provider: "spy".into(),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for SpyGateway {
        fn provider_name(&self) -> &str {
            "spy"
        }

        fn capabilities(&self) -> &GatewayCapabilities {
            &self.caps
        }

        async fn create_customer(&self, _request: CustomerRequest) -> PaymentResult<Customer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(PaymentError::Network("connection reset".into()))
        }

        async fn get_customer(&self, id: &str) -> PaymentResult<Customer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(PaymentError::not_found("customer", id))
        }

        async fn create_charge(&self, request: ChargeRequest) -> PaymentResult<Charge> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(PaymentError::upstream("spy", "card declined"));
            }
            Ok(self.charge(request))
        }

        async fn get_charge(&self, id: &str) -> PaymentResult<Charge> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(PaymentError::not_found("charge", id))
        }
    }

    fn service_with(spy: Arc<SpyGateway>) -> (PaymentService, Arc<InMemoryPublisher>) {
        let publisher = Arc::new(InMemoryPublisher::new());
        let service = PaymentService::new(spy, Arc::new(GatewayRegistry::with_builtin()))
            .with_events(EventPipeline::new(publisher.clone()));
        (service, publisher)
    }

    #[tokio::test]
    async fn test_charge_above_maximum_skips_gateway() {
        let spy = Arc::new(SpyGateway::new());
        let (service, publisher) = service_with(spy.clone());

        let err = service
            .create_charge(ChargeRequest::new(Money::usd(10_001)))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Validation(_)));
        assert_eq!(spy.calls(), 0);
        assert!(publisher.is_empty());
    }

    #[tokio::test]
    async fn test_charge_limits_and_currency() {
        let spy = Arc::new(SpyGateway::new());
        let (service, _) = service_with(spy.clone());

        assert!(service.validate_charge(&ChargeRequest::new(Money::usd(49))).is_err());
        assert!(service.validate_charge(&ChargeRequest::new(Money::usd(50))).is_ok());
        assert!(service.validate_charge(&ChargeRequest::new(Money::usd(10_000))).is_ok());
        assert!(service.validate_charge(&ChargeRequest::new(Money::eur(500))).is_err());
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn test_charge_publishes_event() {
        let spy = Arc::new(SpyGateway::new());
        let (service, publisher) = service_with(spy.clone());

        let charge = service
            .create_charge(ChargeRequest::new(Money::usd(5000)).customer("cus_1"))
            .await
            .unwrap();

        assert_eq!(charge.id, "ch_spy");
        assert_eq!(spy.calls(), 1);

        let events = publisher.published_of_type("charge.created");
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.source(), "/payments/charges");
        assert_eq!(event.data()["charge_id"], "ch_spy");
        assert_eq!(event.data()["amount"], 5000);
        assert_eq!(event.data()["currency"], "usd");
        assert_eq!(event.data()["customer_id"], "cus_1");
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_charge() {
        let spy = Arc::new(SpyGateway::new());
        let (service, publisher) = service_with(spy.clone());
        publisher.fail_event_type("charge.created", "broker down");

        let charge = service
            .create_charge(ChargeRequest::new(Money::usd(1000)))
            .await
            .unwrap();

        assert_eq!(charge.amount.amount, 1000);
        let pipeline = service.events().unwrap();
        assert_eq!(pipeline.dead_letters().len(), 1);
        assert!(pipeline.replay_store().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_publishes_nothing() {
        let mut spy = SpyGateway::new();
        spy.fail = true;
        let spy = Arc::new(spy);
        let (service, publisher) = service_with(spy.clone());

        let err = service
            .create_charge(ChargeRequest::new(Money::usd(1000)))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Upstream { ref provider, .. } if provider == "spy"));
        assert_eq!(spy.calls(), 1);
        assert!(publisher.is_empty());
    }

    #[tokio::test]
    async fn test_errors_carry_provider() {
        let spy = Arc::new(SpyGateway::new());
        let (service, _) = service_with(spy);

        let err = service
            .create_customer(CustomerRequest::with_email("a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Upstream { ref provider, .. } if provider == "spy"));

        let err = service.get_charge("ch_missing").await.unwrap_err();
        assert!(matches!(err, PaymentError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_unsupported_features_rejected() {
        let spy = Arc::new(SpyGateway::new());
        let (service, _) = service_with(spy.clone());

        let err = service
            .create_dispute(DisputeRequest::new("ch_1", Money::usd(100), "fraudulent"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotSupported { .. }));

        let err = service
            .create_subscription(SubscriptionRequest::new("cus_1", "price_1"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn test_refund_amount_checked() {
        let spy = Arc::new(SpyGateway::new());
        let (service, _) = service_with(spy.clone());

        let err = service
            .create_refund(RefundRequest::new("ch_1").amount(Money::usd(20_000)))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));

        let err = service
            .create_refund(RefundRequest::new("ch_1").amount(Money::gbp(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));

        // Spy has refunds enabled but relies on the trait default
        let err = service
            .create_refund(RefundRequest::new("ch_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotSupported { .. }));
        assert_eq!(spy.calls(), 0);
    }

    #[tokio::test]
    async fn test_call_timeout() {
        let mut spy = SpyGateway::new();
        spy.delay = Some(Duration::from_secs(5));
        let (service, publisher) = service_with(Arc::new(spy));
        let service = service.with_timeout(Duration::from_millis(20));

        let err = service
            .create_charge(ChargeRequest::new(Money::usd(1000)))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Timeout(_)));
        assert!(publisher.is_empty());
    }

    #[tokio::test]
    async fn test_switch_provider() {
        let spy = Arc::new(SpyGateway::new());
        let (service, publisher) = service_with(spy);
        assert_eq!(service.provider_name(), "spy");
        assert_eq!(service.available_providers(), vec!["memory", "paddle", "square", "stripe"]);

        let config = ProviderConfig::new().set("max_payment_amount", 100_000);
        service.switch_provider("memory", &config).unwrap();
        assert_eq!(service.provider_name(), "memory");
        assert_eq!(service.max_payment_amount(), 100_000);
        assert!(service.supports(Feature::Disputes));
        assert!(service.supported_currencies().contains(&Currency::EUR));

        let err = service.switch_provider("braintree", &config).unwrap_err();
        assert!(matches!(err, PaymentError::UnsupportedProvider(_)));
        assert_eq!(service.provider_name(), "memory");

        let customer = service
            .create_customer(CustomerRequest::with_email("jane@example.com").name("Jane"))
            .await
            .unwrap();
        let events = publisher.published_of_type("customer.created");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data()["customer_id"], customer.id.as_str());
    }

    #[tokio::test]
    async fn test_refund_and_dispute_events() {
        let publisher = Arc::new(InMemoryPublisher::new());
        let service = PaymentService::new(
            Arc::new(MemoryGateway::new()),
            Arc::new(GatewayRegistry::with_builtin()),
        )
        .with_events(EventPipeline::new(publisher.clone()));

        let charge = service
            .create_charge(ChargeRequest::new(Money::usd(2500)))
            .await
            .unwrap();
        service
            .create_refund(
                RefundRequest::new(&charge.id)
                    .amount(Money::usd(500))
                    .reason(RefundReason::RequestedByCustomer),
            )
            .await
            .unwrap();
        service
            .create_dispute(DisputeRequest::new(&charge.id, Money::usd(2000), "fraudulent"))
            .await
            .unwrap();

        let refunds = publisher.published_of_type("refund.created");
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].data()["amount"], 500);
        assert_eq!(refunds[0].data()["reason"], "requested_by_customer");

        let disputes = publisher.published_of_type("dispute.created");
        assert_eq!(disputes.len(), 1);
        assert_eq!(disputes[0].source(), "/payments/disputes");
        assert_eq!(disputes[0].data()["charge_id"], charge.id.as_str());
    }
}
