//! Settings-driven wiring of gateway, events and webhooks

use crate::error::Result;
use crate::handlers::PaymentWebhookHandlers;
use paybridge_config::{ConfigValidator, Settings, Validate};
use paybridge_events::{EventPipeline, EventPublisher, InMemoryPublisher};
use paybridge_payments::{GatewayRegistry, PaymentService, ProviderConfig};
use paybridge_webhooks::{WebhookIngestor, WebhookReceipt};
use std::sync::Arc;
use tracing::info;

/// A fully wired PayBridge instance.
pub struct PayBridge {
    service: Arc<PaymentService>,
    pipeline: EventPipeline,
    ingestor: WebhookIngestor,
}

impl PayBridge {
    /// Build everything from settings.
    ///
    /// Events go to Kafka when brokers are configured and the `kafka`
    /// feature is enabled, otherwise to an in-process publisher.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let publisher = publisher_for(settings)?;
        Self::with_publisher(settings, publisher)
    }

    /// Build everything from settings around a caller-supplied publisher
    pub fn with_publisher(settings: &Settings, publisher: Arc<dyn EventPublisher>) -> Result<Self> {
        Self::with_registry(settings, GatewayRegistry::with_builtin(), publisher)
    }

    /// Like [`PayBridge::with_publisher`] with extra gateways registered
    pub fn with_registry(
        settings: &Settings,
        registry: GatewayRegistry,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self> {
        settings.validate()?;
        ConfigValidator::not_empty(&settings.webhooks.secret, "webhooks.secret")?;

        let pipeline =
            EventPipeline::new(publisher).with_timeout(settings.events.publish_timeout());

        let config = ProviderConfig::from(settings.gateway.options.clone());
        let service =
            PaymentService::from_registry(Arc::new(registry), &settings.gateway.provider, &config)?
                .with_events(pipeline.clone())
                .with_topic(settings.events.topic.clone())
                .with_timeout(settings.gateway.timeout());
        let service = Arc::new(service);

        let handlers = Arc::new(PaymentWebhookHandlers::new(service.clone()));
        let ingestor = WebhookIngestor::new(settings.webhooks.secret.clone(), handlers)
            .with_tolerance(settings.webhooks.tolerance())
            .with_dedup_ttl(settings.webhooks.dedup_ttl());

        info!(
            provider = %service.provider_name(),
            topic = %settings.events.topic,
            "paybridge initialized"
        );

        Ok(Self {
            service,
            pipeline,
            ingestor,
        })
    }

    pub fn service(&self) -> &Arc<PaymentService> {
        &self.service
    }

    pub fn pipeline(&self) -> &EventPipeline {
        &self.pipeline
    }

    pub fn ingestor(&self) -> &WebhookIngestor {
        &self.ingestor
    }

    /// Verify and route one webhook delivery
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature_header: &str,
    ) -> paybridge_webhooks::Result<WebhookReceipt> {
        self.ingestor.ingest(body, signature_header).await
    }
}

#[cfg(feature = "kafka")]
fn publisher_for(settings: &Settings) -> Result<Arc<dyn EventPublisher>> {
    if settings.events.brokers.is_empty() {
        return Ok(Arc::new(InMemoryPublisher::new()));
    }
    let publisher = paybridge_events::KafkaPublisher::connect(
        &settings.events.brokers,
        settings.events.publish_timeout(),
    )?;
    Ok(Arc::new(publisher))
}

#[cfg(not(feature = "kafka"))]
fn publisher_for(settings: &Settings) -> Result<Arc<dyn EventPublisher>> {
    if !settings.events.brokers.is_empty() {
        tracing::warn!("event brokers configured without the kafka feature; using the in-memory publisher");
    }
    Ok(Arc::new(InMemoryPublisher::new()))
}
