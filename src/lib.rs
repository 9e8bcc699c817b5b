//! PayBridge: a provider-agnostic payment gateway layer
//!
//! The member crates are re-exported under short names, and
//! [`PayBridge`] wires them together from [`Settings`].
//!
//! ```rust,ignore
//! use paybridge::prelude::*;
//!
//! paybridge::log::init();
//! let settings = paybridge::config::ConfigLoader::new().add_file("paybridge.toml").load()?;
//! let bridge = PayBridge::from_settings(&settings)?;
//!
//! let charge = bridge
//!     .service()
//!     .create_charge(ChargeRequest::new(Money::usd(5000)).source("tok_visa"))
//!     .await?;
//!
//! let status = match bridge.handle_webhook(&body, &signature_header).await {
//!     Ok(receipt) => receipt.status_code(),
//!     Err(err) => err.status_code(),
//! };
//! ```

pub mod bootstrap;
pub mod error;
pub mod handlers;

pub use paybridge_config as config;
pub use paybridge_events as events;
pub use paybridge_log as log;
pub use paybridge_payments as payments;
pub use paybridge_webhooks as webhooks;

pub use bootstrap::PayBridge;
pub use error::{BootstrapError, Result};
pub use handlers::PaymentWebhookHandlers;
pub use paybridge_config::Settings;

/// Common imports
pub mod prelude {
    pub use crate::{PayBridge, PaymentWebhookHandlers, Settings};
    pub use paybridge_events::{EventEnvelope, EventPipeline, InMemoryPublisher, PublishOutcome};
    pub use paybridge_payments::{
        Charge, ChargeRequest, Currency, CustomerRequest, Feature, GatewayRegistry, Money,
        PaymentError, PaymentGateway, PaymentService, ProviderConfig, RefundRequest,
    };
    pub use paybridge_webhooks::{WebhookError, WebhookIngestor, WebhookReceipt, WebhookSignature};
}
