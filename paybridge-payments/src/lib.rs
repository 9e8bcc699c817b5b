//! Payment gateway abstraction for PayBridge
//!
//! One [`PaymentGateway`] trait over Stripe, Paddle, Square and an in-memory
//! gateway, with capability checks in front and payment events behind.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       PaymentService                             │
//! │  validate against capabilities → call gateway → publish event    │
//! └─────────────────────────────────────────────────────────────────┘
//!                             │
//!          ┌──────────────────┼──────────────────┬──────────────┐
//!          ▼                  ▼                  ▼              ▼
//!   ┌────────────┐    ┌────────────┐    ┌────────────┐  ┌────────────┐
//!   │   Stripe   │    │   Paddle   │    │   Square   │  │   Memory   │
//!   └────────────┘    └────────────┘    └────────────┘  └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use paybridge_payments::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(GatewayRegistry::with_builtin());
//! let config = ProviderConfig::new().set("api_key", "sk_test_...");
//! let service = PaymentService::from_registry(registry, "stripe", &config)?;
//!
//! let charge = service
//!     .create_charge(ChargeRequest::new(Money::usd(2999)).source("tok_visa"))
//!     .await?;
//!
//! // Later, move traffic to another processor
//! service.switch_provider("square", &square_config)?;
//! ```

pub mod capabilities;
pub mod config;
pub mod error;
pub mod money;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod service;
pub mod types;

pub use capabilities::{CapabilitiesBuilder, CapabilityViolation, Feature, GatewayCapabilities};
pub use config::{Environment, ProviderConfig};
pub use error::{PaymentError, PaymentResult};
pub use money::{Currency, Money};
pub use provider::{PaymentGateway, ProviderClient};
pub use providers::{MemoryGateway, PaddleGateway, SquareGateway, StripeGateway};
pub use registry::{GatewayConstructor, GatewayRegistry, ProviderKind};
pub use service::{DEFAULT_CALL_TIMEOUT, PaymentService};
pub use types::*;
