//! Name → constructor map for gateways

use crate::config::ProviderConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::provider::PaymentGateway;
use crate::providers::{MemoryGateway, PaddleGateway, SquareGateway, StripeGateway};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Builds a gateway from its configuration bag
pub type GatewayConstructor =
    Arc<dyn Fn(&ProviderConfig) -> PaymentResult<Arc<dyn PaymentGateway>> + Send + Sync>;

/// Built-in provider tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Stripe,
    Paddle,
    Square,
    Memory,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [Self::Stripe, Self::Paddle, Self::Square, Self::Memory];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Paddle => "paddle",
            Self::Square => "square",
            Self::Memory => "memory",
        }
    }

    /// Construct the adapter for this tag
    pub fn build(&self, config: &ProviderConfig) -> PaymentResult<Arc<dyn PaymentGateway>> {
        Ok(match self {
            Self::Stripe => Arc::new(StripeGateway::from_config(config)?),
            Self::Paddle => Arc::new(PaddleGateway::from_config(config)?),
            Self::Square => Arc::new(SquareGateway::from_config(config)?),
            Self::Memory => Arc::new(MemoryGateway::from_config(config)?),
        })
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or(PaymentError::UnsupportedProvider(name))
    }
}

/// Gateway constructors keyed by lower-cased provider name.
///
/// Populate it during start-up, then share it as `Arc<GatewayRegistry>`.
/// It holds no business state.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    constructors: BTreeMap<String, GatewayConstructor>,
}

impl GatewayRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with stripe, paddle, square and memory
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for kind in ProviderKind::ALL {
            registry.register(kind.as_str(), move |config| kind.build(config));
        }
        registry
    }

    /// Register (or replace) a constructor
    pub fn register<F>(&mut self, name: &str, constructor: F) -> &mut Self
    where
        F: Fn(&ProviderConfig) -> PaymentResult<Arc<dyn PaymentGateway>> + Send + Sync + 'static,
    {
        let name = name.trim().to_ascii_lowercase();
        debug!(provider = %name, "registered payment provider");
        self.constructors.insert(name, Arc::new(constructor));
        self
    }

    /// Resolve `name` and build a gateway from `config`
    pub fn create(
        &self,
        name: &str,
        config: &ProviderConfig,
    ) -> PaymentResult<Arc<dyn PaymentGateway>> {
        let key = name.trim().to_ascii_lowercase();
        let constructor = self
            .constructors
            .get(&key)
            .ok_or_else(|| PaymentError::UnsupportedProvider(key.clone()))?;
        let gateway = constructor(config)?;
        debug!(provider = %key, "created payment gateway");
        Ok(gateway)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors
            .contains_key(&name.trim().to_ascii_lowercase())
    }

    /// Registered names, sorted
    pub fn providers(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
