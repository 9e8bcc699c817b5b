//! What a gateway can do, and the limits it enforces
//!
//! A [`GatewayCapabilities`] value is built once per adapter instance and
//! never changes afterwards. The payment service checks requests against it
//! before any provider call is made.

use crate::money::{Currency, Money};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Optional gateway features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Customers,
    Charges,
    Refunds,
    Disputes,
    Subscriptions,
    Connect,
    Payouts,
    Tax,
    Invoices,
}

impl Feature {
    pub const ALL: [Feature; 9] = [
        Self::Customers,
        Self::Charges,
        Self::Refunds,
        Self::Disputes,
        Self::Subscriptions,
        Self::Connect,
        Self::Payouts,
        Self::Tax,
        Self::Invoices,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Charges => "charges",
            Self::Refunds => "refunds",
            Self::Disputes => "disputes",
            Self::Subscriptions => "subscriptions",
            Self::Connect => "connect",
            Self::Payouts => "payouts",
            Self::Tax => "tax",
            Self::Invoices => "invoices",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First limit a charge amount breaks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityViolation {
    #[error("currency {0} is not supported")]
    UnsupportedCurrency(Currency),

    #[error("amount {amount} is below the minimum of {minimum}")]
    BelowMinimum { amount: i64, minimum: i64 },

    #[error("amount {amount} exceeds the maximum of {maximum}")]
    AboveMaximum { amount: i64, maximum: i64 },
}

impl From<CapabilityViolation> for crate::error::PaymentError {
    fn from(violation: CapabilityViolation) -> Self {
        crate::error::PaymentError::Validation(violation.to_string())
    }
}

/// Immutable description of one gateway's features and limits.
///
/// Amounts are in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayCapabilities {
    subscriptions: bool,
    disputes: bool,
    refunds: bool,
    connect: bool,
    payouts: bool,
    tax: bool,
    invoices: bool,
    min_payment_amount: i64,
    max_payment_amount: i64,
    supported_currencies: BTreeSet<Currency>,
    supported_countries: BTreeSet<String>,
}

impl GatewayCapabilities {
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }

    /// Customers and charges are always available
    pub fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::Customers | Feature::Charges => true,
            Feature::Refunds => self.refunds,
            Feature::Disputes => self.disputes,
            Feature::Subscriptions => self.subscriptions,
            Feature::Connect => self.connect,
            Feature::Payouts => self.payouts,
            Feature::Tax => self.tax,
            Feature::Invoices => self.invoices,
        }
    }

    /// Every supported feature, in declaration order
    pub fn features(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| self.supports(*f))
            .collect()
    }

    pub fn min_payment_amount(&self) -> i64 {
        self.min_payment_amount
    }

    pub fn max_payment_amount(&self) -> i64 {
        self.max_payment_amount
    }

    pub fn supported_currencies(&self) -> &BTreeSet<Currency> {
        &self.supported_currencies
    }

    pub fn supported_countries(&self) -> &BTreeSet<String> {
        &self.supported_countries
    }

    pub fn supports_currency(&self, currency: Currency) -> bool {
        self.supported_currencies.contains(&currency)
    }

    /// Country codes are compared upper-cased
    pub fn supports_country(&self, country: &str) -> bool {
        self.supported_countries
            .contains(&country.trim().to_ascii_uppercase())
    }

    /// Amount limits only
    pub fn check_amount(&self, amount: i64) -> Result<(), CapabilityViolation> {
        if amount < self.min_payment_amount {
            return Err(CapabilityViolation::BelowMinimum {
                amount,
                minimum: self.min_payment_amount,
            });
        }
        if amount > self.max_payment_amount {
            return Err(CapabilityViolation::AboveMaximum {
                amount,
                maximum: self.max_payment_amount,
            });
        }
        Ok(())
    }

    /// Currency, then minimum, then maximum
    pub fn check_charge(&self, amount: &Money) -> Result<(), CapabilityViolation> {
        if !self.supports_currency(amount.currency) {
            return Err(CapabilityViolation::UnsupportedCurrency(amount.currency));
        }
        self.check_amount(amount.amount)
    }
}

/// Builder for [`GatewayCapabilities`]
#[derive(Debug, Clone)]
pub struct CapabilitiesBuilder {
    caps: GatewayCapabilities,
}

impl Default for CapabilitiesBuilder {
    fn default() -> Self {
        Self {
            caps: GatewayCapabilities {
                subscriptions: false,
                disputes: false,
                refunds: false,
                connect: false,
                payouts: false,
                tax: false,
                invoices: false,
                min_payment_amount: 1,
                max_payment_amount: 99_999_999,
                supported_currencies: BTreeSet::new(),
                supported_countries: BTreeSet::new(),
            },
        }
    }
}

impl CapabilitiesBuilder {
    /// Turn on every optional feature
    pub fn all_features(mut self) -> Self {
        for feature in Feature::ALL {
            self = self.feature(feature, true);
        }
        self
    }

    pub fn feature(mut self, feature: Feature, enabled: bool) -> Self {
        match feature {
            Feature::Customers | Feature::Charges => {}
            Feature::Refunds => self.caps.refunds = enabled,
            Feature::Disputes => self.caps.disputes = enabled,
            Feature::Subscriptions => self.caps.subscriptions = enabled,
            Feature::Connect => self.caps.connect = enabled,
            Feature::Payouts => self.caps.payouts = enabled,
            Feature::Tax => self.caps.tax = enabled,
            Feature::Invoices => self.caps.invoices = enabled,
        }
        self
    }

    pub fn min_payment_amount(mut self, amount: i64) -> Self {
        self.caps.min_payment_amount = amount;
        self
    }

    pub fn max_payment_amount(mut self, amount: i64) -> Self {
        self.caps.max_payment_amount = amount;
        self
    }

    pub fn currencies(mut self, currencies: impl IntoIterator<Item = Currency>) -> Self {
        self.caps.supported_currencies = currencies.into_iter().collect();
        self
    }

    pub fn countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.caps.supported_countries = countries
            .into_iter()
            .map(|c| c.as_ref().trim().to_ascii_uppercase())
            .collect();
        self
    }

    pub fn build(self) -> GatewayCapabilities {
        self.caps
    }
}
