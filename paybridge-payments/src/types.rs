//! Provider-neutral payment records and requests
//!
//! Every record carries `provider_id`, the processor's own identifier, and
//! the name of the provider that produced it. Records are otherwise the same
//! whichever adapter returned them.

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Largest page any adapter returns from a list call
pub const MAX_PAGE_SIZE: usize = 100;

/// Clamp a caller-supplied page size; zero means the maximum.
pub fn page_limit(limit: usize) -> usize {
    if limit == 0 {
        MAX_PAGE_SIZE
    } else {
        limit.min(MAX_PAGE_SIZE)
    }
}

pub type Metadata = HashMap<String, String>;

// ========== Customers ==========

/// Create or update a customer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl CustomerRequest {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub provider_id: String,
    pub provider: String,
}

// ========== Payment methods ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    Card,
    BankAccount,
    Wallet,
}

impl PaymentMethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankAccount => "bank_account",
            Self::Wallet => "wallet",
        }
    }
}

/// Raw card details; only ever forwarded to the processor
#[derive(Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: u32,
    pub exp_year: u32,
    pub cvc: String,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last4 = self
            .number
            .get(self.number.len().saturating_sub(4)..)
            .unwrap_or_default();
        f.debug_struct("CardDetails")
            .field("number", &format_args!("****{}", last4))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvc", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodRequest {
    pub method_type: PaymentMethodType,
    pub customer_id: Option<String>,
    /// Processor-issued token, used instead of raw card details
    pub token: Option<String>,
    pub card: Option<CardDetails>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl PaymentMethodRequest {
    pub fn card(card: CardDetails) -> Self {
        Self {
            method_type: PaymentMethodType::Card,
            customer_id: None,
            token: None,
            card: Some(card),
            metadata: Metadata::new(),
        }
    }

    pub fn token(method_type: PaymentMethodType, token: impl Into<String>) -> Self {
        Self {
            method_type,
            customer_id: None,
            token: Some(token.into()),
            card: None,
            metadata: Metadata::new(),
        }
    }

    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}

/// Card summary as reported back by the processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInfo {
    pub brand: String,
    pub last4: String,
    pub exp_month: u32,
    pub exp_year: u32,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub method_type: PaymentMethodType,
    pub customer_id: Option<String>,
    pub card: Option<CardInfo>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub provider_id: String,
    pub provider: String,
}

// ========== Charges ==========

/// Charge/Payment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub amount: Money,
    pub customer_id: Option<String>,
    /// Payment method id or single-use token
    pub source: Option<String>,
    pub description: Option<String>,
    /// Capture immediately (false for auth-only)
    pub capture: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ChargeRequest {
    pub fn new(amount: Money) -> Self {
        Self {
            amount,
            customer_id: None,
            source: None,
            description: None,
            capture: true,
            metadata: Metadata::new(),
        }
    }

    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Auth only (no capture)
    pub fn auth_only(mut self) -> Self {
        self.capture = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Pending,
    Succeeded,
    Failed,
}

impl ChargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Map a processor status string; anything unrecognized is pending
    pub fn from_provider(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" | "completed" | "paid" | "approved" => Self::Succeeded,
            "failed" | "canceled" | "declined" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub amount: Money,
    pub amount_refunded: i64,
    pub status: ChargeStatus,
    pub customer_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub description: Option<String>,
    pub failure_reason: Option<String>,
    pub captured: bool,
    pub refunded: bool,
    pub disputed: bool,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub provider_id: String,
    pub provider: String,
}

// ========== Refunds ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    Duplicate,
    Fraudulent,
    RequestedByCustomer,
}

impl RefundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Fraudulent => "fraudulent",
            Self::RequestedByCustomer => "requested_by_customer",
        }
    }

    pub fn from_provider(reason: &str) -> Option<Self> {
        match reason {
            "duplicate" => Some(Self::Duplicate),
            "fraudulent" => Some(Self::Fraudulent),
            "requested_by_customer" => Some(Self::RequestedByCustomer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub charge_id: String,
    /// Partial refund amount; `None` refunds the full charge
    pub amount: Option<Money>,
    pub reason: Option<RefundReason>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl RefundRequest {
    pub fn new(charge_id: impl Into<String>) -> Self {
        Self {
            charge_id: charge_id.into(),
            amount: None,
            reason: None,
            metadata: Metadata::new(),
        }
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn reason(mut self, reason: RefundReason) -> Self {
        self.reason = Some(reason);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    pub fn from_provider(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" | "completed" => Self::Succeeded,
            "failed" | "rejected" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub charge_id: String,
    pub amount: Money,
    pub status: RefundStatus,
    pub reason: Option<RefundReason>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub provider_id: String,
    pub provider: String,
}

// ========== Disputes ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeRequest {
    pub charge_id: String,
    pub amount: Money,
    pub reason: String,
    #[serde(default)]
    pub evidence: HashMap<String, String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl DisputeRequest {
    pub fn new(charge_id: impl Into<String>, amount: Money, reason: impl Into<String>) -> Self {
        Self {
            charge_id: charge_id.into(),
            amount,
            reason: reason.into(),
            evidence: HashMap::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn evidence(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.evidence.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    WarningNeedsResponse,
    NeedsResponse,
    UnderReview,
    Won,
    Lost,
    Closed,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WarningNeedsResponse => "warning_needs_response",
            Self::NeedsResponse => "needs_response",
            Self::UnderReview => "under_review",
            Self::Won => "won",
            Self::Lost => "lost",
            Self::Closed => "closed",
        }
    }

    /// Whether the dispute is settled one way or the other
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Won | Self::Lost | Self::Closed)
    }
}

impl FromStr for DisputeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warning_needs_response" => Ok(Self::WarningNeedsResponse),
            "needs_response" | "evidence_required" => Ok(Self::NeedsResponse),
            "under_review" | "warning_under_review" | "processing" => Ok(Self::UnderReview),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            "closed" | "warning_closed" | "accepted" => Ok(Self::Closed),
            other => Err(format!("unknown dispute status '{}'", other)),
        }
    }
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: String,
    pub charge_id: String,
    pub amount: Money,
    pub status: DisputeStatus,
    pub reason: String,
    #[serde(default)]
    pub evidence: HashMap<String, String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub provider_id: String,
    pub provider: String,
}

// ========== Subscriptions ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub customer_id: String,
    pub price_id: String,
    pub quantity: u32,
    pub trial_days: Option<u32>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SubscriptionRequest {
    pub fn new(customer_id: impl Into<String>, price_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            price_id: price_id.into(),
            quantity: 1,
            trial_days: None,
            payment_method: None,
            metadata: Metadata::new(),
        }
    }

    pub fn quantity(mut self, qty: u32) -> Self {
        self.quantity = qty;
        self
    }

    pub fn trial_days(mut self, days: u32) -> Self {
        self.trial_days = Some(days);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    Paused,
}

impl SubscriptionStatus {
    pub fn from_provider(status: &str) -> Self {
        match status {
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "incomplete" | "incomplete_expired" => Self::Incomplete,
            "paused" => Self::Paused,
            _ => Self::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub price_id: String,
    pub status: SubscriptionStatus,
    pub quantity: u32,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub provider_id: String,
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit() {
        assert_eq!(page_limit(0), MAX_PAGE_SIZE);
        assert_eq!(page_limit(10), 10);
        assert_eq!(page_limit(5000), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_charge_request_builder() {
        let req = ChargeRequest::new(Money::usd(5000))
            .customer("cus_1")
            .source("pm_card_visa")
            .metadata("order", "42")
            .auth_only();
        assert_eq!(req.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(req.source.as_deref(), Some("pm_card_visa"));
        assert_eq!(req.metadata.get("order").map(String::as_str), Some("42"));
        assert!(!req.capture);
    }

    #[test]
    fn test_card_details_debug_is_masked() {
        let card = CardDetails {
            number: "4242424242424242".into(),
            exp_month: 12,
            exp_year: 2030,
            cvc: "123".into(),
        };
        let debug = format!("{:?}", card);
        assert!(debug.contains("****4242"));
        assert!(!debug.contains("4242424242424242"));
        assert!(!debug.contains("123\""));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ChargeStatus::from_provider("succeeded"), ChargeStatus::Succeeded);
        assert_eq!(ChargeStatus::from_provider("COMPLETED"), ChargeStatus::Succeeded);
        assert_eq!(ChargeStatus::from_provider("requires_action"), ChargeStatus::Pending);
        assert_eq!(RefundStatus::from_provider("cancelled"), RefundStatus::Canceled);
        assert_eq!("won".parse::<DisputeStatus>(), Ok(DisputeStatus::Won));
        assert_eq!(
            "warning_under_review".parse::<DisputeStatus>(),
            Ok(DisputeStatus::UnderReview)
        );
        assert!("exploded".parse::<DisputeStatus>().is_err());
        assert!(DisputeStatus::Lost.is_final());
        assert!(!DisputeStatus::NeedsResponse.is_final());
    }
}
