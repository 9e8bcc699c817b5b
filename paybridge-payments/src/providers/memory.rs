//! In-process gateway for tests and local development
//!
//! Ids are deterministic (`ch_mem_000001`, ...) and every record lives in
//! memory behind one lock. Limits and currencies come from the config bag:
//!
//! | key | default |
//! |-----|---------|
//! | `max_payment_amount` | 99_999_999 |
//! | `min_payment_amount` | 1 |
//! | `currencies` | usd, eur, gbp, cad, aud, jpy |
//! | `countries` | US, CA, GB, DE, FR, AU, JP |

use crate::capabilities::GatewayCapabilities;
use crate::config::ProviderConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::money::{Currency, Money};
use crate::provider::PaymentGateway;
use crate::types::*;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_CURRENCIES: [Currency; 6] = [
    Currency::USD,
    Currency::EUR,
    Currency::GBP,
    Currency::CAD,
    Currency::AUD,
    Currency::JPY,
];

const DEFAULT_COUNTRIES: [&str; 7] = ["US", "CA", "GB", "DE", "FR", "AU", "JP"];

#[derive(Default)]
struct Store {
    customers: BTreeMap<String, Customer>,
    payment_methods: BTreeMap<String, PaymentMethod>,
    charges: BTreeMap<String, Charge>,
    refunds: BTreeMap<String, Refund>,
    disputes: BTreeMap<String, Dispute>,
    subscriptions: BTreeMap<String, Subscription>,
}

/// Gateway that keeps everything in memory
pub struct MemoryGateway {
    name: String,
    capabilities: GatewayCapabilities,
    store: Mutex<Store>,
    counter: AtomicU64,
}

impl MemoryGateway {
    /// Memory gateway with default limits
    pub fn new() -> Self {
        Self::with_capabilities(
            GatewayCapabilities::builder()
                .all_features()
                .currencies(DEFAULT_CURRENCIES)
                .countries(DEFAULT_COUNTRIES)
                .build(),
        )
    }

    pub fn with_capabilities(capabilities: GatewayCapabilities) -> Self {
        Self {
            name: "memory".to_string(),
            capabilities,
            store: Mutex::new(Store::default()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> PaymentResult<Self> {
        let mut builder = GatewayCapabilities::builder()
            .all_features()
            .countries(
                config
                    .get_list("countries")
                    .unwrap_or_else(|| DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect()),
            );

        if let Some(max) = config.get_i64("max_payment_amount")? {
            builder = builder.max_payment_amount(max);
        }
        if let Some(min) = config.get_i64("min_payment_amount")? {
            builder = builder.min_payment_amount(min);
        }

        let currencies = match config.get_list("currencies") {
            Some(codes) => codes
                .iter()
                .map(|code| {
                    Currency::from_code(code).ok_or_else(|| {
                        PaymentError::Config(format!("memory currency '{}' is unknown", code))
                    })
                })
                .collect::<PaymentResult<Vec<_>>>()?,
            None => DEFAULT_CURRENCIES.to_vec(),
        };
        let capabilities = builder.currencies(currencies).build();

        if capabilities.min_payment_amount() > capabilities.max_payment_amount() {
            return Err(PaymentError::Config(
                "memory min_payment_amount exceeds max_payment_amount".into(),
            ));
        }

        let mut gateway = Self::with_capabilities(capabilities);
        if let Some(name) = config.get_str("name") {
            gateway.name = name.to_ascii_lowercase();
        }
        Ok(gateway)
    }

    /// Report a different provider name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}_mem_{:06}", prefix, n)
    }

    fn not_found(resource: &str, id: &str) -> PaymentError {
        PaymentError::not_found(resource, id)
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MemoryGateway {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &GatewayCapabilities {
        &self.capabilities
    }

    async fn create_customer(&self, request: CustomerRequest) -> PaymentResult<Customer> {
        let id = self.next_id("cus");
        let now = Utc::now();
        let customer = Customer {
            id: id.clone(),
            email: request.email,
            name: request.name,
            phone: request.phone,
            description: request.description,
            metadata: request.metadata,
            created_at: now,
            updated_at: now,
            provider_id: id.clone(),
            provider: self.name.clone(),
        };
        self.store.lock().customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn get_customer(&self, id: &str) -> PaymentResult<Customer> {
        self.store
            .lock()
            .customers
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("customer", id))
    }

    async fn update_customer(&self, id: &str, request: CustomerRequest) -> PaymentResult<Customer> {
        let mut store = self.store.lock();
        let customer = store
            .customers
            .get_mut(id)
            .ok_or_else(|| Self::not_found("customer", id))?;
        if request.email.is_some() {
            customer.email = request.email;
        }
        if request.name.is_some() {
            customer.name = request.name;
        }
        if request.phone.is_some() {
            customer.phone = request.phone;
        }
        if request.description.is_some() {
            customer.description = request.description;
        }
        customer.metadata.extend(request.metadata);
        customer.updated_at = Utc::now();
        Ok(customer.clone())
    }

    async fn delete_customer(&self, id: &str) -> PaymentResult<()> {
        self.store
            .lock()
            .customers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found("customer", id))
    }

    async fn add_payment_method(
        &self,
        request: PaymentMethodRequest,
    ) -> PaymentResult<PaymentMethod> {
        if request.card.is_none() && request.token.is_none() {
            return Err(PaymentError::Validation(
                "payment method needs card details or a token".into(),
            ));
        }
        let id = self.next_id("pm");
        let card = request.card.as_ref().map(|card| CardInfo {
            brand: "visa".to_string(),
            last4: card
                .number
                .get(card.number.len().saturating_sub(4)..)
                .unwrap_or_default()
                .to_string(),
            exp_month: card.exp_month,
            exp_year: card.exp_year,
            fingerprint: Some(format!("fp_{}", id)),
        });
        let method = PaymentMethod {
            id: id.clone(),
            method_type: request.method_type,
            customer_id: request.customer_id,
            card,
            metadata: request.metadata,
            created_at: Utc::now(),
            provider_id: id.clone(),
            provider: self.name.clone(),
        };
        self.store.lock().payment_methods.insert(id, method.clone());
        Ok(method)
    }

    async fn get_payment_method(&self, id: &str) -> PaymentResult<PaymentMethod> {
        self.store
            .lock()
            .payment_methods
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("payment method", id))
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> PaymentResult<Vec<PaymentMethod>> {
        Ok(self
            .store
            .lock()
            .payment_methods
            .values()
            .filter(|pm| pm.customer_id.as_deref() == Some(customer_id))
            .take(page_limit(limit))
            .cloned()
            .collect())
    }

    async fn detach_payment_method(&self, id: &str) -> PaymentResult<()> {
        let mut store = self.store.lock();
        let method = store
            .payment_methods
            .get_mut(id)
            .ok_or_else(|| Self::not_found("payment method", id))?;
        method.customer_id = None;
        Ok(())
    }

    async fn create_charge(&self, request: ChargeRequest) -> PaymentResult<Charge> {
        if request.amount.amount <= 0 {
            return Err(PaymentError::Validation("charge amount must be positive".into()));
        }
        let id = self.next_id("ch");
        let charge = Charge {
            id: id.clone(),
            amount: request.amount,
            amount_refunded: 0,
            status: ChargeStatus::Succeeded,
            customer_id: request.customer_id,
            payment_method_id: request.source,
            description: request.description,
            failure_reason: None,
            captured: request.capture,
            refunded: false,
            disputed: false,
            metadata: request.metadata,
            created_at: Utc::now(),
            provider_id: id.clone(),
            provider: self.name.clone(),
        };
        self.store.lock().charges.insert(id, charge.clone());
        Ok(charge)
    }

    async fn get_charge(&self, id: &str) -> PaymentResult<Charge> {
        self.store
            .lock()
            .charges
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("charge", id))
    }

    async fn list_charges(
        &self,
        customer_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Charge>> {
        Ok(self
            .store
            .lock()
            .charges
            .values()
            .filter(|c| customer_id.is_none() || c.customer_id.as_deref() == customer_id)
            .take(page_limit(limit))
            .cloned()
            .collect())
    }

    async fn create_refund(&self, request: RefundRequest) -> PaymentResult<Refund> {
        let id = self.next_id("re");
        let mut store = self.store.lock();
        let charge = store
            .charges
            .get_mut(&request.charge_id)
            .ok_or_else(|| Self::not_found("charge", &request.charge_id))?;

        let remaining = charge.amount.amount - charge.amount_refunded;
        let amount = request
            .amount
            .unwrap_or_else(|| Money::new(remaining, charge.amount.currency));
        if amount.currency != charge.amount.currency {
            return Err(PaymentError::Validation(format!(
                "refund currency {} does not match charge currency {}",
                amount.currency, charge.amount.currency
            )));
        }
        if amount.amount <= 0 || amount.amount > remaining {
            return Err(PaymentError::Validation(format!(
                "refund amount {} exceeds refundable {}",
                amount.amount, remaining
            )));
        }

        charge.amount_refunded += amount.amount;
        charge.refunded = charge.amount_refunded == charge.amount.amount;

        let refund = Refund {
            id: id.clone(),
            charge_id: request.charge_id,
            amount,
            status: RefundStatus::Succeeded,
            reason: request.reason,
            metadata: request.metadata,
            created_at: Utc::now(),
            provider_id: id.clone(),
            provider: self.name.clone(),
        };
        store.refunds.insert(id, refund.clone());
        Ok(refund)
    }

    async fn get_refund(&self, id: &str) -> PaymentResult<Refund> {
        self.store
            .lock()
            .refunds
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("refund", id))
    }

    async fn list_refunds(
        &self,
        charge_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Refund>> {
        Ok(self
            .store
            .lock()
            .refunds
            .values()
            .filter(|r| charge_id.is_none_or(|c| r.charge_id == c))
            .take(page_limit(limit))
            .cloned()
            .collect())
    }

    async fn create_dispute(&self, request: DisputeRequest) -> PaymentResult<Dispute> {
        let id = self.next_id("dp");
        let mut store = self.store.lock();
        let charge = store
            .charges
            .get_mut(&request.charge_id)
            .ok_or_else(|| Self::not_found("charge", &request.charge_id))?;
        charge.disputed = true;

        let now = Utc::now();
        let dispute = Dispute {
            id: id.clone(),
            charge_id: request.charge_id,
            amount: request.amount,
            status: DisputeStatus::NeedsResponse,
            reason: request.reason,
            evidence: request.evidence,
            metadata: request.metadata,
            created_at: now,
            updated_at: now,
            provider_id: id.clone(),
            provider: self.name.clone(),
        };
        store.disputes.insert(id, dispute.clone());
        Ok(dispute)
    }

    async fn get_dispute(&self, id: &str) -> PaymentResult<Dispute> {
        self.store
            .lock()
            .disputes
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("dispute", id))
    }

    async fn list_disputes(
        &self,
        charge_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Dispute>> {
        Ok(self
            .store
            .lock()
            .disputes
            .values()
            .filter(|d| charge_id.is_none_or(|c| d.charge_id == c))
            .take(page_limit(limit))
            .cloned()
            .collect())
    }

    async fn update_dispute_status(
        &self,
        id: &str,
        status: DisputeStatus,
    ) -> PaymentResult<Dispute> {
        let mut store = self.store.lock();
        let dispute = store
            .disputes
            .get_mut(id)
            .ok_or_else(|| Self::not_found("dispute", id))?;
        if dispute.status.is_final() {
            return Err(PaymentError::Validation(format!(
                "dispute {} is already {}",
                id, dispute.status
            )));
        }
        dispute.status = status;
        dispute.updated_at = Utc::now();
        Ok(dispute.clone())
    }

    async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> PaymentResult<Subscription> {
        let id = self.next_id("sub");
        let mut store = self.store.lock();
        if !store.customers.contains_key(&request.customer_id) {
            return Err(Self::not_found("customer", &request.customer_id));
        }

        let now = Utc::now();
        let (status, period_start) = match request.trial_days {
            Some(days) if days > 0 => (
                SubscriptionStatus::Trialing,
                now + ChronoDuration::days(i64::from(days)),
            ),
            _ => (SubscriptionStatus::Active, now),
        };
        let subscription = Subscription {
            id: id.clone(),
            customer_id: request.customer_id,
            price_id: request.price_id,
            status,
            quantity: request.quantity,
            current_period_start: Some(period_start),
            current_period_end: Some(period_start + ChronoDuration::days(30)),
            cancel_at_period_end: false,
            canceled_at: None,
            metadata: request.metadata,
            created_at: now,
            provider_id: id.clone(),
            provider: self.name.clone(),
        };
        store.subscriptions.insert(id, subscription.clone());
        Ok(subscription)
    }

    async fn get_subscription(&self, id: &str) -> PaymentResult<Subscription> {
        self.store
            .lock()
            .subscriptions
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("subscription", id))
    }

    async fn cancel_subscription(
        &self,
        id: &str,
        at_period_end: bool,
    ) -> PaymentResult<Subscription> {
        let mut store = self.store.lock();
        let subscription = store
            .subscriptions
            .get_mut(id)
            .ok_or_else(|| Self::not_found("subscription", id))?;
        if at_period_end {
            subscription.cancel_at_period_end = true;
        } else {
            subscription.status = SubscriptionStatus::Canceled;
            subscription.canceled_at = Some(Utc::now());
        }
        Ok(subscription.clone())
    }
}
