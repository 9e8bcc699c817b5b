//! Stripe payment provider implementation

use crate::capabilities::GatewayCapabilities;
use crate::config::ProviderConfig;
use crate::error::{PaymentError, PaymentResult};
use crate::money::{Currency, Money};
use crate::provider::{
    PaymentGateway, ProviderClient, expect_success, path_id, provider_currency, read_json,
    unsupported,
};
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "stripe";

/// Default Stripe API endpoint
pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

type Form = Vec<(String, String)>;

/// Stripe provider
///
/// Config keys: `api_key` (required, `sk_...`), `webhook_secret`,
/// `base_url`, `timeout_ms`.
pub struct StripeGateway {
    client: ProviderClient,
    webhook_secret: Option<SecretString>,
    capabilities: GatewayCapabilities,
}

impl StripeGateway {
    pub fn from_config(config: &ProviderConfig) -> PaymentResult<Self> {
        let api_key = config.require_str(PROVIDER, "api_key")?;
        if !api_key.starts_with("sk_") {
            return Err(PaymentError::Config("stripe api_key must start with 'sk_'".into()));
        }

        let base_url = config
            .get_str("base_url")
            .unwrap_or_else(|| STRIPE_API_BASE.to_string());
        url::Url::parse(&base_url)
            .map_err(|e| PaymentError::Config(format!("stripe base_url is invalid: {}", e)))?;

        let mut client = ProviderClient::new(base_url, SecretString::from(api_key));
        if let Some(ms) = config.get_i64("timeout_ms")? {
            client = client.with_timeout(Duration::from_millis(ms.max(1) as u64))?;
        }

        Ok(Self {
            client,
            webhook_secret: config.get_str("webhook_secret").map(SecretString::from),
            capabilities: Self::default_capabilities(),
        })
    }

    /// Stripe supports every feature
    pub fn default_capabilities() -> GatewayCapabilities {
        GatewayCapabilities::builder()
            .all_features()
            .min_payment_amount(50)
            .max_payment_amount(99_999_999)
            .currencies([
                Currency::USD,
                Currency::EUR,
                Currency::GBP,
                Currency::CAD,
                Currency::AUD,
                Currency::JPY,
            ])
            .countries(["US", "CA", "GB", "DE", "FR", "AU", "JP"])
            .build()
    }

    /// Signing secret for Stripe webhooks, when configured
    pub fn webhook_secret(&self) -> Option<&SecretString> {
        self.webhook_secret.as_ref()
    }

    fn push_metadata(params: &mut Form, metadata: &Metadata) {
        for (key, value) in metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }
    }

    fn customer_form(request: &CustomerRequest) -> Form {
        let mut params = Form::new();
        for (key, value) in [
            ("email", &request.email),
            ("name", &request.name),
            ("phone", &request.phone),
            ("description", &request.description),
        ] {
            if let Some(value) = value {
                params.push((key.to_string(), value.clone()));
            }
        }
        Self::push_metadata(&mut params, &request.metadata);
        params
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn capabilities(&self) -> &GatewayCapabilities {
        &self.capabilities
    }

    async fn create_customer(&self, request: CustomerRequest) -> PaymentResult<Customer> {
        let response = self
            .client
            .post_form("/customers", &Self::customer_form(&request))
            .await?;
        let customer: StripeCustomer = read_json(PROVIDER, "customer", "", response).await?;
        debug!(provider = PROVIDER, customer_id = %customer.id, "created customer");
        Ok(customer.into())
    }

    async fn get_customer(&self, id: &str) -> PaymentResult<Customer> {
        let response = self.client.get(&format!("/customers/{}", path_id(id)?)).await?;
        let customer: StripeCustomer = read_json(PROVIDER, "customer", id, response).await?;
        Ok(customer.into())
    }

    async fn update_customer(&self, id: &str, request: CustomerRequest) -> PaymentResult<Customer> {
        let response = self
            .client
            .post_form(&format!("/customers/{}", path_id(id)?), &Self::customer_form(&request))
            .await?;
        let customer: StripeCustomer = read_json(PROVIDER, "customer", id, response).await?;
        Ok(customer.into())
    }

    async fn delete_customer(&self, id: &str) -> PaymentResult<()> {
        let response = self.client.delete(&format!("/customers/{}", path_id(id)?)).await?;
        expect_success(PROVIDER, "customer", id, response).await
    }

    async fn add_payment_method(
        &self,
        request: PaymentMethodRequest,
    ) -> PaymentResult<PaymentMethod> {
        let mut params: Form = vec![("type".into(), request.method_type.as_str().into())];
        match (&request.card, &request.token) {
            (Some(card), _) => {
                params.push(("card[number]".into(), card.number.clone()));
                params.push(("card[exp_month]".into(), card.exp_month.to_string()));
                params.push(("card[exp_year]".into(), card.exp_year.to_string()));
                params.push(("card[cvc]".into(), card.cvc.clone()));
            }
            (None, Some(token)) => params.push(("card[token]".into(), token.clone())),
            (None, None) => {
                return Err(PaymentError::Validation(
                    "payment method needs card details or a token".into(),
                ));
            }
        }
        Self::push_metadata(&mut params, &request.metadata);

        let response = self.client.post_form("/payment_methods", &params).await?;
        let method: StripePaymentMethod =
            read_json(PROVIDER, "payment method", "", response).await?;

        let Some(customer_id) = request.customer_id else {
            return Ok(method.into());
        };
        let path = format!("/payment_methods/{}/attach", path_id(&method.id)?);
        let response = self
            .client
            .post_form(&path, &[("customer", customer_id.as_str())])
            .await?;
        let attached: StripePaymentMethod =
            read_json(PROVIDER, "payment method", &method.id, response).await?;
        Ok(attached.into())
    }

    async fn get_payment_method(&self, id: &str) -> PaymentResult<PaymentMethod> {
        let response = self.client.get(&format!("/payment_methods/{}", path_id(id)?)).await?;
        let method: StripePaymentMethod =
            read_json(PROVIDER, "payment method", id, response).await?;
        Ok(method.into())
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> PaymentResult<Vec<PaymentMethod>> {
        let limit = page_limit(limit).to_string();
        let query = [("customer", customer_id), ("type", "card"), ("limit", limit.as_str())];
        let response = self.client.get_query("/payment_methods", &query).await?;
        let list: StripeList<StripePaymentMethod> =
            read_json(PROVIDER, "payment method", "", response).await?;
        Ok(list.data.into_iter().map(Into::into).collect())
    }

    async fn detach_payment_method(&self, id: &str) -> PaymentResult<()> {
        let response = self
            .client
            .post_form(&format!("/payment_methods/{}/detach", path_id(id)?), &Form::new())
            .await?;
        expect_success(PROVIDER, "payment method", id, response).await
    }

    async fn create_charge(&self, request: ChargeRequest) -> PaymentResult<Charge> {
        let mut params: Form = vec![
            ("amount".into(), request.amount.amount.to_string()),
            ("currency".into(), request.amount.currency.api_code()),
            ("capture".into(), request.capture.to_string()),
        ];
        if let Some(customer_id) = &request.customer_id {
            params.push(("customer".into(), customer_id.clone()));
        }
        if let Some(source) = &request.source {
            params.push(("source".into(), source.clone()));
        }
        if let Some(desc) = &request.description {
            params.push(("description".into(), desc.clone()));
        }
        Self::push_metadata(&mut params, &request.metadata);

        let response = self.client.post_form("/charges", &params).await?;
        let charge: StripeCharge = read_json(PROVIDER, "charge", "", response).await?;
        debug!(provider = PROVIDER, charge_id = %charge.id, "created charge");
        charge.try_into()
    }

    async fn get_charge(&self, id: &str) -> PaymentResult<Charge> {
        let response = self.client.get(&format!("/charges/{}", path_id(id)?)).await?;
        let charge: StripeCharge = read_json(PROVIDER, "charge", id, response).await?;
        charge.try_into()
    }

    async fn list_charges(
        &self,
        customer_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Charge>> {
        let mut query = vec![("limit", page_limit(limit).to_string())];
        if let Some(customer_id) = customer_id {
            query.push(("customer", customer_id.to_string()));
        }
        let response = self.client.get_query("/charges", &query).await?;
        let list: StripeList<StripeCharge> = read_json(PROVIDER, "charge", "", response).await?;
        list.data.into_iter().map(TryInto::try_into).collect()
    }

    async fn create_refund(&self, request: RefundRequest) -> PaymentResult<Refund> {
        let mut params: Form = vec![("charge".into(), request.charge_id.clone())];
        if let Some(amount) = &request.amount {
            params.push(("amount".into(), amount.amount.to_string()));
        }
        if let Some(reason) = &request.reason {
            params.push(("reason".into(), reason.as_str().to_string()));
        }
        Self::push_metadata(&mut params, &request.metadata);

        let response = self.client.post_form("/refunds", &params).await?;
        let refund: StripeRefund =
            read_json(PROVIDER, "charge", &request.charge_id, response).await?;
        refund.try_into()
    }

    async fn get_refund(&self, id: &str) -> PaymentResult<Refund> {
        let response = self.client.get(&format!("/refunds/{}", path_id(id)?)).await?;
        let refund: StripeRefund = read_json(PROVIDER, "refund", id, response).await?;
        refund.try_into()
    }

    async fn list_refunds(
        &self,
        charge_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Refund>> {
        let mut query = vec![("limit", page_limit(limit).to_string())];
        if let Some(charge_id) = charge_id {
            query.push(("charge", charge_id.to_string()));
        }
        let response = self.client.get_query("/refunds", &query).await?;
        let list: StripeList<StripeRefund> = read_json(PROVIDER, "refund", "", response).await?;
        list.data.into_iter().map(TryInto::try_into).collect()
    }

    // Disputes are opened by cardholders; there is no create endpoint.
    async fn create_dispute(&self, _request: DisputeRequest) -> PaymentResult<Dispute> {
        unsupported(PROVIDER, "creating disputes")
    }

    async fn get_dispute(&self, id: &str) -> PaymentResult<Dispute> {
        let response = self.client.get(&format!("/disputes/{}", path_id(id)?)).await?;
        let dispute: StripeDispute = read_json(PROVIDER, "dispute", id, response).await?;
        dispute.try_into()
    }

    async fn list_disputes(
        &self,
        charge_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Dispute>> {
        let mut query = vec![("limit", page_limit(limit).to_string())];
        if let Some(charge_id) = charge_id {
            query.push(("charge", charge_id.to_string()));
        }
        let response = self.client.get_query("/disputes", &query).await?;
        let list: StripeList<StripeDispute> = read_json(PROVIDER, "dispute", "", response).await?;
        list.data.into_iter().map(TryInto::try_into).collect()
    }

    /// Only accepting a dispute (closing it as lost) is possible through the API
    async fn update_dispute_status(
        &self,
        id: &str,
        status: DisputeStatus,
    ) -> PaymentResult<Dispute> {
        if !matches!(status, DisputeStatus::Lost | DisputeStatus::Closed) {
            return unsupported(PROVIDER, "setting dispute status");
        }
        let response = self
            .client
            .post_form(&format!("/disputes/{}/close", path_id(id)?), &Form::new())
            .await?;
        let dispute: StripeDispute = read_json(PROVIDER, "dispute", id, response).await?;
        dispute.try_into()
    }

    async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> PaymentResult<Subscription> {
        let mut params: Form = vec![
            ("customer".into(), request.customer_id.clone()),
            ("items[0][price]".into(), request.price_id.clone()),
            ("items[0][quantity]".into(), request.quantity.to_string()),
        ];
        if let Some(days) = request.trial_days {
            params.push(("trial_period_days".into(), days.to_string()));
        }
        if let Some(pm) = &request.payment_method {
            params.push(("default_payment_method".into(), pm.clone()));
        }
        Self::push_metadata(&mut params, &request.metadata);

        let response = self.client.post_form("/subscriptions", &params).await?;
        let subscription: StripeSubscription =
            read_json(PROVIDER, "customer", &request.customer_id, response).await?;
        Ok(subscription.into())
    }

    async fn get_subscription(&self, id: &str) -> PaymentResult<Subscription> {
        let response = self.client.get(&format!("/subscriptions/{}", path_id(id)?)).await?;
        let subscription: StripeSubscription =
            read_json(PROVIDER, "subscription", id, response).await?;
        Ok(subscription.into())
    }

    async fn cancel_subscription(
        &self,
        id: &str,
        at_period_end: bool,
    ) -> PaymentResult<Subscription> {
        let path = format!("/subscriptions/{}", path_id(id)?);
        let response = if at_period_end {
            self.client
                .post_form(&path, &[("cancel_at_period_end", "true")])
                .await?
        } else {
            self.client.delete(&path).await?
        };
        let subscription: StripeSubscription =
            read_json(PROVIDER, "subscription", id, response).await?;
        Ok(subscription.into())
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

// Stripe API types

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
    email: Option<String>,
    name: Option<String>,
    phone: Option<String>,
    description: Option<String>,
    created: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl From<StripeCustomer> for Customer {
    fn from(sc: StripeCustomer) -> Self {
        Self {
            provider_id: sc.id.clone(),
            id: sc.id,
            email: sc.email,
            name: sc.name,
            phone: sc.phone,
            description: sc.description,
            metadata: sc.metadata,
            created_at: timestamp(sc.created),
            updated_at: timestamp(sc.created),
            provider: PROVIDER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripePaymentMethod {
    id: String,
    #[serde(rename = "type")]
    method_type: String,
    customer: Option<String>,
    card: Option<StripeCard>,
    created: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeCard {
    brand: String,
    last4: String,
    exp_month: u32,
    exp_year: u32,
    fingerprint: Option<String>,
}

impl From<StripePaymentMethod> for PaymentMethod {
    fn from(spm: StripePaymentMethod) -> Self {
        Self {
            provider_id: spm.id.clone(),
            id: spm.id,
            method_type: match spm.method_type.as_str() {
                "us_bank_account" | "sepa_debit" | "bacs_debit" => PaymentMethodType::BankAccount,
                "card" => PaymentMethodType::Card,
                _ => PaymentMethodType::Wallet,
            },
            customer_id: spm.customer,
            card: spm.card.map(|c| CardInfo {
                brand: c.brand,
                last4: c.last4,
                exp_month: c.exp_month,
                exp_year: c.exp_year,
                fingerprint: c.fingerprint,
            }),
            metadata: spm.metadata,
            created_at: timestamp(spm.created),
            provider: PROVIDER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeCharge {
    id: String,
    amount: i64,
    #[serde(default)]
    amount_refunded: i64,
    currency: String,
    status: String,
    customer: Option<String>,
    payment_method: Option<String>,
    description: Option<String>,
    failure_message: Option<String>,
    #[serde(default)]
    captured: bool,
    #[serde(default)]
    refunded: bool,
    #[serde(default)]
    disputed: bool,
    created: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl TryFrom<StripeCharge> for Charge {
    type Error = PaymentError;

    fn try_from(sc: StripeCharge) -> PaymentResult<Self> {
        let currency = provider_currency(PROVIDER, &sc.currency)?;
        Ok(Self {
            provider_id: sc.id.clone(),
            id: sc.id,
            amount: Money::new(sc.amount, currency),
            amount_refunded: sc.amount_refunded,
            status: ChargeStatus::from_provider(&sc.status),
            customer_id: sc.customer,
            payment_method_id: sc.payment_method,
            description: sc.description,
            failure_reason: sc.failure_message,
            captured: sc.captured,
            refunded: sc.refunded,
            disputed: sc.disputed,
            metadata: sc.metadata,
            created_at: timestamp(sc.created),
            provider: PROVIDER.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
    charge: String,
    amount: i64,
    currency: String,
    status: String,
    reason: Option<String>,
    created: i64,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl TryFrom<StripeRefund> for Refund {
    type Error = PaymentError;

    fn try_from(sr: StripeRefund) -> PaymentResult<Self> {
        let currency = provider_currency(PROVIDER, &sr.currency)?;
        Ok(Self {
            provider_id: sr.id.clone(),
            id: sr.id,
            charge_id: sr.charge,
            amount: Money::new(sr.amount, currency),
            status: RefundStatus::from_provider(&sr.status),
            reason: sr.reason.as_deref().and_then(RefundReason::from_provider),
            metadata: sr.metadata,
            created_at: timestamp(sr.created),
            provider: PROVIDER.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeDispute {
    id: String,
    charge: String,
    amount: i64,
    currency: String,
    status: String,
    reason: String,
    created: i64,
    evidence: Option<serde_json::Value>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl TryFrom<StripeDispute> for Dispute {
    type Error = PaymentError;

    fn try_from(sd: StripeDispute) -> PaymentResult<Self> {
        let currency = provider_currency(PROVIDER, &sd.currency)?;
        let mut evidence = HashMap::new();
        if sd.evidence.as_ref().is_some_and(|e| !e.is_null()) {
            evidence.insert("has_evidence".to_string(), "true".to_string());
        }
        Ok(Self {
            provider_id: sd.id.clone(),
            id: sd.id,
            charge_id: sd.charge,
            amount: Money::new(sd.amount, currency),
            status: sd.status.parse().unwrap_or(DisputeStatus::NeedsResponse),
            reason: sd.reason,
            evidence,
            metadata: sd.metadata,
            created_at: timestamp(sd.created),
            updated_at: timestamp(sd.created),
            provider: PROVIDER.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    id: String,
    customer: String,
    status: String,
    current_period_start: Option<i64>,
    current_period_end: Option<i64>,
    #[serde(default)]
    cancel_at_period_end: bool,
    canceled_at: Option<i64>,
    created: i64,
    #[serde(default)]
    items: Option<StripeList<StripeSubscriptionItem>>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionItem {
    price: StripePrice,
    #[serde(default)]
    quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    id: String,
}

impl From<StripeSubscription> for Subscription {
    fn from(ss: StripeSubscription) -> Self {
        let item = ss.items.and_then(|items| items.data.into_iter().next());
        let (price_id, quantity) = match item {
            Some(item) => (item.price.id, item.quantity.unwrap_or(1)),
            None => (String::new(), 1),
        };
        Self {
            provider_id: ss.id.clone(),
            id: ss.id,
            customer_id: ss.customer,
            price_id,
            status: SubscriptionStatus::from_provider(&ss.status),
            quantity,
            current_period_start: ss.current_period_start.map(timestamp),
            current_period_end: ss.current_period_end.map(timestamp),
            cancel_at_period_end: ss.cancel_at_period_end,
            canceled_at: ss.canceled_at.map(timestamp),
            metadata: ss.metadata,
            created_at: timestamp(ss.created),
            provider: PROVIDER.to_string(),
        }
    }
}
