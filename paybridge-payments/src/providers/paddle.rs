//! Paddle Billing provider
//!
//! Paddle is a merchant of record: charges are transactions, refunds are
//! adjustments and subscriptions are created through checkout. Disputes,
//! Connect and payouts are handled by Paddle itself and are not exposed.

use crate::capabilities::{Feature, GatewayCapabilities};
use crate::config::{Environment, ProviderConfig};
use crate::error::{PaymentError, PaymentResult};
use crate::money::{Currency, Money};
use crate::provider::{
    PaymentGateway, ProviderClient, path_id, provider_currency, read_json, unsupported,
};
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;

const PROVIDER: &str = "paddle";

const SANDBOX_BASE: &str = "https://sandbox-api.paddle.com";
const PRODUCTION_BASE: &str = "https://api.paddle.com";

/// Paddle provider
///
/// Config keys: `vendor_id`, `vendor_auth_code`, `environment`
/// (`sandbox` | `production`), optional `base_url`.
pub struct PaddleGateway {
    client: ProviderClient,
    vendor_id: String,
    environment: Environment,
    capabilities: GatewayCapabilities,
}

impl PaddleGateway {
    pub fn from_config(config: &ProviderConfig) -> PaymentResult<Self> {
        let vendor_id = config.require_str(PROVIDER, "vendor_id")?;
        let auth_code = config.require_str(PROVIDER, "vendor_auth_code")?;
        let environment = Environment::from_config(PROVIDER, config)?;

        let base_url = config.get_str("base_url").unwrap_or_else(|| {
            match environment {
                Environment::Sandbox => SANDBOX_BASE,
                Environment::Production => PRODUCTION_BASE,
            }
            .to_string()
        });

        Ok(Self {
            client: ProviderClient::new(base_url, SecretString::from(auth_code)),
            vendor_id,
            environment,
            capabilities: Self::default_capabilities(),
        })
    }

    pub fn default_capabilities() -> GatewayCapabilities {
        GatewayCapabilities::builder()
            .feature(Feature::Subscriptions, true)
            .feature(Feature::Tax, true)
            .feature(Feature::Invoices, true)
            .feature(Feature::Refunds, true)
            .max_payment_amount(99_999_999)
            .currencies([
                Currency::USD,
                Currency::EUR,
                Currency::GBP,
                Currency::CAD,
                Currency::AUD,
            ])
            .countries(["US", "CA", "GB", "DE", "FR", "AU"])
            .build()
    }

    pub fn vendor_id(&self) -> &str {
        &self.vendor_id
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    fn customer_body(request: &CustomerRequest) -> Value {
        let mut body = json!({ "custom_data": request.metadata });
        if let Some(email) = &request.email {
            body["email"] = json!(email);
        }
        if let Some(name) = &request.name {
            body["name"] = json!(name);
        }
        body
    }
}

#[async_trait]
impl PaymentGateway for PaddleGateway {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn capabilities(&self) -> &GatewayCapabilities {
        &self.capabilities
    }

    async fn create_customer(&self, request: CustomerRequest) -> PaymentResult<Customer> {
        if request.email.is_none() {
            return Err(PaymentError::Validation("paddle customers require an email".into()));
        }
        let response = self
            .client
            .post("/customers", &Self::customer_body(&request))
            .await?;
        let body: Envelope<PaddleCustomer> = read_json(PROVIDER, "customer", "", response).await?;
        Ok(body.data.into())
    }

    async fn get_customer(&self, id: &str) -> PaymentResult<Customer> {
        let response = self.client.get(&format!("/customers/{}", path_id(id)?)).await?;
        let body: Envelope<PaddleCustomer> = read_json(PROVIDER, "customer", id, response).await?;
        Ok(body.data.into())
    }

    async fn update_customer(&self, id: &str, request: CustomerRequest) -> PaymentResult<Customer> {
        let response = self
            .client
            .patch(&format!("/customers/{}", path_id(id)?), &Self::customer_body(&request))
            .await?;
        let body: Envelope<PaddleCustomer> = read_json(PROVIDER, "customer", id, response).await?;
        Ok(body.data.into())
    }

    async fn create_charge(&self, request: ChargeRequest) -> PaymentResult<Charge> {
        let currency = request.amount.currency.code();
        let description = request
            .description
            .clone()
            .unwrap_or_else(|| "One-time charge".to_string());
        let mut body = json!({
            "items": [{
                "quantity": 1,
                "price": {
                    "description": description,
                    "unit_price": {
                        "amount": request.amount.amount.to_string(),
                        "currency_code": currency,
                    },
                    "product": { "name": description, "tax_category": "standard" },
                },
            }],
            "currency_code": currency,
            "custom_data": request.metadata,
        });
        if let Some(customer_id) = &request.customer_id {
            body["customer_id"] = json!(customer_id);
        }

        let response = self.client.post("/transactions", &body).await?;
        let body: Envelope<PaddleTransaction> =
            read_json(PROVIDER, "transaction", "", response).await?;
        Ok(body.data.into_charge(request.amount))
    }

    async fn get_charge(&self, id: &str) -> PaymentResult<Charge> {
        let response = self.client.get(&format!("/transactions/{}", path_id(id)?)).await?;
        let body: Envelope<PaddleTransaction> =
            read_json(PROVIDER, "transaction", id, response).await?;
        let amount = body.data.total()?;
        Ok(body.data.into_charge(amount))
    }

    async fn list_charges(
        &self,
        customer_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Charge>> {
        let mut query = vec![("per_page", page_limit(limit).to_string())];
        if let Some(customer_id) = customer_id {
            query.push(("customer_id", customer_id.to_string()));
        }
        let response = self.client.get_query("/transactions", &query).await?;
        let body: Envelope<Vec<PaddleTransaction>> =
            read_json(PROVIDER, "transaction", "", response).await?;
        body.data
            .into_iter()
            .map(|txn| {
                let amount = txn.total()?;
                Ok(txn.into_charge(amount))
            })
            .collect()
    }

    async fn create_refund(&self, request: RefundRequest) -> PaymentResult<Refund> {
        let mut body = json!({
            "action": "refund",
            "transaction_id": request.charge_id,
            "reason": request.reason.map(|r| r.as_str()).unwrap_or("requested_by_customer"),
        });
        match request.amount {
            Some(amount) => {
                body["type"] = json!("partial");
                body["totals"] = json!({
                    "total": amount.amount.to_string(),
                    "currency_code": amount.currency.code(),
                });
            }
            None => body["type"] = json!("full"),
        }

        let response = self.client.post("/adjustments", &body).await?;
        let body: Envelope<PaddleAdjustment> =
            read_json(PROVIDER, "transaction", &request.charge_id, response).await?;
        body.data.into_refund(request.metadata)
    }

    async fn create_subscription(
        &self,
        _request: SubscriptionRequest,
    ) -> PaymentResult<Subscription> {
        unsupported(PROVIDER, "creating subscriptions outside checkout")
    }

    async fn get_subscription(&self, id: &str) -> PaymentResult<Subscription> {
        let response = self.client.get(&format!("/subscriptions/{}", path_id(id)?)).await?;
        let body: Envelope<PaddleSubscription> =
            read_json(PROVIDER, "subscription", id, response).await?;
        Ok(body.data.into())
    }

    async fn cancel_subscription(
        &self,
        id: &str,
        at_period_end: bool,
    ) -> PaymentResult<Subscription> {
        let effective_from = if at_period_end {
            "next_billing_period"
        } else {
            "immediately"
        };
        let response = self
            .client
            .post(
                &format!("/subscriptions/{}/cancel", path_id(id)?),
                &json!({ "effective_from": effective_from }),
            )
            .await?;
        let body: Envelope<PaddleSubscription> =
            read_json(PROVIDER, "subscription", id, response).await?;
        Ok(body.data.into())
    }
}

fn parse_amount(raw: &str) -> PaymentResult<i64> {
    raw.parse()
        .map_err(|_| PaymentError::upstream(PROVIDER, format!("invalid amount '{}'", raw)))
}

// Paddle API types

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct PaddleCustomer {
    id: String,
    email: Option<String>,
    name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    custom_data: Option<HashMap<String, String>>,
}

impl From<PaddleCustomer> for Customer {
    fn from(pc: PaddleCustomer) -> Self {
        Self {
            provider_id: pc.id.clone(),
            id: pc.id,
            email: pc.email,
            name: pc.name,
            phone: None,
            description: None,
            metadata: pc.custom_data.unwrap_or_default(),
            created_at: pc.created_at,
            updated_at: pc.updated_at,
            provider: PROVIDER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaddleTransaction {
    id: String,
    status: String,
    customer_id: Option<String>,
    currency_code: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    details: Option<PaddleDetails>,
    #[serde(default)]
    custom_data: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct PaddleDetails {
    totals: PaddleTotals,
}

#[derive(Debug, Deserialize)]
struct PaddleTotals {
    total: String,
}

impl PaddleTransaction {
    fn total(&self) -> PaymentResult<Money> {
        let amount = match &self.details {
            Some(details) => parse_amount(&details.totals.total)?,
            None => 0,
        };
        Ok(Money::new(amount, provider_currency(PROVIDER, &self.currency_code)?))
    }

    fn into_charge(self, amount: Money) -> Charge {
        let status = ChargeStatus::from_provider(&self.status);
        Charge {
            provider_id: self.id.clone(),
            id: self.id,
            amount,
            amount_refunded: 0,
            status,
            customer_id: self.customer_id,
            payment_method_id: None,
            description: None,
            failure_reason: None,
            captured: status == ChargeStatus::Succeeded,
            refunded: false,
            disputed: false,
            metadata: self.custom_data.unwrap_or_default(),
            created_at: self.created_at,
            provider: PROVIDER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaddleAdjustment {
    id: String,
    transaction_id: String,
    status: String,
    reason: String,
    currency_code: String,
    totals: PaddleTotals,
    created_at: DateTime<Utc>,
}

impl PaddleAdjustment {
    fn into_refund(self, metadata: Metadata) -> PaymentResult<Refund> {
        let currency = provider_currency(PROVIDER, &self.currency_code)?;
        let amount = Money::new(parse_amount(&self.totals.total)?, currency);
        Ok(Refund {
            provider_id: self.id.clone(),
            id: self.id,
            charge_id: self.transaction_id,
            amount,
            status: match self.status.as_str() {
                "approved" => RefundStatus::Succeeded,
                "rejected" => RefundStatus::Failed,
                _ => RefundStatus::Pending,
            },
            reason: RefundReason::from_provider(&self.reason),
            metadata,
            created_at: self.created_at,
            provider: PROVIDER.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PaddleSubscription {
    id: String,
    status: String,
    customer_id: String,
    created_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
    current_billing_period: Option<PaddlePeriod>,
    scheduled_change: Option<PaddleScheduledChange>,
    #[serde(default)]
    items: Vec<PaddleSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct PaddlePeriod {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PaddleScheduledChange {
    action: String,
}

#[derive(Debug, Deserialize)]
struct PaddleSubscriptionItem {
    quantity: u32,
    price: PaddlePrice,
}

#[derive(Debug, Deserialize)]
struct PaddlePrice {
    id: String,
}

impl From<PaddleSubscription> for Subscription {
    fn from(ps: PaddleSubscription) -> Self {
        let (price_id, quantity) = ps
            .items
            .into_iter()
            .next()
            .map(|item| (item.price.id, item.quantity))
            .unwrap_or_default();
        Self {
            provider_id: ps.id.clone(),
            id: ps.id,
            customer_id: ps.customer_id,
            price_id,
            status: SubscriptionStatus::from_provider(&ps.status),
            quantity,
            current_period_start: ps.current_billing_period.as_ref().map(|p| p.starts_at),
            current_period_end: ps.current_billing_period.as_ref().map(|p| p.ends_at),
            cancel_at_period_end: ps
                .scheduled_change
                .is_some_and(|change| change.action == "cancel"),
            canceled_at: ps.canceled_at,
            metadata: Metadata::new(),
            created_at: ps.created_at,
            provider: PROVIDER.to_string(),
        }
    }
}
