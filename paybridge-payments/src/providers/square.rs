//! Square provider
//!
//! Square has no subscriptions or tax API through this adapter. Disputes are
//! opened by cardholders, so they can be read and accepted but not created.

use crate::capabilities::{Feature, GatewayCapabilities};
use crate::config::{Environment, ProviderConfig};
use crate::error::{PaymentError, PaymentResult};
use crate::money::{Currency, Money};
use crate::provider::{
    PaymentGateway, ProviderClient, expect_success, path_id, provider_currency, read_json,
    unsupported,
};
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use uuid::Uuid;

const PROVIDER: &str = "square";

const SANDBOX_BASE: &str = "https://connect.squareupsandbox.com/v2";
const PRODUCTION_BASE: &str = "https://connect.squareup.com/v2";
const API_VERSION: &str = "2024-01-18";

/// Square provider
///
/// Config keys: `application_id`, `access_token`, `environment`
/// (`sandbox` | `production`), optional `base_url`.
pub struct SquareGateway {
    client: ProviderClient,
    application_id: String,
    environment: Environment,
    capabilities: GatewayCapabilities,
}

impl SquareGateway {
    pub fn from_config(config: &ProviderConfig) -> PaymentResult<Self> {
        let application_id = config.require_str(PROVIDER, "application_id")?;
        let access_token = config.require_str(PROVIDER, "access_token")?;
        let environment = Environment::from_config(PROVIDER, config)?;

        let base_url = config.get_str("base_url").unwrap_or_else(|| {
            match environment {
                Environment::Sandbox => SANDBOX_BASE,
                Environment::Production => PRODUCTION_BASE,
            }
            .to_string()
        });

        let client = ProviderClient::new(base_url, SecretString::from(access_token))
            .with_header("Square-Version", API_VERSION);

        Ok(Self {
            client,
            application_id,
            environment,
            capabilities: Self::default_capabilities(),
        })
    }

    pub fn default_capabilities() -> GatewayCapabilities {
        GatewayCapabilities::builder()
            .all_features()
            .feature(Feature::Subscriptions, false)
            .feature(Feature::Tax, false)
            .max_payment_amount(99_999_999)
            .currencies([
                Currency::USD,
                Currency::CAD,
                Currency::EUR,
                Currency::GBP,
                Currency::JPY,
                Currency::AUD,
            ])
            .countries(["US", "CA", "GB", "AU", "JP"])
            .build()
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    fn customer_body(request: &CustomerRequest) -> Value {
        let mut body = json!({ "idempotency_key": Uuid::new_v4().to_string() });
        if let Some(email) = &request.email {
            body["email_address"] = json!(email);
        }
        if let Some(name) = &request.name {
            body["given_name"] = json!(name);
        }
        if let Some(phone) = &request.phone {
            body["phone_number"] = json!(phone);
        }
        if let Some(description) = &request.description {
            body["note"] = json!(description);
        }
        body
    }

    fn money_body(money: &Money) -> Value {
        json!({ "amount": money.amount, "currency": money.currency.code() })
    }
}

#[async_trait]
impl PaymentGateway for SquareGateway {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn capabilities(&self) -> &GatewayCapabilities {
        &self.capabilities
    }

    async fn create_customer(&self, request: CustomerRequest) -> PaymentResult<Customer> {
        let response = self
            .client
            .post("/customers", &Self::customer_body(&request))
            .await?;
        let body: CustomerBody = read_json(PROVIDER, "customer", "", response).await?;
        Ok(body.customer.into_customer(request.metadata))
    }

    async fn get_customer(&self, id: &str) -> PaymentResult<Customer> {
        let response = self.client.get(&format!("/customers/{}", path_id(id)?)).await?;
        let body: CustomerBody = read_json(PROVIDER, "customer", id, response).await?;
        Ok(body.customer.into_customer(Metadata::new()))
    }

    async fn update_customer(&self, id: &str, request: CustomerRequest) -> PaymentResult<Customer> {
        let response = self
            .client
            .put(&format!("/customers/{}", path_id(id)?), &Self::customer_body(&request))
            .await?;
        let body: CustomerBody = read_json(PROVIDER, "customer", id, response).await?;
        Ok(body.customer.into_customer(request.metadata))
    }

    async fn delete_customer(&self, id: &str) -> PaymentResult<()> {
        let response = self.client.delete(&format!("/customers/{}", path_id(id)?)).await?;
        expect_success(PROVIDER, "customer", id, response).await
    }

    async fn add_payment_method(
        &self,
        request: PaymentMethodRequest,
    ) -> PaymentResult<PaymentMethod> {
        let Some(source_id) = &request.token else {
            return Err(PaymentError::Validation(
                "square cards are stored from a payment token".into(),
            ));
        };
        let mut card = json!({});
        if let Some(customer_id) = &request.customer_id {
            card["customer_id"] = json!(customer_id);
        }
        let body = json!({
            "idempotency_key": Uuid::new_v4().to_string(),
            "source_id": source_id,
            "card": card,
        });
        let response = self.client.post("/cards", &body).await?;
        let body: CardBody = read_json(PROVIDER, "card", "", response).await?;
        Ok(body.card.into_method(request.metadata))
    }

    async fn get_payment_method(&self, id: &str) -> PaymentResult<PaymentMethod> {
        let response = self.client.get(&format!("/cards/{}", path_id(id)?)).await?;
        let body: CardBody = read_json(PROVIDER, "card", id, response).await?;
        Ok(body.card.into_method(Metadata::new()))
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> PaymentResult<Vec<PaymentMethod>> {
        let response = self
            .client
            .get_query("/cards", &[("customer_id", customer_id)])
            .await?;
        let body: CardList = read_json(PROVIDER, "card", "", response).await?;
        Ok(body
            .cards
            .into_iter()
            .take(page_limit(limit))
            .map(|card| card.into_method(Metadata::new()))
            .collect())
    }

    async fn detach_payment_method(&self, id: &str) -> PaymentResult<()> {
        let response = self
            .client
            .post(&format!("/cards/{}/disable", path_id(id)?), &json!({}))
            .await?;
        expect_success(PROVIDER, "card", id, response).await
    }

    async fn create_charge(&self, request: ChargeRequest) -> PaymentResult<Charge> {
        let Some(source_id) = &request.source else {
            return Err(PaymentError::Validation("square payments need a source".into()));
        };
        let mut body = json!({
            "idempotency_key": Uuid::new_v4().to_string(),
            "source_id": source_id,
            "amount_money": Self::money_body(&request.amount),
            "autocomplete": request.capture,
        });
        if let Some(customer_id) = &request.customer_id {
            body["customer_id"] = json!(customer_id);
        }
        if let Some(note) = &request.description {
            body["note"] = json!(note);
        }

        let response = self.client.post("/payments", &body).await?;
        let body: PaymentBody = read_json(PROVIDER, "payment", "", response).await?;
        body.payment.into_charge(request.metadata)
    }

    async fn get_charge(&self, id: &str) -> PaymentResult<Charge> {
        let response = self.client.get(&format!("/payments/{}", path_id(id)?)).await?;
        let body: PaymentBody = read_json(PROVIDER, "payment", id, response).await?;
        body.payment.into_charge(Metadata::new())
    }

    async fn list_charges(
        &self,
        customer_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Charge>> {
        let response = self
            .client
            .get_query("/payments", &[("limit", page_limit(limit).to_string())])
            .await?;
        let body: PaymentList = read_json(PROVIDER, "payment", "", response).await?;
        body.payments
            .into_iter()
            .filter(|p| customer_id.is_none() || p.customer_id.as_deref() == customer_id)
            .map(|p| p.into_charge(Metadata::new()))
            .collect()
    }

    async fn create_refund(&self, request: RefundRequest) -> PaymentResult<Refund> {
        // Square needs an explicit amount; a full refund uses the payment total.
        let amount = match request.amount {
            Some(amount) => amount,
            None => self.get_charge(&request.charge_id).await?.amount,
        };
        let mut body = json!({
            "idempotency_key": Uuid::new_v4().to_string(),
            "payment_id": request.charge_id,
            "amount_money": Self::money_body(&amount),
        });
        if let Some(reason) = request.reason {
            body["reason"] = json!(reason.as_str());
        }

        let response = self.client.post("/refunds", &body).await?;
        let body: RefundBody = read_json(PROVIDER, "payment", &request.charge_id, response).await?;
        body.refund.into_refund(request.reason, request.metadata)
    }

    async fn get_refund(&self, id: &str) -> PaymentResult<Refund> {
        let response = self.client.get(&format!("/refunds/{}", path_id(id)?)).await?;
        let body: RefundBody = read_json(PROVIDER, "refund", id, response).await?;
        body.refund.into_refund(None, Metadata::new())
    }

    async fn list_refunds(
        &self,
        charge_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Refund>> {
        let response = self
            .client
            .get_query("/refunds", &[("limit", page_limit(limit).to_string())])
            .await?;
        let body: RefundList = read_json(PROVIDER, "refund", "", response).await?;
        body.refunds
            .into_iter()
            .filter(|r| charge_id.is_none_or(|c| r.payment_id == c))
            .map(|r| r.into_refund(None, Metadata::new()))
            .collect()
    }

    async fn create_dispute(&self, _request: DisputeRequest) -> PaymentResult<Dispute> {
        unsupported(PROVIDER, "creating disputes")
    }

    async fn get_dispute(&self, id: &str) -> PaymentResult<Dispute> {
        let response = self.client.get(&format!("/disputes/{}", path_id(id)?)).await?;
        let body: DisputeBody = read_json(PROVIDER, "dispute", id, response).await?;
        body.dispute.try_into()
    }

    async fn list_disputes(
        &self,
        charge_id: Option<&str>,
        limit: usize,
    ) -> PaymentResult<Vec<Dispute>> {
        let response = self.client.get("/disputes").await?;
        let body: DisputeList = read_json(PROVIDER, "dispute", "", response).await?;
        let limit = page_limit(limit);
        let mut disputes = Vec::new();
        for raw in body.disputes {
            let dispute = Dispute::try_from(raw)?;
            if charge_id.is_none_or(|c| dispute.charge_id == c) {
                disputes.push(dispute);
            }
            if disputes.len() == limit {
                break;
            }
        }
        Ok(disputes)
    }

    /// Accepting (closing as lost) is the only status change Square allows
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
            .post(&format!("/disputes/{}/accept", path_id(id)?), &json!({}))
            .await?;
        let body: DisputeBody = read_json(PROVIDER, "dispute", id, response).await?;
        body.dispute.try_into()
    }
}

// Square API types

#[derive(Debug, Deserialize)]
struct SquareMoney {
    amount: i64,
    currency: String,
}

impl TryFrom<&SquareMoney> for Money {
    type Error = PaymentError;

    fn try_from(sm: &SquareMoney) -> PaymentResult<Self> {
        Ok(Money::new(sm.amount, provider_currency(PROVIDER, &sm.currency)?))
    }
}

#[derive(Debug, Deserialize)]
struct CustomerBody {
    customer: SquareCustomer,
}

#[derive(Debug, Deserialize)]
struct SquareCustomer {
    id: String,
    email_address: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    phone_number: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SquareCustomer {
    fn into_customer(self, metadata: Metadata) -> Customer {
        let name = match (self.given_name, self.family_name) {
            (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
            (given, family) => given.or(family),
        };
        Customer {
            provider_id: self.id.clone(),
            id: self.id,
            email: self.email_address,
            name,
            phone: self.phone_number,
            description: self.note,
            metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
            provider: PROVIDER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CardBody {
    card: SquareCard,
}

#[derive(Debug, Deserialize)]
struct CardList {
    #[serde(default)]
    cards: Vec<SquareCard>,
}

#[derive(Debug, Deserialize)]
struct SquareCard {
    id: String,
    card_brand: String,
    last_4: String,
    exp_month: u32,
    exp_year: u32,
    customer_id: Option<String>,
    fingerprint: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl SquareCard {
    fn into_method(self, metadata: Metadata) -> PaymentMethod {
        PaymentMethod {
            provider_id: self.id.clone(),
            id: self.id,
            method_type: PaymentMethodType::Card,
            customer_id: self.customer_id,
            card: Some(CardInfo {
                brand: self.card_brand.to_ascii_lowercase(),
                last4: self.last_4,
                exp_month: self.exp_month,
                exp_year: self.exp_year,
                fingerprint: self.fingerprint,
            }),
            metadata,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            provider: PROVIDER.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaymentBody {
    payment: SquarePayment,
}

#[derive(Debug, Deserialize)]
struct PaymentList {
    #[serde(default)]
    payments: Vec<SquarePayment>,
}

#[derive(Debug, Deserialize)]
struct SquarePayment {
    id: String,
    status: String,
    amount_money: SquareMoney,
    refunded_money: Option<SquareMoney>,
    customer_id: Option<String>,
    source_type: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl SquarePayment {
    fn into_charge(self, metadata: Metadata) -> PaymentResult<Charge> {
        let amount = Money::try_from(&self.amount_money)?;
        let amount_refunded = self.refunded_money.as_ref().map_or(0, |m| m.amount);
        let status = ChargeStatus::from_provider(&self.status);
        Ok(Charge {
            provider_id: self.id.clone(),
            id: self.id,
            amount,
            amount_refunded,
            status,
            customer_id: self.customer_id,
            payment_method_id: self.source_type,
            description: self.note,
            failure_reason: None,
            captured: self.status == "COMPLETED",
            refunded: amount_refunded > 0 && amount_refunded >= amount.amount,
            disputed: false,
            metadata,
            created_at: self.created_at,
            provider: PROVIDER.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RefundBody {
    refund: SquareRefund,
}

#[derive(Debug, Deserialize)]
struct RefundList {
    #[serde(default)]
    refunds: Vec<SquareRefund>,
}

#[derive(Debug, Deserialize)]
struct SquareRefund {
    id: String,
    payment_id: String,
    status: String,
    amount_money: SquareMoney,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl SquareRefund {
    fn into_refund(
        self,
        requested: Option<RefundReason>,
        metadata: Metadata,
    ) -> PaymentResult<Refund> {
        Ok(Refund {
            provider_id: self.id.clone(),
            amount: Money::try_from(&self.amount_money)?,
            id: self.id,
            charge_id: self.payment_id,
            status: RefundStatus::from_provider(&self.status),
            reason: requested
                .or_else(|| self.reason.as_deref().and_then(RefundReason::from_provider)),
            metadata,
            created_at: self.created_at,
            provider: PROVIDER.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DisputeBody {
    dispute: SquareDispute,
}

#[derive(Debug, Deserialize)]
struct DisputeList {
    #[serde(default)]
    disputes: Vec<SquareDispute>,
}

#[derive(Debug, Deserialize)]
struct SquareDispute {
    id: Option<String>,
    dispute_id: Option<String>,
    amount_money: SquareMoney,
    reason: String,
    state: String,
    disputed_payment: Option<DisputedPayment>,
    #[serde(default)]
    evidence_ids: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct DisputedPayment {
    payment_id: String,
}

impl TryFrom<SquareDispute> for Dispute {
    type Error = PaymentError;

    fn try_from(sd: SquareDispute) -> PaymentResult<Self> {
        let mut evidence = HashMap::new();
        if !sd.evidence_ids.is_empty() {
            evidence.insert("has_evidence".to_string(), "true".to_string());
        }
        let id = sd.id.or(sd.dispute_id).unwrap_or_default();
        Ok(Self {
            provider_id: id.clone(),
            amount: Money::try_from(&sd.amount_money)?,
            id,
            charge_id: sd.disputed_payment.map(|p| p.payment_id).unwrap_or_default(),
            status: sd.state.parse().unwrap_or(DisputeStatus::NeedsResponse),
            reason: sd.reason.to_ascii_lowercase(),
            evidence,
            metadata: Metadata::new(),
            created_at: sd.created_at,
            updated_at: sd.updated_at,
            provider: PROVIDER.to_string(),
        })
    }
}
