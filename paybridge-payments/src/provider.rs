//! Gateway trait and shared HTTP plumbing for adapters

use crate::capabilities::GatewayCapabilities;
use crate::error::{PaymentError, PaymentResult};
use crate::money::Currency;
use crate::types::*;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Provider-neutral payment gateway.
///
/// Implement this trait once per processor. Customers and charges are
/// mandatory; every other operation defaults to
/// [`PaymentError::NotSupported`] so a partial adapter still works for the
/// features it has. Each call is a future, and dropping it cancels the
/// request.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registry name of this provider
    fn provider_name(&self) -> &str;

    /// Static capabilities, identical on every call
    fn capabilities(&self) -> &GatewayCapabilities;

    // Customers

    async fn create_customer(&self, request: CustomerRequest) -> PaymentResult<Customer>;

    async fn get_customer(&self, id: &str) -> PaymentResult<Customer>;

    async fn update_customer(
        &self,
        _id: &str,
        _request: CustomerRequest,
    ) -> PaymentResult<Customer> {
        unsupported(self.provider_name(), "customer updates")
    }

    async fn delete_customer(&self, _id: &str) -> PaymentResult<()> {
        unsupported(self.provider_name(), "customer deletion")
    }

    // Payment methods

    async fn add_payment_method(
        &self,
        _request: PaymentMethodRequest,
    ) -> PaymentResult<PaymentMethod> {
        unsupported(self.provider_name(), "payment methods")
    }

    async fn get_payment_method(&self, _id: &str) -> PaymentResult<PaymentMethod> {
        unsupported(self.provider_name(), "payment methods")
    }

    async fn list_payment_methods(
        &self,
        _customer_id: &str,
        _limit: usize,
    ) -> PaymentResult<Vec<PaymentMethod>> {
        unsupported(self.provider_name(), "payment methods")
    }

    async fn detach_payment_method(&self, _id: &str) -> PaymentResult<()> {
        unsupported(self.provider_name(), "payment methods")
    }

    // Charges

    async fn create_charge(&self, request: ChargeRequest) -> PaymentResult<Charge>;

    async fn get_charge(&self, id: &str) -> PaymentResult<Charge>;

    async fn list_charges(
        &self,
        _customer_id: Option<&str>,
        _limit: usize,
    ) -> PaymentResult<Vec<Charge>> {
        unsupported(self.provider_name(), "listing charges")
    }

    // Refunds

    async fn create_refund(&self, _request: RefundRequest) -> PaymentResult<Refund> {
        unsupported(self.provider_name(), "refunds")
    }

    async fn get_refund(&self, _id: &str) -> PaymentResult<Refund> {
        unsupported(self.provider_name(), "refunds")
    }

    async fn list_refunds(
        &self,
        _charge_id: Option<&str>,
        _limit: usize,
    ) -> PaymentResult<Vec<Refund>> {
        unsupported(self.provider_name(), "refunds")
    }

    // Disputes

    async fn create_dispute(&self, _request: DisputeRequest) -> PaymentResult<Dispute> {
        unsupported(self.provider_name(), "creating disputes")
    }

    async fn get_dispute(&self, _id: &str) -> PaymentResult<Dispute> {
        unsupported(self.provider_name(), "disputes")
    }

    async fn list_disputes(
        &self,
        _charge_id: Option<&str>,
        _limit: usize,
    ) -> PaymentResult<Vec<Dispute>> {
        unsupported(self.provider_name(), "disputes")
    }

    async fn update_dispute_status(
        &self,
        _id: &str,
        _status: DisputeStatus,
    ) -> PaymentResult<Dispute> {
        unsupported(self.provider_name(), "dispute status updates")
    }

    // Subscriptions

    async fn create_subscription(
        &self,
        _request: SubscriptionRequest,
    ) -> PaymentResult<Subscription> {
        unsupported(self.provider_name(), "subscriptions")
    }

    async fn get_subscription(&self, _id: &str) -> PaymentResult<Subscription> {
        unsupported(self.provider_name(), "subscriptions")
    }

    async fn cancel_subscription(
        &self,
        _id: &str,
        _at_period_end: bool,
    ) -> PaymentResult<Subscription> {
        unsupported(self.provider_name(), "subscriptions")
    }
}

/// Shorthand for a `NotSupported` result
pub fn unsupported<T>(provider: &str, feature: &str) -> PaymentResult<T> {
    Err(PaymentError::not_supported(provider, feature))
}

/// HTTP client for provider APIs
///
/// Sends bearer-authenticated requests relative to a base URL.
#[derive(Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
    headers: Vec<(&'static str, String)>,
}

impl ProviderClient {
    /// Create a new provider client
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            headers: Vec::new(),
        }
    }

    /// Use a client with a request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> PaymentResult<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Send this header on every request
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .client
            .request(method, &url)
            .bearer_auth(self.token.expose_secret());
        for (name, value) in &self.headers {
            builder = builder.header(*name, value);
        }
        builder
    }

    /// GET request
    pub async fn get(&self, path: &str) -> PaymentResult<Response> {
        Ok(self.request(reqwest::Method::GET, path).send().await?)
    }

    /// GET request with query parameters
    pub async fn get_query<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        query: &T,
    ) -> PaymentResult<Response> {
        Ok(self
            .request(reqwest::Method::GET, path)
            .query(query)
            .send()
            .await?)
    }

    /// POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> PaymentResult<Response> {
        Ok(self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await?)
    }

    /// PUT request with JSON body
    pub async fn put<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> PaymentResult<Response> {
        Ok(self
            .request(reqwest::Method::PUT, path)
            .json(body)
            .send()
            .await?)
    }

    /// PATCH request with JSON body
    pub async fn patch<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> PaymentResult<Response> {
        Ok(self
            .request(reqwest::Method::PATCH, path)
            .json(body)
            .send()
            .await?)
    }

    /// POST request with form body
    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> PaymentResult<Response> {
        Ok(self
            .request(reqwest::Method::POST, path)
            .form(body)
            .send()
            .await?)
    }

    /// DELETE request
    pub async fn delete(&self, path: &str) -> PaymentResult<Response> {
        Ok(self.request(reqwest::Method::DELETE, path).send().await?)
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Decode a provider response.
///
/// 404 becomes `NotFound { resource, id }`; any other non-success status
/// becomes `Upstream` carrying the provider's own error message when the
/// body has one.
pub async fn read_json<T: DeserializeOwned>(
    provider: &str,
    resource: &str,
    id: &str,
    response: Response,
) -> PaymentResult<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(PaymentError::not_found(resource, id));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PaymentError::upstream(provider, error_message(status, &body)));
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        PaymentError::upstream(provider, format!("invalid {} response: {}", resource, e))
    })
}

/// Map a processor currency code onto [`Currency`].
///
/// An unknown code is an upstream error; relabelling the amount in a default
/// currency would misstate the payment.
pub fn provider_currency(provider: &str, code: &str) -> PaymentResult<Currency> {
    Currency::from_code(code)
        .ok_or_else(|| PaymentError::upstream(provider, format!("unsupported currency '{}'", code)))
}

/// Percent-encode a resource id as one URL path segment.
///
/// Ids reach request paths from callers and from webhook payloads, so `/`,
/// `?`, `#` and `%` are escaped. Empty and dot-segment ids are rejected.
pub fn path_id(id: &str) -> PaymentResult<String> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(PaymentError::Validation(format!("invalid resource id '{}'", id)));
    }
    let mut url = url::Url::parse("http://localhost/")
        .map_err(|e| PaymentError::Config(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| PaymentError::Config("base URL cannot hold path segments".into()))?
        .clear()
        .push(id);
    Ok(url.path().trim_start_matches('/').to_string())
}

/// Like [`read_json`] for calls whose body is ignored
pub async fn expect_success(
    provider: &str,
    resource: &str,
    id: &str,
    response: Response,
) -> PaymentResult<()> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(PaymentError::not_found(resource, id));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PaymentError::upstream(provider, error_message(status, &body)));
    }
    Ok(())
}

/// Best-effort message from the error body shapes processors use
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.pointer("/error/detail"))
            .or_else(|| v.pointer("/errors/0/detail"))
            .or_else(|| v.pointer("/message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    match message {
        Some(message) => format!("{} ({})", message, status.as_u16()),
        None => format!("request failed with status {}", status.as_u16()),
    }
}
