use async_trait::async_trait;
use club_domain::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::health::HealthStatus;

#[derive(Debug, Clone)]
pub struct BillingRequest {
    pub billing_request_id: String,
    pub payment_url: String,
    pub signing_fee_pounds: f64,
    pub monthly_pounds: f64,
}

#[derive(Debug, Clone)]
pub struct SubscriptionIds {
    pub subscription_id: String,
    pub interim_subscription_id: Option<String>,
}

/// Billing requests, mandates and subscriptions (spec C11). Transport,
/// retries and credentials live inside the adapter; the core only sees
/// these semantic operations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_billing_request(&self, preferred_payment_day: i8) -> Result<BillingRequest>;
    async fn create_payment_link(&self, billing_request_id: &str) -> Result<String>;
    async fn create_subscription(
        &self,
        billing_request_id: &str,
        monthly_amount: f64,
        ongoing_start: chrono::NaiveDate,
        end_date: chrono::NaiveDate,
        interim: Option<(chrono::NaiveDate, chrono::NaiveDate)>,
    ) -> Result<SubscriptionIds>;
    async fn health(&self) -> HealthStatus;
}

pub struct HttpPaymentProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPaymentProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        HttpPaymentProvider {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BillingRequestWire {
    billing_request_id: String,
    payment_url: String,
    signing_fee_pounds: f64,
    monthly_pounds: f64,
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn create_billing_request(&self, preferred_payment_day: i8) -> Result<BillingRequest> {
        if !(preferred_payment_day == -1 || (1..=28).contains(&preferred_payment_day)) {
            return Err(Error::Validation(format!(
                "invalid_day: preferred_payment_day {preferred_payment_day} out of range"
            )));
        }
        let resp = self
            .client
            .post(format!("{}/billing_requests", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "preferred_payment_day": preferred_payment_day }))
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("payment", e.to_string(), e.is_timeout() || e.is_connect()))?;

        if !resp.status().is_success() {
            return Err(Error::adapter("payment", format!("status {}", resp.status()), resp.status().is_server_error()));
        }

        let wire: BillingRequestWire = resp
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid billing request response: {e}")))?;

        Ok(BillingRequest {
            billing_request_id: wire.billing_request_id,
            payment_url: wire.payment_url,
            signing_fee_pounds: wire.signing_fee_pounds,
            monthly_pounds: wire.monthly_pounds,
        })
    }

    async fn create_payment_link(&self, billing_request_id: &str) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/billing_requests/{billing_request_id}/payment_link", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("payment", e.to_string(), e.is_timeout() || e.is_connect()))?;

        if !resp.status().is_success() {
            return Err(Error::adapter("payment", format!("status {}", resp.status()), resp.status().is_server_error()));
        }

        #[derive(Deserialize)]
        struct Wire {
            payment_url: String,
        }
        let wire: Wire = resp
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid payment link response: {e}")))?;
        Ok(wire.payment_url)
    }

    async fn create_subscription(
        &self,
        billing_request_id: &str,
        monthly_amount: f64,
        ongoing_start: chrono::NaiveDate,
        end_date: chrono::NaiveDate,
        interim: Option<(chrono::NaiveDate, chrono::NaiveDate)>,
    ) -> Result<SubscriptionIds> {
        let resp = self
            .client
            .post(format!("{}/subscriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "billing_request_id": billing_request_id,
                "monthly_amount": monthly_amount,
                "ongoing_start": ongoing_start.to_string(),
                "end_date": end_date.to_string(),
                "interim": interim.map(|(s, e)| serde_json::json!({ "start": s.to_string(), "end": e.to_string() })),
            }))
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("payment", e.to_string(), e.is_timeout() || e.is_connect()))?;

        if !resp.status().is_success() {
            return Err(Error::adapter("payment", format!("status {}", resp.status()), resp.status().is_server_error()));
        }

        #[derive(Deserialize)]
        struct Wire {
            subscription_id: String,
            interim_subscription_id: Option<String>,
        }
        let wire: Wire = resp
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid subscription response: {e}")))?;

        Ok(SubscriptionIds {
            subscription_id: wire.subscription_id,
            interim_subscription_id: wire.interim_subscription_id,
        })
    }

    async fn health(&self) -> HealthStatus {
        match self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => HealthStatus::Healthy,
            Ok(_) => HealthStatus::Degraded,
            Err(_) => HealthStatus::Unreachable,
        }
    }
}

pub struct FakePaymentProvider;

#[async_trait]
impl PaymentProvider for FakePaymentProvider {
    async fn create_billing_request(&self, preferred_payment_day: i8) -> Result<BillingRequest> {
        Ok(BillingRequest {
            billing_request_id: format!("br_{preferred_payment_day}_fake"),
            payment_url: "https://pay.example.test/fake".to_string(),
            signing_fee_pounds: 30.0,
            monthly_pounds: 27.50,
        })
    }

    async fn create_payment_link(&self, billing_request_id: &str) -> Result<String> {
        Ok(format!("https://pay.example.test/{billing_request_id}"))
    }

    async fn create_subscription(
        &self,
        billing_request_id: &str,
        _monthly_amount: f64,
        _ongoing_start: chrono::NaiveDate,
        _end_date: chrono::NaiveDate,
        interim: Option<(chrono::NaiveDate, chrono::NaiveDate)>,
    ) -> Result<SubscriptionIds> {
        Ok(SubscriptionIds {
            subscription_id: format!("sub_{billing_request_id}"),
            interim_subscription_id: interim.map(|_| format!("interim_{billing_request_id}")),
        })
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
