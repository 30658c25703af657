use async_trait::async_trait;
use club_domain::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::health::HealthStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub struct LookedUpAddress {
    pub formatted_address: String,
    pub components: std::collections::BTreeMap<String, String>,
    pub confidence: Confidence,
}

#[async_trait]
pub trait AddressLookupProvider: Send + Sync {
    async fn lookup(&self, postcode: &str, house: &str) -> Result<LookedUpAddress>;
    async fn health(&self) -> HealthStatus;
}

pub struct HttpAddressLookupProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpAddressLookupProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        HttpAddressLookupProvider {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Wire {
    formatted_address: String,
    #[serde(default)]
    components: std::collections::BTreeMap<String, String>,
    confidence: String,
}

fn parse_confidence(s: &str) -> Confidence {
    match s {
        "high" => Confidence::High,
        "medium" => Confidence::Medium,
        _ => Confidence::Low,
    }
}

#[async_trait]
impl AddressLookupProvider for HttpAddressLookupProvider {
    async fn lookup(&self, postcode: &str, house: &str) -> Result<LookedUpAddress> {
        let resp = self
            .client
            .get(format!("{}/lookup", self.base_url))
            .query(&[("postcode", postcode), ("house", house)])
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("address_lookup", e.to_string(), e.is_timeout() || e.is_connect()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::Validation("not_found".to_string()));
        }
        if !resp.status().is_success() {
            return Err(Error::adapter(
                "address_lookup",
                format!("status {}", resp.status()),
                resp.status().is_server_error(),
            ));
        }

        let wire: Wire = resp
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid address lookup response: {e}")))?;

        Ok(LookedUpAddress {
            formatted_address: wire.formatted_address,
            components: wire.components,
            confidence: parse_confidence(&wire.confidence),
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

pub struct FakeAddressLookupProvider;

#[async_trait]
impl AddressLookupProvider for FakeAddressLookupProvider {
    async fn lookup(&self, postcode: &str, house: &str) -> Result<LookedUpAddress> {
        if postcode.eq_ignore_ascii_case("XX1 1XX") {
            return Err(Error::Validation("not_found".to_string()));
        }
        Ok(LookedUpAddress {
            formatted_address: format!("{house} Example Street, {postcode}"),
            components: std::collections::BTreeMap::new(),
            confidence: Confidence::High,
        })
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
