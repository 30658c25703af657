use async_trait::async_trait;
use club_domain::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::health::HealthStatus;

#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<String>;
    async fn health(&self) -> HealthStatus;
}

fn validate_uk_mobile(phone: &str) -> Result<()> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let looks_valid = digits.starts_with("07") && digits.len() == 11
        || digits.starts_with("447") && digits.len() == 12;
    if looks_valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid_phone: {phone}")))
    }
}

pub struct HttpSmsProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    sender_id: String,
}

impl HttpSmsProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, sender_id: impl Into<String>) -> Self {
        HttpSmsProvider {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            sender_id: sender_id.into(),
        }
    }
}

#[async_trait]
impl SmsProvider for HttpSmsProvider {
    async fn send(&self, phone: &str, message: &str) -> Result<String> {
        validate_uk_mobile(phone)?;
        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "to": phone,
                "from": self.sender_id,
                "body": message,
            }))
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("sms", e.to_string(), e.is_timeout() || e.is_connect()))?;

        if !resp.status().is_success() {
            return Err(Error::adapter("sms", format!("status {}", resp.status()), resp.status().is_server_error()));
        }

        #[derive(Deserialize)]
        struct Wire {
            message_id: String,
        }
        let wire: Wire = resp
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid sms response: {e}")))?;
        Ok(wire.message_id)
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

pub struct FakeSmsProvider;

#[async_trait]
impl SmsProvider for FakeSmsProvider {
    async fn send(&self, phone: &str, _message: &str) -> Result<String> {
        validate_uk_mobile(phone)?;
        Ok("msg_fake".to_string())
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_standard_uk_mobile() {
        assert!(validate_uk_mobile("07123456789").is_ok());
    }

    #[test]
    fn rejects_landline() {
        assert!(validate_uk_mobile("01234567890").is_err());
    }
}
