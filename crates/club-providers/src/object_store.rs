use async_trait::async_trait;
use club_domain::error::{Error, Result};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::health::HealthStatus;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<String>;
    async fn health(&self) -> HealthStatus;
}

pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    access_key: String,
    secret_key: String,
}

impl HttpObjectStore {
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        HttpObjectStore {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            bucket: bucket.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<String> {
        let mut req = self
            .client
            .put(format!("{}/{}/{}", self.base_url, self.bucket, key))
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .header("content-type", content_type)
            .timeout(Duration::from_secs(60))
            .body(bytes);

        for (k, v) in &metadata {
            req = req.header(format!("x-amz-meta-{k}"), v.clone());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::adapter("object_store", e.to_string(), e.is_timeout() || e.is_connect()))?;

        if !resp.status().is_success() {
            return Err(Error::adapter(
                "object_store",
                format!("status {}", resp.status()),
                resp.status().is_server_error(),
            ));
        }

        Ok(format!("{}/{}/{}", self.base_url, self.bucket, key))
    }

    async fn health(&self) -> HealthStatus {
        match self
            .client
            .get(format!("{}/{}", self.base_url, self.bucket))
            .basic_auth(&self.access_key, Some(&self.secret_key))
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

pub struct FakeObjectStore {
    pub uploaded: parking_lot::Mutex<Vec<(String, usize)>>,
}

impl Default for FakeObjectStore {
    fn default() -> Self {
        FakeObjectStore {
            uploaded: parking_lot::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
        _metadata: BTreeMap<String, String>,
    ) -> Result<String> {
        self.uploaded.lock().push((key.to_string(), bytes.len()));
        Ok(format!("https://fake-store.example.test/{key}"))
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
