use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookResource {
    Payments,
    Mandates,
    BillingRequests,
    Subscriptions,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEvent {
    pub id: String,
    pub resource: WebhookResource,
    pub action: String,
    #[serde(default)]
    pub links: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Processed,
    Ignored,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventResult {
    pub id: String,
    pub status: EventStatus,
    pub reason: Option<String>,
}
