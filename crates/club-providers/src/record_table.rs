use async_trait::async_trait;
use club_domain::error::{Error, Result};
use club_domain::record::RegistrationRecord;
use std::collections::HashMap;
use std::time::Duration;

use crate::health::HealthStatus;

#[derive(Debug, Clone)]
pub struct ExistingRecordLookup {
    pub record_id: String,
    pub played_last_season: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ShirtNumberAvailability {
    pub available: bool,
    pub conflict_count: u32,
}

/// A row store keyed by a provider-issued `billing_request_id` (spec C11).
#[async_trait]
pub trait RecordTable: Send + Sync {
    async fn find_by_parent_and_child(
        &self,
        parent_name: &str,
        child_name: &str,
    ) -> Result<Option<ExistingRecordLookup>>;

    async fn kit_needed(&self, team: &str, age_group: &str) -> Result<bool>;

    async fn shirt_number_availability(
        &self,
        team: &str,
        age_group: &str,
        number: u8,
    ) -> Result<ShirtNumberAvailability>;

    async fn upsert(&self, record: RegistrationRecord) -> Result<(String, bool)>;

    async fn get(&self, billing_request_id: &str) -> Result<Option<RegistrationRecord>>;

    /// Other rows with the same `parent_full_name` and `player_last_name`,
    /// a different `billing_request_id`, and `registration_status = active`
    /// (spec §4.9 sibling-discount query).
    async fn find_active_siblings(
        &self,
        parent_full_name: &str,
        player_last_name: &str,
        exclude_billing_request_id: &str,
    ) -> Result<Vec<RegistrationRecord>>;

    async fn health(&self) -> HealthStatus;
}

pub struct HttpRecordTable {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table_name: String,
}

impl HttpRecordTable {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, table_name: impl Into<String>) -> Self {
        HttpRecordTable {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            table_name: table_name.into(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.base_url, self.table_name)
    }
}

#[async_trait]
impl RecordTable for HttpRecordTable {
    async fn find_by_parent_and_child(
        &self,
        parent_name: &str,
        child_name: &str,
    ) -> Result<Option<ExistingRecordLookup>> {
        let resp = self
            .client
            .get(format!("{}/search", self.table_url()))
            .bearer_auth(&self.api_key)
            .query(&[("parent_full_name", parent_name), ("player_full_name", child_name)])
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("record_table", e.to_string(), e.is_timeout() || e.is_connect()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::adapter(
                "record_table",
                format!("status {}", resp.status()),
                resp.status().is_server_error(),
            ));
        }

        #[derive(serde::Deserialize)]
        struct Wire {
            record_id: String,
            played_last_season: bool,
        }
        let wire: Option<Wire> = resp
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid record table response: {e}")))?;

        Ok(wire.map(|w| ExistingRecordLookup {
            record_id: w.record_id,
            played_last_season: w.played_last_season,
        }))
    }

    async fn kit_needed(&self, team: &str, age_group: &str) -> Result<bool> {
        #[derive(serde::Deserialize)]
        struct Wire {
            kit_needed: bool,
        }
        let resp = self
            .client
            .get(format!("{}/kit_needed", self.table_url()))
            .bearer_auth(&self.api_key)
            .query(&[("team", team), ("age_group", age_group)])
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("record_table", e.to_string(), e.is_timeout() || e.is_connect()))?;
        let wire: Wire = resp
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid kit_needed response: {e}")))?;
        Ok(wire.kit_needed)
    }

    async fn shirt_number_availability(
        &self,
        team: &str,
        age_group: &str,
        number: u8,
    ) -> Result<ShirtNumberAvailability> {
        #[derive(serde::Deserialize)]
        struct Wire {
            available: bool,
            conflict_count: u32,
        }
        let resp = self
            .client
            .get(format!("{}/shirt_numbers", self.table_url()))
            .bearer_auth(&self.api_key)
            .query(&[("team", team), ("age_group", age_group), ("number", &number.to_string())])
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("record_table", e.to_string(), e.is_timeout() || e.is_connect()))?;
        let wire: Wire = resp
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid shirt_numbers response: {e}")))?;
        Ok(ShirtNumberAvailability {
            available: wire.available,
            conflict_count: wire.conflict_count,
        })
    }

    async fn upsert(&self, record: RegistrationRecord) -> Result<(String, bool)> {
        let existing = self.get(&record.billing_request_id).await?;
        let action_created = existing.is_none();
        let resp = self
            .client
            .put(format!("{}/{}", self.table_url(), record.billing_request_id))
            .bearer_auth(&self.api_key)
            .json(&record)
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("record_table", e.to_string(), e.is_timeout() || e.is_connect()))?;
        if !resp.status().is_success() {
            return Err(Error::adapter(
                "record_table",
                format!("status {}", resp.status()),
                resp.status().is_server_error(),
            ));
        }
        Ok((record.billing_request_id, action_created))
    }

    async fn get(&self, billing_request_id: &str) -> Result<Option<RegistrationRecord>> {
        let resp = self
            .client
            .get(format!("{}/{}", self.table_url(), billing_request_id))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("record_table", e.to_string(), e.is_timeout() || e.is_connect()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::adapter(
                "record_table",
                format!("status {}", resp.status()),
                resp.status().is_server_error(),
            ));
        }
        let record: RegistrationRecord = resp
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid record response: {e}")))?;
        Ok(Some(record))
    }

    async fn find_active_siblings(
        &self,
        parent_full_name: &str,
        player_last_name: &str,
        exclude_billing_request_id: &str,
    ) -> Result<Vec<RegistrationRecord>> {
        let resp = self
            .client
            .get(format!("{}/siblings", self.table_url()))
            .bearer_auth(&self.api_key)
            .query(&[
                ("parent_full_name", parent_full_name),
                ("player_last_name", player_last_name),
                ("exclude_billing_request_id", exclude_billing_request_id),
                ("registration_status", "active"),
            ])
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| Error::adapter("record_table", e.to_string(), e.is_timeout() || e.is_connect()))?;
        if !resp.status().is_success() {
            return Err(Error::adapter(
                "record_table",
                format!("status {}", resp.status()),
                resp.status().is_server_error(),
            ));
        }
        resp.json()
            .await
            .map_err(|e| Error::Other(format!("invalid siblings response: {e}")))
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

/// In-memory fake, also useful as the default store for local/dev runs
/// since the real record table is an external out-of-scope collaborator.
#[derive(Default)]
pub struct InMemoryRecordTable {
    records: parking_lot::Mutex<HashMap<String, RegistrationRecord>>,
    kit_needed_table: parking_lot::Mutex<HashMap<(String, String), bool>>,
    taken_shirt_numbers: parking_lot::Mutex<HashMap<(String, String, u8), u32>>,
}

impl InMemoryRecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_kit_needed(&self, team: &str, age_group: &str, needed: bool) {
        self.kit_needed_table
            .lock()
            .insert((team.to_string(), age_group.to_string()), needed);
    }

    pub fn seed_record(&self, record: RegistrationRecord) {
        self.records.lock().insert(record.billing_request_id.clone(), record);
    }
}

#[async_trait]
impl RecordTable for InMemoryRecordTable {
    async fn find_by_parent_and_child(
        &self,
        parent_name: &str,
        child_name: &str,
    ) -> Result<Option<ExistingRecordLookup>> {
        let records = self.records.lock();
        Ok(records
            .values()
            .find(|r| r.parent_full_name.eq_ignore_ascii_case(parent_name) && r.player_full_name.eq_ignore_ascii_case(child_name))
            .map(|r| ExistingRecordLookup {
                record_id: r.billing_request_id.clone(),
                played_last_season: true,
            }))
    }

    async fn kit_needed(&self, team: &str, age_group: &str) -> Result<bool> {
        Ok(*self
            .kit_needed_table
            .lock()
            .get(&(team.to_string(), age_group.to_string()))
            .unwrap_or(&true))
    }

    async fn shirt_number_availability(
        &self,
        team: &str,
        age_group: &str,
        number: u8,
    ) -> Result<ShirtNumberAvailability> {
        if !(1..=25).contains(&number) {
            return Err(Error::Validation(format!("out_of_range: {number}")));
        }
        let conflicts = *self
            .taken_shirt_numbers
            .lock()
            .get(&(team.to_string(), age_group.to_string(), number))
            .unwrap_or(&0);
        Ok(ShirtNumberAvailability {
            available: conflicts == 0,
            conflict_count: conflicts,
        })
    }

    async fn upsert(&self, record: RegistrationRecord) -> Result<(String, bool)> {
        let mut records = self.records.lock();
        let created = !records.contains_key(&record.billing_request_id);
        let id = record.billing_request_id.clone();
        records.insert(id.clone(), record);
        Ok((id, created))
    }

    async fn get(&self, billing_request_id: &str) -> Result<Option<RegistrationRecord>> {
        Ok(self.records.lock().get(billing_request_id).cloned())
    }

    async fn find_active_siblings(
        &self,
        parent_full_name: &str,
        player_last_name: &str,
        exclude_billing_request_id: &str,
    ) -> Result<Vec<RegistrationRecord>> {
        use club_domain::record::RegistrationStatus;
        let records = self.records.lock();
        Ok(records
            .values()
            .filter(|r| {
                r.parent_full_name.eq_ignore_ascii_case(parent_full_name)
                    && r.player_last_name().eq_ignore_ascii_case(player_last_name)
                    && r.billing_request_id != exclude_billing_request_id
                    && r.registration_status == RegistrationStatus::Active
            })
            .cloned()
            .collect())
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_domain::record::RegistrationStatus;

    #[tokio::test]
    async fn finds_active_sibling_by_surname() {
        let table = InMemoryRecordTable::new();
        let mut sibling = RegistrationRecord::new("br_1");
        sibling.parent_full_name = "John Smith".to_string();
        sibling.player_full_name = "Alice Smith".to_string();
        sibling.registration_status = RegistrationStatus::Active;
        table.seed_record(sibling);

        let found = table
            .find_active_siblings("John Smith", "Smith", "br_2")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].billing_request_id, "br_1");
    }

    #[tokio::test]
    async fn excludes_same_billing_request_id() {
        let table = InMemoryRecordTable::new();
        let mut r = RegistrationRecord::new("br_1");
        r.parent_full_name = "John Smith".to_string();
        r.player_full_name = "Alice Smith".to_string();
        r.registration_status = RegistrationStatus::Active;
        table.seed_record(r);

        let found = table
            .find_active_siblings("John Smith", "Smith", "br_1")
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
