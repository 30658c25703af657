use std::sync::Arc;

use club_domain::config::Config;
use club_photo::{HeicDecoder, PhotoWorkerPool, ShellHeifDecoder, UnavailableHeicDecoder, UploadStatusStore};
use club_providers::model::{HttpModelProvider, ModelProvider};
use club_providers::{
    AddressLookupProvider, HealthStatus, HttpAddressLookupProvider, HttpObjectStore, HttpPaymentProvider,
    HttpRecordTable, HttpSmsProvider, ObjectStore, PaymentProvider, RecordTable, SmsProvider,
};
use club_routine::agent::AgentVariant;
use club_sessions::{SessionLockMap, SessionStore};
use club_tools::ToolRegistry;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

/// Shared application state passed to all API handlers. Built once at
/// startup from the loaded `Config`; every field is cheap to clone so the
/// whole struct derives `Clone` for use as axum router state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub session_locks: Arc<SessionLockMap>,
    pub tools: Arc<ToolRegistry>,
    pub model: Arc<dyn ModelProvider>,
    pub upload_status: Arc<UploadStatusStore>,
    pub photo_workers: Arc<PhotoWorkerPool>,
    /// SHA-256 digest of the configured API bearer token. `None` means auth
    /// is disabled (dev mode) — set once at startup in `main`.
    pub api_token_hash: Option<Arc<Vec<u8>>>,
    /// Agent variant a turn falls back to when it carries no routine/agent
    /// hint and the message doesn't parse as a registration code. Switched
    /// at runtime via `POST /agent/mode`.
    pub default_agent_mode: Arc<RwLock<AgentVariant>>,
}

impl AppState {
    /// Builds the live adapter set from `config`, reading each adapter's API
    /// key from the environment variable its config section names.
    pub fn from_config(config: Arc<Config>) -> Self {
        let model: Arc<dyn ModelProvider> = Arc::new(HttpModelProvider::new(
            config.model.base_url.clone().unwrap_or_default(),
            std::env::var(&config.model.api_key_env).unwrap_or_default(),
        ));

        let address_lookup: Arc<dyn AddressLookupProvider> = Arc::new(HttpAddressLookupProvider::new(
            config.address_lookup.base_url.clone().unwrap_or_default(),
            std::env::var(&config.address_lookup.api_key_env).unwrap_or_default(),
        ));

        let record_table: Arc<dyn RecordTable> = Arc::new(HttpRecordTable::new(
            config.record_table.base_url.clone().unwrap_or_default(),
            std::env::var(&config.record_table.api_key_env).unwrap_or_default(),
            config.record_table.table_name.clone(),
        ));

        let payment: Arc<dyn PaymentProvider> = Arc::new(HttpPaymentProvider::new(
            config.payment.base_url.clone().unwrap_or_default(),
            std::env::var(&config.payment.api_key_env).unwrap_or_default(),
        ));

        let sms: Arc<dyn SmsProvider> = Arc::new(HttpSmsProvider::new(
            String::new(),
            std::env::var(&config.sms.api_key_env).unwrap_or_default(),
            config.sms.sender_id.clone(),
        ));

        let object_store: Arc<dyn ObjectStore> = Arc::new(HttpObjectStore::new(
            String::new(),
            config.object_store.bucket.clone(),
            std::env::var(&config.object_store.access_key_env).unwrap_or_default(),
            std::env::var(&config.object_store.secret_key_env).unwrap_or_default(),
        ));

        let heic_decoder: Arc<dyn HeicDecoder> = match which_heif_convert() {
            Some(_) => Arc::new(ShellHeifDecoder::default()),
            None => {
                tracing::warn!(
                    "heif-convert not found on PATH — HEIC uploads will fall back to the original image"
                );
                Arc::new(UnavailableHeicDecoder)
            }
        };

        let tools = Arc::new(ToolRegistry {
            address_lookup,
            record_table,
            payment,
            sms,
            object_store,
            heic_decoder,
        });

        let api_token_hash = match std::env::var(&config.server.api_token_env) {
            Ok(token) if !token.is_empty() => {
                tracing::info!(env_var = %config.server.api_token_env, "API bearer-token auth enabled");
                Some(Arc::new(Sha256::digest(token.as_bytes()).to_vec()))
            }
            _ => {
                tracing::warn!(
                    env_var = %config.server.api_token_env,
                    "API bearer-token auth DISABLED — set this env var to enable"
                );
                None
            }
        };

        AppState {
            sessions: Arc::new(SessionStore::new()),
            session_locks: Arc::new(SessionLockMap::new()),
            photo_workers: Arc::new(PhotoWorkerPool::new(config.photo.worker_pool_size)),
            upload_status: Arc::new(UploadStatusStore::default()),
            api_token_hash,
            default_agent_mode: Arc::new(RwLock::new(AgentVariant::Generic)),
            config,
            tools,
            model,
        }
    }

    /// Aggregates every adapter's `health()` call for the `/health` endpoint
    /// (spec §6). Each adapter is queried independently so one slow or dead
    /// dependency doesn't block reporting on the others.
    pub async fn adapter_health(&self) -> Vec<(&'static str, HealthStatus)> {
        vec![
            ("model", self.model.health().await),
            ("address_lookup", self.tools.address_lookup.health().await),
            ("record_table", self.tools.record_table.health().await),
            ("payment", self.tools.payment.health().await),
            ("sms", self.tools.sms.health().await),
            ("object_store", self.tools.object_store.health().await),
        ]
    }
}

fn which_heif_convert() -> Option<std::path::PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join("heif-convert"))
        .find(|candidate| candidate.is_file())
}
