use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
    /// Env var holding the bearer token protected routes require. Unset or
    /// empty disables auth (dev mode).
    pub api_token_env: String,
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: d_host(),
            port: d_port(),
            cors: CorsConfig::default(),
            api_token_env: "CLUB_API_TOKEN".to_string(),
            rate_limit: None,
        }
    }
}

fn d_host() -> String {
    "0.0.0.0".to_string()
}
fn d_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        CorsConfig {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub max_tool_loops: u32,
    pub turn_deadline_secs: u64,
    pub call_deadline_secs: u64,
    pub retry_attempts: u32,
    pub retry_base_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "MODEL_API_KEY".to_string(),
            base_url: None,
            max_tool_loops: d_max_tool_loops(),
            turn_deadline_secs: d_turn_deadline_secs(),
            call_deadline_secs: d_call_deadline_secs(),
            retry_attempts: d_retry_attempts(),
            retry_base_ms: d_retry_base_ms(),
        }
    }
}

fn d_max_tool_loops() -> u32 {
    8
}
fn d_turn_deadline_secs() -> u64 {
    120
}
fn d_call_deadline_secs() -> u64 {
    30
}
fn d_retry_attempts() -> u32 {
    3
}
fn d_retry_base_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub api_key_env: String,
    pub webhook_secret_env: String,
    pub base_url: Option<String>,
    pub dev_mode_allow_empty_secret: bool,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        PaymentConfig {
            api_key_env: "PAYMENT_API_KEY".to_string(),
            webhook_secret_env: "PAYMENT_WEBHOOK_SECRET".to_string(),
            base_url: None,
            dev_mode_allow_empty_secret: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_env: String,
    pub secret_key_env: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        ObjectStoreConfig {
            bucket: String::new(),
            region: "eu-west-2".to_string(),
            access_key_env: "OBJECT_STORE_ACCESS_KEY".to_string(),
            secret_key_env: "OBJECT_STORE_SECRET_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressLookupConfig {
    pub api_key_env: String,
    pub base_url: Option<String>,
}

impl Default for AddressLookupConfig {
    fn default() -> Self {
        AddressLookupConfig {
            api_key_env: "ADDRESS_LOOKUP_API_KEY".to_string(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub api_key_env: String,
    pub sender_id: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        SmsConfig {
            api_key_env: "SMS_API_KEY".to_string(),
            sender_id: "ClubReg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordTableConfig {
    pub api_key_env: String,
    pub table_name: String,
    pub base_url: Option<String>,
}

impl Default for RecordTableConfig {
    fn default() -> Self {
        RecordTableConfig {
            api_key_env: "RECORD_TABLE_API_KEY".to_string(),
            table_name: "registrations".to_string(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonConfig {
    pub current_season: String,
    pub season_cutoff: String,
    pub season_end: String,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        SeasonConfig {
            current_season: d_current_season(),
            season_cutoff: "2025-08-28".to_string(),
            season_end: "2026-05-31".to_string(),
        }
    }
}

fn d_current_season() -> String {
    "2526".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLifecycleConfig {
    pub idle_timeout_hours: u64,
}

impl Default for SessionLifecycleConfig {
    fn default() -> Self {
        SessionLifecycleConfig {
            idle_timeout_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    pub use_async_photo: bool,
    pub worker_pool_size: usize,
    pub max_upload_bytes: u64,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        PhotoConfig {
            use_async_photo: false,
            worker_pool_size: 4,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// One row of the team table the registration-code parser resolves
/// `(team, age)` against (see `club_routine::code::TeamResolver`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamEntry {
    pub team: String,
    pub ages: Vec<String>,
}

fn d_teams() -> Vec<TeamEntry> {
    let ages: Vec<String> = (7..=18).map(|n| format!("U{n}")).collect();
    vec![
        TeamEntry { team: "Lions".to_string(), ages: ages.clone() },
        TeamEntry { team: "Tigers".to_string(), ages: ages.clone() },
        TeamEntry { team: "Panthers".to_string(), ages },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub payment: PaymentConfig,
    pub object_store: ObjectStoreConfig,
    pub address_lookup: AddressLookupConfig,
    pub sms: SmsConfig,
    pub record_table: RecordTableConfig,
    pub season: SeasonConfig,
    pub sessions: SessionLifecycleConfig,
    pub photo: PhotoConfig,
    /// Teams the registration-code parser may resolve against. Real team
    /// management lives outside this system; this list is the operator-
    /// configured substitute (see SPEC_FULL.md Open Questions).
    pub teams: Vec<TeamEntry>,
    /// Enables the development-only debug fixtures mentioned in spec design
    /// notes. Left false by default; no debug fixture codes are wired up
    /// (see SPEC_FULL.md Open Questions).
    pub dev_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            payment: PaymentConfig::default(),
            object_store: ObjectStoreConfig::default(),
            address_lookup: AddressLookupConfig::default(),
            sms: SmsConfig::default(),
            record_table: RecordTableConfig::default(),
            season: SeasonConfig::default(),
            sessions: SessionLifecycleConfig::default(),
            photo: PhotoConfig::default(),
            teams: d_teams(),
            dev_mode: false,
        }
    }
}

impl Config {
    pub fn load(path: Option<&std::path::Path>) -> crate::error::Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)?;
                toml::from_str(&raw)
                    .map_err(|e| crate::error::Error::Fatal(format!("invalid config file: {e}")))?
            }
            _ => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(model) = std::env::var("MODEL_ID") {
            self.model.model = model;
        }
        if let Ok(flag) = std::env::var("USE_ASYNC_PHOTO") {
            self.photo.use_async_photo = matches!(flag.as_str(), "1" | "true" | "TRUE" | "yes");
        }
        if let Ok(season) = std::env::var("CURRENT_SEASON") {
            self.season.current_season = season;
        }
        if let Ok(flag) = std::env::var("DEV_MODE") {
            self.dev_mode = matches!(flag.as_str(), "1" | "true" | "TRUE" | "yes");
        }
    }

    /// Validates the configuration, returning a list of issues. `Error`
    /// severity issues should cause the process to exit(1) at startup.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if std::env::var(&self.model.api_key_env).is_err() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: format!("model API key env var {} is not set", self.model.api_key_env),
            });
        }

        if std::env::var(&self.payment.webhook_secret_env).is_err()
            && !self.payment.dev_mode_allow_empty_secret
        {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: format!(
                    "payment webhook secret env var {} is not set and dev_mode_allow_empty_secret is false",
                    self.payment.webhook_secret_env
                ),
            });
        }

        if self.object_store.bucket.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "object_store.bucket is empty".to_string(),
            });
        }

        if self.season.current_season.len() != 4 || !self.season.current_season.chars().all(|c| c.is_ascii_digit())
        {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: format!("season.current_season {:?} is not a 4-digit code", self.season.current_season),
            });
        }

        issues
    }

    pub fn has_fatal_issues(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == ConfigSeverity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_season() {
        let config = Config::default();
        assert_eq!(config.season.current_season, "2526");
        assert_eq!(config.sessions.idle_timeout_hours, 24);
    }

    #[test]
    fn validate_flags_bad_season_code() {
        let mut config = Config::default();
        config.season.current_season = "abc".to_string();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.severity == ConfigSeverity::Error));
    }
}
