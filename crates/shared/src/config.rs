//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Payment provider configuration.
    pub provider: ProviderConfig,
    /// Settlement policy.
    #[serde(default)]
    pub settlement: SettlementConfig,
    /// Reconciliation worker schedule.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// Log output.
    #[serde(default)]
    pub log: LogConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
///
/// Tokens are issued elsewhere; this service only verifies them.
#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    /// Shared HMAC secret used to verify tokens.
    pub secret: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[hidden]")
            .finish()
    }
}

/// Payment provider configuration.
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider REST API.
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// Secret API key, sent as a bearer token.
    pub secret_key: String,
    /// Secret used to sign webhooks. Falls back to `secret_key`.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// Upper bound for every provider call.
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Returns the secret used for webhook signatures.
    #[must_use]
    pub fn webhook_secret(&self) -> &str {
        self.webhook_secret.as_deref().unwrap_or(&self.secret_key)
    }

    /// Returns the call timeout.
    #[must_use]
    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("secret_key", &"[hidden]")
            .field("webhook_secret", &"[hidden]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_provider_base_url() -> String {
    "https://api.budpay.com/api/v2".to_string()
}

fn default_provider_timeout() -> u64 {
    15
}

/// Settlement policy.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    /// Platform fee rate applied to product payments.
    #[serde(default = "default_fee_rate", with = "rust_decimal::serde::str")]
    pub fee_rate: Decimal,
    /// Currency that payments settle in.
    #[serde(default = "default_currency")]
    pub currency: Currency,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            fee_rate: default_fee_rate(),
            currency: default_currency(),
        }
    }
}

fn default_fee_rate() -> Decimal {
    Decimal::new(15, 3)
}

fn default_currency() -> Currency {
    Currency::Ngn
}

/// Reconciliation worker schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Seconds between sweeps.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Maximum exceptions examined per sweep.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Age after which a still-pending settlement leg counts as abandoned.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,
}

impl ReconciliationConfig {
    /// Returns the abandonment threshold.
    #[must_use]
    pub const fn stale_after(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.stale_after_secs)
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            batch_size: default_batch_size(),
            stale_after_secs: default_stale_after(),
        }
    }
}

fn default_interval() -> u64 {
    60
}

fn default_batch_size() -> u64 {
    50
}

fn default_stale_after() -> u64 {
    300
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("VAULTLINE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
