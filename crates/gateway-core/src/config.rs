//! Application configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in the `default_*` functions below
//! 2. **Config file**: TOML file specified by `GATEWAY_CONFIG`
//! 3. **Environment variables**: `GATEWAY_*` vars override specific fields
//!    (double underscore as section separator, e.g.
//!    `GATEWAY_ENDPOINTS__STUB`)
//!
//! Configuration is validated at load time; invalid endpoint URLs or
//! zero-valued bounds return errors rather than failing at the first
//! request.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on. Defaults to `8080`.
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Maximum concurrent in-flight requests. Defaults to `1000`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Maximum inbound request body size in bytes. Defaults to 2 MiB.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8080
}

fn default_max_concurrent_requests() -> usize {
    1000
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_concurrent_requests: default_max_concurrent_requests(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Backend endpoint URLs and the domain groups routed to them.
///
/// Each domain routes to its direct application path (PO) when the
/// request's function name is the literal `"service"`, and to the
/// enterprise service bus (ESB) otherwise. The stub endpoint is a
/// performance-test backend selected by a company-code header override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    pub ord_po: String,
    pub ord_esb: String,
    pub crm_po: String,
    pub crm_esb: String,
    pub stub: String,

    /// Application names handled by the order-domain strategy.
    #[serde(default = "default_ord_domain_group")]
    pub ord_domain_group: Vec<String>,

    /// Application names handled by the customer-domain strategy.
    #[serde(default = "default_crm_domain_group")]
    pub crm_domain_group: Vec<String>,
}

fn default_ord_domain_group() -> Vec<String> {
    vec!["ORD".to_string(), "ORD1".to_string(), "NORD".to_string()]
}

fn default_crm_domain_group() -> Vec<String> {
    vec!["CRM".to_string(), "CRM1".to_string(), "NCRM".to_string()]
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            ord_po: "http://localhost:9081/ord/po".to_string(),
            ord_esb: "http://localhost:9082/ord/esb".to_string(),
            crm_po: "http://localhost:9083/crm/po".to_string(),
            crm_esb: "http://localhost:9084/crm/esb".to_string(),
            stub: "http://localhost:9090/stub".to_string(),
            ord_domain_group: default_ord_domain_group(),
            crm_domain_group: default_crm_domain_group(),
        }
    }
}

/// Outbound HTTP client settings: pool shape, timeouts, and body bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Connect timeout in milliseconds. Defaults to `5000`.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-call response timeout in milliseconds. Defaults to `80000`.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Maximum pooled idle connections per backend host. Defaults to `100`.
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    /// Idle connection eviction in seconds. Defaults to `30`.
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,

    /// Maximum concurrent outbound calls. Defaults to `100`.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// How long a caller may wait for an outbound slot before failing
    /// fast, in milliseconds. Defaults to `500`.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Maximum in-memory response body size in bytes. Defaults to 10 MiB.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_call_timeout_ms() -> u64 {
    80_000
}

fn default_pool_max_idle_per_host() -> usize {
    100
}

fn default_pool_idle_timeout_secs() -> u64 {
    30
}

fn default_max_in_flight() -> usize {
    100
}

fn default_acquire_timeout_ms() -> u64 {
    500
}

fn default_max_response_bytes() -> usize {
    10 * 1024 * 1024
}

impl ClientConfig {
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
            max_in_flight: default_max_in_flight(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

/// Route-level retry with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first call. Defaults to `3`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds. Defaults to `1000`.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff cap in milliseconds. Defaults to `5000`.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Multiplicative backoff factor. Defaults to `2.0`.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    5000
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

/// Circuit breaker thresholds and window shape, applied per backend route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Rolling outcome window size (count-based). Defaults to `20`.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Minimum sampled calls before rates are evaluated. Defaults to `10`.
    #[serde(default = "default_min_calls")]
    pub min_calls: u32,

    /// Failure-rate threshold in percent. Defaults to `50.0`.
    #[serde(default = "default_failure_rate_threshold")]
    pub failure_rate_threshold: f64,

    /// Slow-call-rate threshold in percent. Defaults to `80.0`.
    #[serde(default = "default_slow_rate_threshold")]
    pub slow_rate_threshold: f64,

    /// Duration above which a successful call counts as slow, in
    /// milliseconds. Defaults to `60000`.
    #[serde(default = "default_slow_call_ms")]
    pub slow_call_ms: u64,

    /// Open-state cooldown before half-open trials, in seconds.
    /// Defaults to `30`.
    #[serde(default = "default_open_cooldown_secs")]
    pub open_cooldown_secs: u64,

    /// Trial calls admitted while half-open. Defaults to `3`.
    #[serde(default = "default_half_open_permits")]
    pub half_open_permits: u32,
}

fn default_window_size() -> usize {
    20
}

fn default_min_calls() -> u32 {
    10
}

fn default_failure_rate_threshold() -> f64 {
    50.0
}

fn default_slow_rate_threshold() -> f64 {
    80.0
}

fn default_slow_call_ms() -> u64 {
    60_000
}

fn default_open_cooldown_secs() -> u64 {
    30
}

fn default_half_open_permits() -> u32 {
    3
}

impl BreakerConfig {
    #[must_use]
    pub fn slow_call_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_call_ms)
    }

    #[must_use]
    pub fn open_cooldown(&self) -> Duration {
        Duration::from_secs(self.open_cooldown_secs)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            min_calls: default_min_calls(),
            failure_rate_threshold: default_failure_rate_threshold(),
            slow_rate_threshold: default_slow_rate_threshold(),
            slow_call_ms: default_slow_call_ms(),
            open_cooldown_secs: default_open_cooldown_secs(),
            half_open_permits: default_half_open_permits(),
        }
    }
}

/// Gateway node identity and pipeline-level bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// This node's own address, carried as `clntIp` in the common header.
    /// The legacy protocol records the gateway address, not the caller's.
    #[serde(default = "default_node_ip")]
    pub node_ip: String,

    /// Overall per-request timeout in milliseconds, independent of the
    /// per-call timeout. Defaults to `90000`.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_node_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_request_timeout_ms() -> u64 {
    90_000
}

impl GatewayConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            node_ip: default_node_ip(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `pretty` or `json`. Defaults to `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from defaults, an optional TOML file, and
    /// `GATEWAY_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, a field fails
    /// to deserialize, or validation rejects the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let loaded: Self = builder
            .add_source(Environment::with_prefix("GATEWAY").separator("__"))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Validates cross-field constraints that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Message`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, endpoint) in [
            ("ord_po", &self.endpoints.ord_po),
            ("ord_esb", &self.endpoints.ord_esb),
            ("crm_po", &self.endpoints.crm_po),
            ("crm_esb", &self.endpoints.crm_esb),
            ("stub", &self.endpoints.stub),
        ] {
            url::Url::parse(endpoint).map_err(|e| {
                ConfigError::Message(format!("endpoints.{name} is not a valid URL: {e}"))
            })?;
        }

        if self.client.max_in_flight == 0 {
            return Err(ConfigError::Message("client.max_in_flight must be > 0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Message("retry.max_attempts must be > 0".into()));
        }
        if self.retry.backoff_factor < 1.0 {
            return Err(ConfigError::Message("retry.backoff_factor must be >= 1.0".into()));
        }
        if self.breaker.window_size == 0 {
            return Err(ConfigError::Message("breaker.window_size must be > 0".into()));
        }
        if self.breaker.min_calls as usize > self.breaker.window_size {
            return Err(ConfigError::Message(
                "breaker.min_calls must not exceed breaker.window_size".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.breaker.failure_rate_threshold) {
            return Err(ConfigError::Message(
                "breaker.failure_rate_threshold must be within 0..=100".into(),
            ));
        }
        if self.breaker.half_open_permits == 0 {
            return Err(ConfigError::Message("breaker.half_open_permits must be > 0".into()));
        }

        Ok(())
    }
}
