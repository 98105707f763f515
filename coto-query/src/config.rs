//! Broker configuration.
//!
//! All knobs have defaults and can be overridden from the environment:
//!
//! ```rust
//! use std::time::Duration;
//! use coto_query::config::{BrokerConfig, MapEnvSource};
//!
//! let env = MapEnvSource::new()
//!     .set("COTO_IDLE_TIMEOUT_MS", "60000")
//!     .set("COTO_DEBUG", "true");
//! let config = BrokerConfig::from_source(&env).unwrap();
//!
//! assert_eq!(config.pool.idle_timeout, Duration::from_secs(60));
//! assert_eq!(config.pool.reap_interval, Duration::from_secs(300));
//! assert!(config.diagnostics.verbose);
//! ```

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BrokerError, BrokerResult};

/// Default port of a MongoDB server.
pub const DEFAULT_PORT: u16 = 27017;

/// Default authentication database.
pub const DEFAULT_AUTH_SOURCE: &str = "admin";

/// Default authentication mechanism.
pub const DEFAULT_AUTH_MECHANISM: &str = "SCRAM-SHA-256";

/// Source for environment variables.
pub trait EnvSource: Send + Sync {
    /// Get an environment variable value.
    fn get(&self, name: &str) -> Option<String>;
}

/// Default environment source using std::env.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Environment source backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct MapEnvSource {
    vars: HashMap<String, String>,
}

impl MapEnvSource {
    /// Create a new map-based environment source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Settings of the keyed connection pool and its idle reaper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// How often the reaper runs.
    pub reap_interval: Duration,
    /// How long a connection may sit unused before it is reaped.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            reap_interval: Duration::from_millis(300_000),
            idle_timeout: Duration::from_millis(300_000),
        }
    }
}

impl PoolConfig {
    /// Set the reap interval.
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Set the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

/// Options applied to every client the pool opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Socket (operation) timeout.
    pub socket_timeout: Duration,
    /// Server selection timeout.
    pub server_selection_timeout: Duration,
    /// Minimum driver-side pool size.
    pub min_pool_size: u32,
    /// Maximum driver-side pool size.
    pub max_pool_size: u32,
    /// Retry writes.
    pub retry_writes: bool,
    /// Retry reads.
    pub retry_reads: bool,
    /// authSource used when the caller does not supply one.
    pub default_auth_source: String,
    /// authMechanism used when the caller does not supply one.
    pub default_auth_mechanism: String,
    /// Application name (shown in server logs).
    pub app_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(30_000),
            socket_timeout: Duration::from_millis(30_000),
            server_selection_timeout: Duration::from_millis(10_000),
            min_pool_size: 1,
            max_pool_size: 10,
            retry_writes: true,
            retry_reads: true,
            default_auth_source: DEFAULT_AUTH_SOURCE.to_string(),
            default_auth_mechanism: DEFAULT_AUTH_MECHANISM.to_string(),
            app_name: "coto".to_string(),
        }
    }
}

impl ClientConfig {
    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the socket timeout.
    pub fn socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    /// Set the driver-side pool bounds.
    pub fn pool_size(mut self, min: u32, max: u32) -> Self {
        self.min_pool_size = min;
        self.max_pool_size = max;
        self
    }

    /// Set the default authSource.
    pub fn default_auth_source(mut self, source: impl Into<String>) -> Self {
        self.default_auth_source = source.into();
        self
    }

    /// Set the default authMechanism.
    pub fn default_auth_mechanism(mut self, mechanism: impl Into<String>) -> Self {
        self.default_auth_mechanism = mechanism.into();
        self
    }
}

/// Diagnostic toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    /// Emit verbose connection and query diagnostics.
    pub verbose: bool,
    /// Log raw result sets (only honoured when `verbose` is set).
    pub log_results: bool,
}

impl DiagnosticsConfig {
    /// Whether result sets should be logged.
    pub fn should_log_results(&self) -> bool {
        self.verbose && self.log_results
    }
}

/// Complete broker configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Pool and reaper settings.
    pub pool: PoolConfig,
    /// Client options.
    pub client: ClientConfig,
    /// Diagnostic toggles.
    pub diagnostics: DiagnosticsConfig,
}

impl BrokerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> BrokerResult<Self> {
        Self::from_source(&StdEnvSource)
    }

    /// Load configuration from an environment source.
    pub fn from_source(env: &dyn EnvSource) -> BrokerResult<Self> {
        let mut config = Self::default();

        if let Some(ms) = millis(env, "COTO_REAP_INTERVAL_MS")? {
            config.pool.reap_interval = ms;
        }
        if let Some(ms) = millis(env, "COTO_IDLE_TIMEOUT_MS")? {
            config.pool.idle_timeout = ms;
        }
        if let Some(ms) = millis(env, "COTO_CONNECT_TIMEOUT_MS")? {
            config.client.connect_timeout = ms;
        }
        if let Some(ms) = millis(env, "COTO_SOCKET_TIMEOUT_MS")? {
            config.client.socket_timeout = ms;
        }
        if let Some(ms) = millis(env, "COTO_SERVER_SELECTION_TIMEOUT_MS")? {
            config.client.server_selection_timeout = ms;
        }
        if let Some(n) = number::<u32>(env, "COTO_MIN_POOL_SIZE")? {
            config.client.min_pool_size = n;
        }
        if let Some(n) = number::<u32>(env, "COTO_MAX_POOL_SIZE")? {
            config.client.max_pool_size = n;
        }
        if let Some(source) = non_empty(env, "COTO_AUTH_SOURCE") {
            config.client.default_auth_source = source;
        }
        if let Some(mechanism) = non_empty(env, "COTO_AUTH_MECHANISM") {
            config.client.default_auth_mechanism = mechanism;
        }
        config.diagnostics.verbose = flag(env, "COTO_DEBUG");
        config.diagnostics.log_results = flag(env, "COTO_DEBUG_RESULTS");

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> BrokerResult<()> {
        if self.client.max_pool_size == 0 {
            return Err(BrokerError::config("max pool size must be at least 1"));
        }
        if self.client.min_pool_size > self.client.max_pool_size {
            return Err(BrokerError::config(format!(
                "min pool size {} exceeds max pool size {}",
                self.client.min_pool_size, self.client.max_pool_size
            )));
        }
        if self.pool.reap_interval.is_zero() {
            return Err(BrokerError::config("reap interval must be positive"));
        }
        Ok(())
    }
}

fn non_empty(env: &dyn EnvSource, name: &str) -> Option<String> {
    env.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn number<T: std::str::FromStr>(env: &dyn EnvSource, name: &str) -> BrokerResult<Option<T>> {
    match non_empty(env, name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| BrokerError::config(format!("{} must be a number, got '{}'", name, raw))),
        None => Ok(None),
    }
}

fn millis(env: &dyn EnvSource, name: &str) -> BrokerResult<Option<Duration>> {
    Ok(number::<u64>(env, name)?.map(Duration::from_millis))
}

fn flag(env: &dyn EnvSource, name: &str) -> bool {
    env.get(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = BrokerConfig::default();
        assert_eq!(config.pool.reap_interval, Duration::from_secs(300));
        assert_eq!(config.pool.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.client.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.client.socket_timeout, Duration::from_secs(30));
        assert_eq!(config.client.server_selection_timeout, Duration::from_secs(10));
        assert_eq!(config.client.min_pool_size, 1);
        assert_eq!(config.client.max_pool_size, 10);
        assert_eq!(config.client.default_auth_source, "admin");
        assert_eq!(config.client.default_auth_mechanism, "SCRAM-SHA-256");
        assert!(config.client.retry_reads);
        assert!(config.client.retry_writes);
        assert!(!config.diagnostics.verbose);
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = BrokerConfig::from_source(&MapEnvSource::new()).unwrap();
        assert_eq!(config, BrokerConfig::default());
    }

    #[test]
    fn test_overrides() {
        let env = MapEnvSource::new()
            .set("COTO_REAP_INTERVAL_MS", "1000")
            .set("COTO_SERVER_SELECTION_TIMEOUT_MS", "2500")
            .set("COTO_MAX_POOL_SIZE", "4")
            .set("COTO_AUTH_SOURCE", "reports")
            .set("COTO_AUTH_MECHANISM", "SCRAM-SHA-1")
            .set("COTO_DEBUG_RESULTS", "1");
        let config = BrokerConfig::from_source(&env).unwrap();

        assert_eq!(config.pool.reap_interval, Duration::from_secs(1));
        assert_eq!(config.pool.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.client.server_selection_timeout, Duration::from_millis(2500));
        assert_eq!(config.client.max_pool_size, 4);
        assert_eq!(config.client.default_auth_source, "reports");
        assert_eq!(config.client.default_auth_mechanism, "SCRAM-SHA-1");
        assert!(config.diagnostics.log_results);
        assert!(!config.diagnostics.should_log_results());
    }

    #[test]
    fn test_invalid_number() {
        let env = MapEnvSource::new().set("COTO_CONNECT_TIMEOUT_MS", "soon");
        let err = BrokerConfig::from_source(&env).unwrap_err();
        assert!(err.to_string().contains("COTO_CONNECT_TIMEOUT_MS"));
    }

    #[test]
    fn test_pool_bounds_validated() {
        let env = MapEnvSource::new()
            .set("COTO_MIN_POOL_SIZE", "8")
            .set("COTO_MAX_POOL_SIZE", "2");
        assert!(BrokerConfig::from_source(&env).is_err());
    }
}
