//! Service Configuration Settings
//!
//! Settings for the order service, loaded from environment variables.
//! Every variable except `SPOT_INSTRUMENT_ENDPOINT` has a default; a value
//! that is present but unparseable is an error rather than a silent
//! fallback.

use std::str::FromStr;
use std::time::Duration;

use crate::application::services::{StatusSimulatorConfig, SubscriptionConfig};
use crate::infrastructure::spot_instrument::{RetryConfig, SpotInstrumentConfig};

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Bind address for both listeners.
    pub bind_address: String,
    /// gRPC port.
    pub grpc_port: u16,
    /// Health and metrics HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            grpc_port: 50051,
            health_port: 8081,
        }
    }
}

impl ServerSettings {
    /// `host:port` of the gRPC listener.
    #[must_use]
    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.grpc_port)
    }

    /// `host:port` of the health listener.
    #[must_use]
    pub fn health_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.health_port)
    }
}

/// Markets cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Wrap the market validator in a read-through cache.
    pub enabled: bool,
    /// Lifetime of a cached market list.
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(60),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Listeners.
    pub server: ServerSettings,
    /// Market validator client.
    pub spot_instrument: SpotInstrumentConfig,
    /// Status simulator.
    pub simulator: StatusSimulatorConfig,
    /// Order status subscriptions.
    pub subscriptions: SubscriptionConfig,
    /// Markets cache.
    pub cache: CacheSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or any value is
    /// invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let endpoint = env
            .get("SPOT_INSTRUMENT_ENDPOINT")
            .ok_or_else(|| ConfigError::MissingEnvVar("SPOT_INSTRUMENT_ENDPOINT".to_string()))?;
        if endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyValue("SPOT_INSTRUMENT_ENDPOINT".to_string()));
        }

        let server_defaults = ServerSettings::default();
        let server = ServerSettings {
            bind_address: env
                .get("ORDER_SERVICE_BIND_ADDRESS")
                .unwrap_or(server_defaults.bind_address),
            grpc_port: env.parse("ORDER_SERVICE_GRPC_PORT", server_defaults.grpc_port)?,
            health_port: env.parse("ORDER_SERVICE_HEALTH_PORT", server_defaults.health_port)?,
        };

        let spot_defaults = SpotInstrumentConfig::default();
        let retry_defaults = RetryConfig::default();
        let spot_instrument = SpotInstrumentConfig::new(endpoint.trim())
            .with_connect_timeout(env.millis(
                "SPOT_INSTRUMENT_CONNECT_TIMEOUT_MS",
                spot_defaults.connect_timeout,
            )?)
            .with_request_timeout(env.millis(
                "SPOT_INSTRUMENT_REQUEST_TIMEOUT_MS",
                spot_defaults.request_timeout,
            )?)
            .with_retry(RetryConfig {
                initial_delay: env
                    .millis("SPOT_INSTRUMENT_BACKOFF_INITIAL_MS", retry_defaults.initial_delay)?,
                max_delay: env.millis("SPOT_INSTRUMENT_BACKOFF_MAX_MS", retry_defaults.max_delay)?,
                max_retries: env.parse("SPOT_INSTRUMENT_MAX_RETRIES", retry_defaults.max_retries)?,
                ..retry_defaults
            });

        let simulator_defaults = StatusSimulatorConfig::default();
        let simulator = StatusSimulatorConfig {
            interval: env.secs("ORDER_SIMULATOR_INTERVAL_SECS", simulator_defaults.interval)?,
            fill_probability: env.parse(
                "ORDER_SIMULATOR_FILL_PROBABILITY",
                simulator_defaults.fill_probability,
            )?,
        };

        let subscription_defaults = SubscriptionConfig::default();
        let subscriptions = SubscriptionConfig {
            poll_interval: env.secs(
                "ORDER_STREAM_POLL_INTERVAL_SECS",
                subscription_defaults.poll_interval,
            )?,
            buffer_capacity: env.parse("ORDER_STREAM_BUFFER", subscription_defaults.buffer_capacity)?,
        };

        let cache_defaults = CacheSettings::default();
        let cache = CacheSettings {
            enabled: env.flag("MARKETS_CACHE_ENABLED", cache_defaults.enabled)?,
            ttl: env.secs("MARKETS_CACHE_TTL_SECS", cache_defaults.ttl)?,
        };

        let config = Self {
            server,
            spot_instrument,
            simulator,
            subscriptions,
            cache,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` naming the offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulator.interval.is_zero() {
            return Err(ConfigError::invalid(
                "ORDER_SIMULATOR_INTERVAL_SECS",
                "0",
                "must be greater than zero",
            ));
        }
        let p = self.simulator.fill_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::invalid(
                "ORDER_SIMULATOR_FILL_PROBABILITY",
                p.to_string(),
                "must be within [0, 1]",
            ));
        }
        if self.subscriptions.poll_interval.is_zero() {
            return Err(ConfigError::invalid(
                "ORDER_STREAM_POLL_INTERVAL_SECS",
                "0",
                "must be greater than zero",
            ));
        }
        if self.subscriptions.buffer_capacity == 0 {
            return Err(ConfigError::invalid(
                "ORDER_STREAM_BUFFER",
                "0",
                "must be greater than zero",
            ));
        }
        if self.cache.enabled && self.cache.ttl.is_zero() {
            return Err(ConfigError::invalid(
                "MARKETS_CACHE_TTL_SECS",
                "0",
                "must be greater than zero when the cache is enabled",
            ));
        }
        let retry = &self.spot_instrument.retry;
        if retry.initial_delay > retry.max_delay {
            return Err(ConfigError::invalid(
                "SPOT_INSTRUMENT_BACKOFF_INITIAL_MS",
                retry.initial_delay.as_millis().to_string(),
                "must not exceed SPOT_INSTRUMENT_BACKOFF_MAX_MS",
            ));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be used.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(key, raw, "cannot be parsed")),
        }
    }

    fn secs(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse(key, default.as_secs()).map(Duration::from_secs)
    }

    fn millis(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        let default = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
        self.parse(key, default).map(Duration::from_millis)
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key).map(|v| v.trim().to_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => Ok(true),
            Some(v) if matches!(v.as_str(), "false" | "0" | "no") => Ok(false),
            Some(v) => Err(ConfigError::invalid(key, v, "expected true or false")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_with_only_endpoint() {
        let config = load(&[("SPOT_INSTRUMENT_ENDPOINT", "http://spot:50052")]).unwrap();

        assert_eq!(config.spot_instrument.endpoint, "http://spot:50052");
        assert_eq!(config.spot_instrument.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.spot_instrument.request_timeout, Duration::from_secs(3));
        assert_eq!(config.spot_instrument.retry.max_retries, 2);
        assert_eq!(config.server, ServerSettings::default());
        assert_eq!(config.server.grpc_addr(), "0.0.0.0:50051");
        assert_eq!(config.simulator.interval, Duration::from_secs(30));
        assert!((config.simulator.fill_probability - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.subscriptions, SubscriptionConfig::default());
        assert_eq!(config.cache, CacheSettings::default());
    }

    #[test]
    fn missing_endpoint_is_error() {
        assert_eq!(
            load(&[]).unwrap_err(),
            ConfigError::MissingEnvVar("SPOT_INSTRUMENT_ENDPOINT".to_string())
        );
        assert_eq!(
            load(&[("SPOT_INSTRUMENT_ENDPOINT", "  ")]).unwrap_err(),
            ConfigError::EmptyValue("SPOT_INSTRUMENT_ENDPOINT".to_string())
        );
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("SPOT_INSTRUMENT_ENDPOINT", "http://spot:1"),
            ("SPOT_INSTRUMENT_REQUEST_TIMEOUT_MS", "750"),
            ("SPOT_INSTRUMENT_MAX_RETRIES", "0"),
            ("ORDER_SERVICE_GRPC_PORT", "6000"),
            ("ORDER_SIMULATOR_INTERVAL_SECS", "2"),
            ("ORDER_SIMULATOR_FILL_PROBABILITY", "1.0"),
            ("ORDER_STREAM_BUFFER", "3"),
            ("MARKETS_CACHE_ENABLED", "false"),
        ])
        .unwrap();

        assert_eq!(config.spot_instrument.request_timeout, Duration::from_millis(750));
        assert_eq!(config.spot_instrument.retry.max_retries, 0);
        assert_eq!(config.server.grpc_port, 6000);
        assert_eq!(config.simulator.interval, Duration::from_secs(2));
        assert!((config.simulator.fill_probability - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.subscriptions.buffer_capacity, 3);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn unparseable_value_is_error() {
        let err = load(&[
            ("SPOT_INSTRUMENT_ENDPOINT", "http://spot:1"),
            ("ORDER_SERVICE_GRPC_PORT", "http"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "ORDER_SERVICE_GRPC_PORT"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for (key, value) in [
            ("ORDER_SIMULATOR_INTERVAL_SECS", "0"),
            ("ORDER_SIMULATOR_FILL_PROBABILITY", "1.5"),
            ("ORDER_STREAM_POLL_INTERVAL_SECS", "0"),
            ("ORDER_STREAM_BUFFER", "0"),
            ("MARKETS_CACHE_TTL_SECS", "0"),
            ("MARKETS_CACHE_ENABLED", "maybe"),
        ] {
            let err = load(&[("SPOT_INSTRUMENT_ENDPOINT", "http://spot:1"), (key, value)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { key: ref k, .. } if k == key),
                "{key}={value} gave {err}"
            );
        }
    }

    #[test]
    fn zero_ttl_allowed_when_cache_disabled() {
        let config = load(&[
            ("SPOT_INSTRUMENT_ENDPOINT", "http://spot:1"),
            ("MARKETS_CACHE_ENABLED", "0"),
            ("MARKETS_CACHE_TTL_SECS", "0"),
        ])
        .unwrap();
        assert!(!config.cache.enabled);
    }
}
