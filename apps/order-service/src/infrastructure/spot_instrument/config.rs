//! Configuration for the spot instrument client.

use std::time::Duration;

use super::retry::RetryConfig;

/// Connection settings for the spot instrument service.
#[derive(Debug, Clone)]
pub struct SpotInstrumentConfig {
    /// Service endpoint (e.g., `http://localhost:50052`).
    pub endpoint: String,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Per-request timeout.
    pub request_timeout: Duration,

    /// TCP keepalive interval.
    pub tcp_keepalive: Duration,

    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl Default for SpotInstrumentConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:50052".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(3),
            tcp_keepalive: Duration::from_secs(60),
            retry: RetryConfig::default(),
        }
    }
}

impl SpotInstrumentConfig {
    /// Create a configuration with the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
