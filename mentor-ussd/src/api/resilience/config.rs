//! Resilience configuration with builder pattern
//!
//! Side effects run detached from the USSD request, so the only guard rails
//! they get are a short outbound timeout and a cap on how many run at once.

use std::time::Duration;

/// Global resilience configuration for outbound side-effect calls
#[derive(Debug, Clone, PartialEq)]
pub struct ResilienceConfig {
    pub http: HttpConfig,
    pub concurrency: ConcurrencyConfig,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    /// Total time allowed for one request to the profile API or SMS gateway
    pub request_timeout: Duration,
    /// Time allowed to establish the connection
    pub connect_timeout: Duration,
}

/// Concurrency limiting configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConcurrencyConfig {
    /// Maximum side-effect calls in flight at once
    pub max_concurrent_requests: usize,
    /// Whether concurrency limiting is enabled
    pub enabled: bool,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            concurrency: ConcurrencyConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 16,
            enabled: true,
        }
    }
}

impl ResilienceConfig {
    /// Create a new builder for ResilienceConfig
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }
}

/// Builder for ResilienceConfig
#[derive(Debug, Clone)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.connect_timeout = timeout;
        self
    }

    /// Set the side-effect concurrency cap (clamped to at least 1)
    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.config.concurrency.max_concurrent_requests = max.max(1);
        self
    }

    pub fn concurrency_enabled(mut self, enabled: bool) -> Self {
        self.config.concurrency.enabled = enabled;
        self
    }

    pub fn build(self) -> ResilienceConfig {
        // A connect timeout longer than the whole request is meaningless
        let mut config = self.config;
        if config.http.connect_timeout > config.http.request_timeout {
            config.http.connect_timeout = config.http.request_timeout;
        }
        config
    }
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
