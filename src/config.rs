//! Client configuration

use crate::client::HttpResourceClient;
use crate::resolver::{EndpointResolver, ResolveStrategy, WsHealthChecker};
use crate::types::constants::{DEFAULT_RESOURCE_PATH, DEFAULT_SERVER_URL};
use crate::types::{networks, NetworkRegistry, PayloadEncoding, DEFAULT_HEALTH_TIMEOUT};
use crate::{Result, X402Error};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Settings for the payment client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the payment server
    pub server_url: String,
    /// Path of the protected resource
    pub resource_path: String,
    /// Network to connect to
    pub network: String,
    /// Bound on each endpoint health probe
    pub health_timeout: Duration,
    /// Bound on each resource request
    pub request_timeout: Option<Duration>,
    /// How endpoints are probed
    pub resolve_strategy: ResolveStrategy,
    /// Encoding of the payment header
    pub payload_encoding: PayloadEncoding,
    /// Whether challenges are paid without asking
    pub auto_pay: bool,
}

impl ClientConfig {
    /// Create a config for the server at `server_url`
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            resource_path: DEFAULT_RESOURCE_PATH.to_string(),
            network: networks::PASEO.to_string(),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            request_timeout: None,
            resolve_strategy: ResolveStrategy::default(),
            payload_encoding: PayloadEncoding::default(),
            auto_pay: true,
        }
    }

    /// Load from process environment variables
    ///
    /// Reads `X402_SERVER_URL`, `X402_RESOURCE_PATH`, `POLKADOT_NETWORK`,
    /// `HEALTH_TIMEOUT_MS`, `REQUEST_TIMEOUT_MS`, `X402_RESOLVE_STRATEGY`,
    /// `X402_PAYLOAD_ENCODING` and `X402_AUTO_PAY`. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config =
            Self::new(get("X402_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()));

        if let Some(path) = get("X402_RESOURCE_PATH") {
            config = config.with_resource_path(path);
        }
        if let Some(network) = get("POLKADOT_NETWORK") {
            config = config.with_network(network);
        }
        if let Some(ms) = get("HEALTH_TIMEOUT_MS") {
            config = config.with_health_timeout(parse_millis("HEALTH_TIMEOUT_MS", &ms)?);
        }
        if let Some(ms) = get("REQUEST_TIMEOUT_MS") {
            config = config.with_request_timeout(parse_millis("REQUEST_TIMEOUT_MS", &ms)?);
        }
        if let Some(strategy) = get("X402_RESOLVE_STRATEGY") {
            config = config.with_resolve_strategy(ResolveStrategy::from_str(&strategy)?);
        }
        if let Some(encoding) = get("X402_PAYLOAD_ENCODING") {
            config = config.with_payload_encoding(PayloadEncoding::from_str(&encoding)?);
        }
        if let Some(flag) = get("X402_AUTO_PAY") {
            config = config.with_auto_pay(parse_flag("X402_AUTO_PAY", &flag)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the protected resource path
    pub fn with_resource_path(mut self, path: impl Into<String>) -> Self {
        self.resource_path = path.into();
        self
    }

    /// Set the network
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Set the health probe timeout
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the probing strategy
    pub fn with_resolve_strategy(mut self, strategy: ResolveStrategy) -> Self {
        self.resolve_strategy = strategy;
        self
    }

    /// Set the payment header encoding
    pub fn with_payload_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.payload_encoding = encoding;
        self
    }

    /// Set whether challenges are paid automatically
    pub fn with_auto_pay(mut self, auto_pay: bool) -> Self {
        self.auto_pay = auto_pay;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(X402Error::config("Server URL cannot be empty"));
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(X402Error::config(
                "Server URL must start with http:// or https://",
            ));
        }

        if !self.resource_path.starts_with('/') {
            return Err(X402Error::config("Resource path must start with '/'"));
        }

        if self.health_timeout.is_zero() {
            return Err(X402Error::config("Health timeout must be greater than zero"));
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(X402Error::config("Request timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Resource client for the configured server
    pub fn resource_client(&self) -> Result<HttpResourceClient> {
        HttpResourceClient::with_timeout(&self.server_url, self.request_timeout)
    }

    /// Resolver over `registry` using WebSocket handshake probes
    ///
    /// Fails if the configured network is not in the registry.
    pub fn resolver(&self, registry: NetworkRegistry) -> Result<EndpointResolver<WsHealthChecker>> {
        registry.profile(&self.network)?;
        Ok(EndpointResolver::new(registry, WsHealthChecker::new())
            .with_timeout(self.health_timeout)
            .with_strategy(self.resolve_strategy))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| X402Error::config(format!("{} must be a number of milliseconds, got '{}'", key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(X402Error::config(format!("{} must be true or false, got '{}'", key, value))),
    }
}
