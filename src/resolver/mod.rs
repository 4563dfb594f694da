//! Health-checked endpoint failover
//!
//! An [`EndpointResolver`] walks a network's endpoints in priority order and
//! returns the first one whose health probe succeeds.
//!
//! # Examples
//!
//! ```no_run
//! use polka402::resolver::EndpointResolver;
//! use polka402::types::networks;
//!
//! # async fn example() -> polka402::Result<()> {
//! let resolver = EndpointResolver::builtin();
//! let endpoint = resolver.resolve(networks::PASEO).await?;
//! println!("Using {}", endpoint);
//! # Ok(())
//! # }
//! ```
//!
//! Probes run sequentially by default, so the worst case is one timeout per
//! endpoint. [`ResolveStrategy::Parallel`] probes every endpoint at once and
//! still picks the lowest-index healthy one.

use crate::types::{Endpoint, NetworkProfile, NetworkRegistry, DEFAULT_HEALTH_TIMEOUT};
use crate::{Result, X402Error};
use futures_util::future::join_all;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub mod health;

#[cfg(test)]
mod tests;

pub use health::{EndpointHealthChecker, WsHealthChecker};

/// Progress notification emitted for each probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// A probe is about to start
    Checking { endpoint: Endpoint },
    /// The endpoint answered
    Healthy { endpoint: Endpoint },
    /// The endpoint failed or timed out
    Unhealthy { endpoint: Endpoint },
}

/// Callback receiving probe progress
pub type ProbeObserver = dyn Fn(&ProbeEvent) + Send + Sync;

/// Probe observer wrapped in Arc
pub type ProbeObserverArc = Arc<ProbeObserver>;

/// How candidate endpoints are probed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// One probe at a time; the first healthy endpoint stops the walk
    #[default]
    Sequential,
    /// All probes at once; the lowest-index healthy endpoint wins
    Parallel,
}

impl FromStr for ResolveStrategy {
    type Err = X402Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            other => Err(X402Error::config(format!(
                "Unknown resolve strategy '{}', expected 'sequential' or 'parallel'",
                other
            ))),
        }
    }
}

/// Selects a reachable endpoint for a logical network
pub struct EndpointResolver<H = WsHealthChecker> {
    registry: NetworkRegistry,
    checker: H,
    timeout: Duration,
    strategy: ResolveStrategy,
    observer: Option<ProbeObserverArc>,
}

impl<H> fmt::Debug for EndpointResolver<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointResolver")
            .field("networks", &self.registry.network_ids().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .field("strategy", &self.strategy)
            .field("observer", &self.observer.as_ref().map(|_| "<function>"))
            .finish()
    }
}

impl EndpointResolver<WsHealthChecker> {
    /// Resolver over the built-in networks using WebSocket handshake probes
    pub fn builtin() -> Self {
        Self::new(NetworkRegistry::builtin(), WsHealthChecker::new())
    }
}

impl<H: EndpointHealthChecker> EndpointResolver<H> {
    /// Create a new resolver
    pub fn new(registry: NetworkRegistry, checker: H) -> Self {
        Self {
            registry,
            checker,
            timeout: DEFAULT_HEALTH_TIMEOUT,
            strategy: ResolveStrategy::default(),
            observer: None,
        }
    }

    /// Set the per-probe timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the probing strategy
    pub fn with_strategy(mut self, strategy: ResolveStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set a callback notified for every probe
    pub fn with_observer(mut self, observer: impl Fn(&ProbeEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// The registry this resolver draws from
    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Per-probe timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Select the first healthy endpoint of a network
    ///
    /// Every call probes from the top of the list again; nothing is cached.
    pub async fn resolve(&self, network_id: &str) -> Result<Endpoint> {
        let profile = self.registry.profile(network_id)?;

        tracing::info!("Finding healthy node for {}...", profile.display_name);

        let selected = match self.strategy {
            ResolveStrategy::Sequential => self.resolve_sequential(profile).await,
            ResolveStrategy::Parallel => self.resolve_parallel(profile).await,
        };

        match selected {
            Some(endpoint) => {
                tracing::info!("Using {}", endpoint);
                Ok(endpoint)
            }
            None => {
                tracing::warn!("No healthy nodes found for {}", profile.display_name);
                Err(X402Error::NoHealthyEndpoint {
                    network: profile.display_name.clone(),
                    attempted: profile.endpoints().len(),
                })
            }
        }
    }

    async fn resolve_sequential(&self, profile: &NetworkProfile) -> Option<Endpoint> {
        for endpoint in profile.endpoints() {
            if self.probe(endpoint).await {
                return Some(endpoint.clone());
            }
        }
        None
    }

    async fn resolve_parallel(&self, profile: &NetworkProfile) -> Option<Endpoint> {
        tracing::debug!("Checking {} nodes in parallel", profile.endpoints().len());

        let results = join_all(profile.endpoints().iter().map(|e| self.probe(e))).await;

        // Priority order decides, not arrival order.
        profile
            .endpoints()
            .iter()
            .zip(results)
            .find_map(|(endpoint, healthy)| healthy.then(|| endpoint.clone()))
    }

    async fn probe(&self, endpoint: &Endpoint) -> bool {
        tracing::info!("Checking {}...", endpoint.display_name);
        self.notify(ProbeEvent::Checking {
            endpoint: endpoint.clone(),
        });

        let healthy = self.checker.check(endpoint, self.timeout).await;

        if healthy {
            self.notify(ProbeEvent::Healthy {
                endpoint: endpoint.clone(),
            });
        } else {
            tracing::warn!("{} is down", endpoint.display_name);
            self.notify(ProbeEvent::Unhealthy {
                endpoint: endpoint.clone(),
            });
        }
        healthy
    }

    fn notify(&self, event: ProbeEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}
