//! Live node connection for a session
//!
//! [`NodeConnection`] resolves a healthy endpoint once and keeps it. A lost
//! node is not re-resolved automatically; call [`NodeConnection::connect`]
//! again to start a new resolution.

use crate::resolver::{EndpointHealthChecker, EndpointResolver, WsHealthChecker};
use crate::types::{ConnectionState, Endpoint};
use crate::Result;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Holds the endpoint selected for one network
#[derive(Debug)]
pub struct NodeConnection<H = WsHealthChecker> {
    resolver: Arc<EndpointResolver<H>>,
    network_id: String,
    state: RwLock<ConnectionState>,
    connecting: Mutex<()>,
}

impl<H: EndpointHealthChecker> NodeConnection<H> {
    /// Create a disconnected connection for `network_id`
    pub fn new(resolver: Arc<EndpointResolver<H>>, network_id: impl Into<String>) -> Self {
        Self {
            resolver,
            network_id: network_id.into(),
            state: RwLock::new(ConnectionState::Disconnected),
            connecting: Mutex::new(()),
        }
    }

    /// Network this connection targets
    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    /// Resolve a healthy endpoint and mark the connection live
    ///
    /// Concurrent calls wait for each other; each one runs its own
    /// resolution.
    pub async fn connect(&self) -> Result<Endpoint> {
        let _guard = self.connecting.lock().await;
        *self.state.write().await = ConnectionState::Resolving;

        match self.resolver.resolve(&self.network_id).await {
            Ok(endpoint) => {
                tracing::info!("Connected to {} via {}", self.network_id, endpoint);
                *self.state.write().await = ConnectionState::Connected(endpoint.clone());
                Ok(endpoint)
            }
            Err(e) => {
                tracing::error!("Connection to {} failed: {}", self.network_id, e);
                *self.state.write().await = ConnectionState::Failed {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Current state
    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// The selected endpoint, if connected
    pub async fn endpoint(&self) -> Option<Endpoint> {
        self.state.read().await.endpoint().cloned()
    }

    /// Drop the selected endpoint
    pub async fn disconnect(&self) {
        let _guard = self.connecting.lock().await;
        *self.state.write().await = ConnectionState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHealthChecker;
    use crate::types::NetworkRegistry;
    use crate::X402Error;
    use std::time::Duration;

    fn connection(checker: FakeHealthChecker, network: &str) -> NodeConnection<FakeHealthChecker> {
        let resolver = EndpointResolver::new(NetworkRegistry::builtin(), checker)
            .with_timeout(Duration::from_millis(20));
        NodeConnection::new(Arc::new(resolver), network)
    }

    #[tokio::test]
    async fn test_connect_selects_endpoint() {
        let connection = connection(FakeHealthChecker::new().healthy("dwellir"), "paseo");
        assert_eq!(connection.state().await, ConnectionState::Disconnected);

        let endpoint = connection.connect().await.unwrap();
        assert_eq!(endpoint.id, "dwellir");
        assert_eq!(connection.endpoint().await, Some(endpoint.clone()));
        assert_eq!(connection.state().await, ConnectionState::Connected(endpoint));
    }

    #[tokio::test]
    async fn test_connect_failure_records_reason() {
        let connection = connection(FakeHealthChecker::new(), "westend");

        let err = connection.connect().await.unwrap_err();
        assert!(matches!(err, X402Error::NoHealthyEndpoint { .. }));

        match connection.state().await {
            ConnectionState::Failed { reason } => assert!(reason.contains("Westend")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(connection.endpoint().await, None);
    }

    #[tokio::test]
    async fn test_concurrent_connects_do_not_interleave_probes() {
        let checker = FakeHealthChecker::new()
            .delayed("parity", Duration::from_millis(5))
            .healthy("parity");
        let connection = connection(checker.clone(), "westend");

        let (a, b) = tokio::join!(connection.connect(), connection.connect());
        assert_eq!(a.unwrap().id, "parity");
        assert_eq!(b.unwrap().id, "parity");
        assert_eq!(
            checker.log(),
            vec!["start:parity", "end:parity", "start:parity", "end:parity"]
        );
    }

    #[tokio::test]
    async fn test_disconnect_and_reconnect() {
        let connection = connection(FakeHealthChecker::new().healthy("amforc"), "paseo");

        connection.connect().await.unwrap();
        connection.disconnect().await;
        assert_eq!(connection.state().await, ConnectionState::Disconnected);

        connection.connect().await.unwrap();
        assert!(connection.state().await.is_connected());
    }
}
