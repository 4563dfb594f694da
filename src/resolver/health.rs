//! Endpoint reachability probes

use crate::types::Endpoint;
use async_trait::async_trait;
use std::time::Duration;
use tokio_tungstenite::connect_async;

/// Probes whether a single endpoint is reachable
///
/// A probe only proves that the node completes a connection handshake. A
/// node that is reachable but serving bad data looks healthy at this layer.
#[async_trait]
pub trait EndpointHealthChecker: Send + Sync {
    /// Returns `true` if the endpoint answered within `timeout`
    async fn check(&self, endpoint: &Endpoint, timeout: Duration) -> bool;
}

/// Health checker that completes a WebSocket handshake and closes it again
#[derive(Debug, Clone, Copy, Default)]
pub struct WsHealthChecker;

impl WsHealthChecker {
    /// Create a new WebSocket health checker
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EndpointHealthChecker for WsHealthChecker {
    async fn check(&self, endpoint: &Endpoint, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, connect_async(endpoint.address.as_str())).await {
            Ok(Ok((mut stream, _))) => {
                // The probe connection never outlives the check.
                let _ = tokio::time::timeout(timeout, stream.close(None)).await;
                true
            }
            Ok(Err(e)) => {
                tracing::debug!("Probe of {} failed: {}", endpoint.address, e);
                false
            }
            Err(_) => {
                tracing::debug!(
                    "Probe of {} timed out after {}ms",
                    endpoint.address,
                    timeout.as_millis()
                );
                false
            }
        }
    }
}
