//! Node connection lifecycle

use super::network::Endpoint;

/// State of the live node connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection attempt has been made
    #[default]
    Disconnected,
    /// Candidate endpoints are being probed
    Resolving,
    /// A healthy endpoint was selected
    Connected(Endpoint),
    /// Resolution failed
    Failed {
        /// Why no endpoint could be selected
        reason: String,
    },
}

impl ConnectionState {
    /// The selected endpoint, if connected
    pub fn endpoint(&self) -> Option<&Endpoint> {
        match self {
            Self::Connected(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    /// Whether an endpoint is selected
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}
