//! Error types for the payment and failover engine

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, X402Error>;

/// Errors produced by endpoint resolution and payment negotiation
#[derive(Error, Debug)]
pub enum X402Error {
    /// No network profile is registered under this identifier
    #[error("Unknown network: {network}")]
    UnknownNetwork { network: String },

    /// Every candidate endpoint failed its health check
    #[error("No healthy endpoint found for {network} ({attempted} candidates probed)")]
    NoHealthyEndpoint { network: String, attempted: usize },

    /// A 402 response did not carry usable payment requirements
    #[error("Malformed payment challenge: {message}")]
    MalformedChallenge { message: String },

    /// No signer is attached, or the attached signer is not ready
    #[error("Signer unavailable")]
    SignerUnavailable,

    /// The signer could not produce a signed payload
    #[error("Signing failed: {message}")]
    SigningFailed { message: String },

    /// Another operation is already running on this negotiator
    #[error("A negotiation is already in progress for {resource}")]
    NegotiationInProgress { resource: String },

    /// `pay` was called without a pending challenge
    #[error("No pending payment requirement")]
    NoPendingPayment,

    /// A submission was interrupted; the payment may or may not have been accepted
    #[error("Payment status unknown for {resource}: a signed payment was submitted without a recorded outcome")]
    PaymentStatusUnknown { resource: String },

    /// Network, DNS or timeout failure
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl X402Error {
    /// Create an unknown network error
    pub fn unknown_network(network: impl Into<String>) -> Self {
        Self::UnknownNetwork {
            network: network.into(),
        }
    }

    /// Create a malformed challenge error
    pub fn malformed_challenge(message: impl Into<String>) -> Self {
        Self::MalformedChallenge {
            message: message.into(),
        }
    }

    /// Create a signing failure error
    pub fn signing_failed(message: impl Into<String>) -> Self {
        Self::SigningFailed {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error came from the network layer rather than protocol logic
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<reqwest::Error> for X402Error {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}
