//! Common constants for networks and the payment wire protocol

use std::time::Duration;

/// Built-in network identifiers
pub mod networks {
    /// Paseo testnet
    pub const PASEO: &str = "paseo";
    /// Westend testnet
    pub const WESTEND: &str = "westend";
    /// Polkadot mainnet
    pub const POLKADOT: &str = "polkadot";

    /// Check if a network has a built-in profile
    pub fn is_supported(network: &str) -> bool {
        matches!(network, PASEO | WESTEND | POLKADOT)
    }

    /// Get all built-in networks
    pub fn all_supported() -> Vec<&'static str> {
        vec![PASEO, WESTEND, POLKADOT]
    }
}

/// HTTP wire protocol constants
pub mod wire {
    use http::StatusCode;

    /// Status code a protected resource answers with when payment is due
    pub const PAYMENT_REQUIRED: StatusCode = StatusCode::PAYMENT_REQUIRED;
    /// Header carrying the signed payment on the retry request
    pub const PAYMENT_HEADER: &str = "x-payment";
    /// Field of the challenge body holding the payment terms
    pub const REQUIREMENTS_FIELD: &str = "paymentRequirements";
    /// Field of the success body holding the transaction identifier
    pub const TRANSACTION_HASH_FIELD: &str = "transaction_hash";
    /// Field of the success body holding the block identifier
    pub const BLOCK_HASH_FIELD: &str = "block_hash";
}

/// Default bound on a single endpoint health probe
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default protected resource path on the payment server
pub const DEFAULT_RESOURCE_PATH: &str = "/api/paid";

/// Default payment server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
