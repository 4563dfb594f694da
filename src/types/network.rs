//! Network profiles and the endpoint registry

use super::constants::networks;
use crate::{Result, X402Error};
use std::collections::BTreeMap;
use std::fmt;

/// A single candidate node address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Stable identifier, unique within a profile
    pub id: String,
    /// Node address (e.g. `wss://rpc.polkadot.io`)
    pub address: String,
    /// Operator name shown to users
    pub display_name: String,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(
        id: impl Into<String>,
        address: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.address)
    }
}

/// A logical network and its endpoints in failover priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    /// Network identifier (e.g. "paseo")
    pub network_id: String,
    /// Human-readable network name
    pub display_name: String,
    /// Candidate endpoints; index 0 has the highest priority
    endpoints: Vec<Endpoint>,
    /// Block explorer base URL
    pub explorer_base_url: String,
    /// Native token symbol
    pub token_symbol: String,
    /// Number of decimals between the smallest unit and one token
    pub token_decimals: u8,
}

impl NetworkProfile {
    /// Create a profile; fails if no endpoint is given
    pub fn new(
        network_id: impl Into<String>,
        display_name: impl Into<String>,
        endpoints: Vec<Endpoint>,
        explorer_base_url: impl Into<String>,
    ) -> Result<Self> {
        let network_id = network_id.into();
        if endpoints.is_empty() {
            return Err(X402Error::config(format!(
                "Network profile '{}' must contain at least one endpoint",
                network_id
            )));
        }

        Ok(Self {
            network_id,
            display_name: display_name.into(),
            endpoints,
            explorer_base_url: explorer_base_url.into().trim_end_matches('/').to_string(),
            token_symbol: "DOT".to_string(),
            token_decimals: 10,
        })
    }

    /// Set the native token symbol and decimals
    pub fn with_token(mut self, symbol: impl Into<String>, decimals: u8) -> Self {
        self.token_symbol = symbol.into();
        self.token_decimals = decimals;
        self
    }

    /// Endpoints in failover priority order
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Whether the endpoint belongs to this profile
    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.endpoints.iter().any(|e| e == endpoint)
    }

    /// Explorer page for an account
    pub fn explorer_account_url(&self, address: &str) -> String {
        format!("{}/account/{}", self.explorer_base_url, address)
    }

    /// Explorer page for an extrinsic
    pub fn explorer_extrinsic_url(&self, hash: &str) -> String {
        format!("{}/extrinsic/{}", self.explorer_base_url, hash)
    }

    /// Paseo testnet profile
    pub fn paseo() -> Self {
        Self::builtin(
            networks::PASEO,
            "Paseo Testnet",
            &[
                ("amforc", "wss://paseo.rpc.amforc.com", "Amforc"),
                ("dwellir", "wss://paseo-rpc.dwellir.com", "Dwellir"),
                ("ibp", "wss://rpc.ibp.network/paseo", "IBP Network"),
                ("dotters", "wss://paseo.dotters.network", "Dotters"),
            ],
            "https://paseo.subscan.io",
        )
        .with_token("PAS", 10)
    }

    /// Westend testnet profile
    pub fn westend() -> Self {
        Self::builtin(
            networks::WESTEND,
            "Westend Testnet",
            &[
                ("parity", "wss://westend-rpc.polkadot.io", "Parity"),
                ("amforc", "wss://westend.rpc.amforc.com", "Amforc"),
            ],
            "https://westend.subscan.io",
        )
        .with_token("WND", 12)
    }

    /// Polkadot mainnet profile
    pub fn polkadot() -> Self {
        Self::builtin(
            networks::POLKADOT,
            "Polkadot Mainnet",
            &[
                ("parity", "wss://rpc.polkadot.io", "Parity"),
                ("amforc", "wss://polkadot.rpc.amforc.com", "Amforc"),
                ("dwellir", "wss://polkadot-rpc.dwellir.com", "Dwellir"),
            ],
            "https://polkadot.subscan.io",
        )
        .with_token("DOT", 10)
    }

    fn builtin(
        network_id: &str,
        display_name: &str,
        nodes: &[(&str, &str, &str)],
        explorer: &str,
    ) -> Self {
        Self {
            network_id: network_id.to_string(),
            display_name: display_name.to_string(),
            endpoints: nodes
                .iter()
                .map(|(id, address, name)| Endpoint::new(*id, *address, *name))
                .collect(),
            explorer_base_url: explorer.to_string(),
            token_symbol: "DOT".to_string(),
            token_decimals: 10,
        }
    }
}

/// Static mapping from network identifier to profile
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    profiles: BTreeMap<String, NetworkProfile>,
}

impl NetworkRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Paseo, Westend and Polkadot profiles
    pub fn builtin() -> Self {
        Self::new()
            .with_profile(NetworkProfile::paseo())
            .with_profile(NetworkProfile::westend())
            .with_profile(NetworkProfile::polkadot())
    }

    /// Add a profile, replacing any profile with the same identifier
    pub fn with_profile(mut self, profile: NetworkProfile) -> Self {
        self.register(profile);
        self
    }

    /// Add a profile, returning the one it replaced
    pub fn register(&mut self, profile: NetworkProfile) -> Option<NetworkProfile> {
        self.profiles.insert(profile.network_id.clone(), profile)
    }

    /// Look up a profile
    pub fn get(&self, network_id: &str) -> Option<&NetworkProfile> {
        self.profiles.get(network_id)
    }

    /// Look up a profile, failing with `UnknownNetwork`
    pub fn profile(&self, network_id: &str) -> Result<&NetworkProfile> {
        self.get(network_id)
            .ok_or_else(|| X402Error::unknown_network(network_id))
    }

    /// Registered network identifiers
    pub fn network_ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}
