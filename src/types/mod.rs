//! Core types for the payment and failover engine
//!
//! # Architecture
//!
//! The types module is organized as follows:
//! - [`network`] - Endpoints, network profiles and the profile registry
//! - [`payment`] - Payment requirements, signed payloads and outcomes
//! - [`connection`] - Lifecycle of the live node connection
//! - [`constants`] - Protocol constants (networks, wire fields, defaults)
//!
//! # Examples
//!
//! ## Parsing a Challenge
//!
//! ```
//! use polka402::types::PaymentRequirement;
//!
//! # fn example() -> polka402::Result<()> {
//! let body = r#"{
//!     "error": "PaymentRequired",
//!     "paymentRequirements": {
//!         "recipient": "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
//!         "amount": "50000000000",
//!         "currency": "PAS",
//!         "network": "paseo"
//!     }
//! }"#;
//!
//! let requirement = PaymentRequirement::from_challenge_body(body)?;
//! assert_eq!(requirement.amount, 50_000_000_000);
//! # Ok(())
//! # }
//! ```
//!
//! ## Looking Up a Network
//!
//! ```
//! use polka402::types::{networks, NetworkRegistry};
//!
//! let registry = NetworkRegistry::builtin();
//! let paseo = registry.get(networks::PASEO).unwrap();
//! println!("Primary node: {}", paseo.endpoints()[0]);
//! println!("Explorer: {}", paseo.explorer_base_url);
//! ```

pub mod connection;
pub mod constants;
pub mod network;
pub mod payment;

// Re-export commonly used types
pub use connection::ConnectionState;
pub use constants::{networks, wire, DEFAULT_HEALTH_TIMEOUT};
pub use network::{Endpoint, NetworkProfile, NetworkRegistry};
pub use payment::{
    PayloadEncoding, PaymentOutcome, PaymentRequirement, PendingPayment, SettlementReceipt,
    SignRequest, SignedPayload,
};
