//! # polka402
//!
//! Client-side engine for **HTTP 402 micropayments on Polkadot-family networks**.
//!
//! ## Features
//!
//! - **Endpoint failover**: Priority-ordered health probing of a network's RPC nodes
//! - **402 negotiation**: Challenge, sign, and a single paid retry per requirement
//! - **Pluggable signing**: Transactions are signed outside the engine behind a trait
//! - **Type safety**: Exact integer amounts, explicit outcomes, one error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polka402::{
//!     client::HttpResourceClient,
//!     connection::NodeConnection,
//!     negotiator::{NegotiationStep, PaymentNegotiator},
//!     resolver::EndpointResolver,
//!     signer::PresignedSigner,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Pick a live node for the signer side
//!     let connection = NodeConnection::new(Arc::new(EndpointResolver::builtin()), "paseo");
//!     let node = connection.connect().await?;
//!     println!("Node: {}", node.address);
//!
//!     // Pay for the protected resource
//!     let client = HttpResourceClient::new("http://127.0.0.1:3000")?;
//!     let negotiator = PaymentNegotiator::new(client, "/api/paid")
//!         .with_signer(PresignedSigner::from_hex("0x2d02...")?);
//!
//!     if let NegotiationStep::Settled(outcome) = negotiator.negotiate().await? {
//!         println!("Outcome: {:?}", outcome);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`types`**: Endpoints, network profiles, payment requirements and outcomes
//! - **`resolver`**: Health checking and endpoint failover
//! - **`connection`**: The live node connection of a session
//! - **`client`**: HTTP transport for protected resources
//! - **`signer`**: Signing seam for payment transactions
//! - **`negotiator`**: The 402 payment state machine
//! - **`config`**: Client configuration and environment loading
//! - **`error`**: Error handling

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod negotiator;
pub mod resolver;
pub mod signer;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use client::{HttpResourceClient, ResourceClient, ResourceResponse};
pub use config::ClientConfig;
pub use connection::NodeConnection;
pub use error::{Result, X402Error};
pub use negotiator::{NegotiationState, NegotiationStep, PaymentNegotiator};
pub use resolver::{EndpointHealthChecker, EndpointResolver, ResolveStrategy, WsHealthChecker};
pub use signer::{PresignedSigner, TransactionSigner};
pub use types::*;

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
