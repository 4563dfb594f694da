//! X402 Payment Client
//!
//! Connects to a Polkadot-family network through the first healthy RPC node,
//! then requests a protected resource and settles its 402 challenge.
//!
//! ## Signing
//!
//! Transactions are signed outside this binary. Set `X402_SIGNED_PAYLOAD` to
//! a hex-encoded signed transfer to have it submitted with the retry;
//! without it the client stops at the challenge and prints the terms.

use std::env;
use std::sync::Arc;

use polka402::{
    ClientConfig, NegotiationStep, NetworkRegistry, NodeConnection, PaymentNegotiator,
    PaymentOutcome, PresignedSigner,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ClientConfig::from_env()?;
    let registry = NetworkRegistry::builtin();
    let profile = registry.profile(&config.network)?.clone();
    let resolver = Arc::new(config.resolver(registry)?);

    println!("🌐 Network: {}", profile.display_name);
    let connection = NodeConnection::new(resolver, config.network.clone());
    let node = match connection.connect().await {
        Ok(node) => node,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("🔗 Node: {} ({})", node.display_name, node.address);

    let mut negotiator = PaymentNegotiator::new(config.resource_client()?, config.resource_path.clone())
        .with_encoding(config.payload_encoding)
        .with_auto_pay(config.auto_pay);

    match env::var("X402_SIGNED_PAYLOAD") {
        Ok(payload) if !payload.trim().is_empty() => {
            negotiator = negotiator.with_signer(PresignedSigner::from_hex(&payload)?);
        }
        _ => {
            negotiator = negotiator.with_auto_pay(false);
        }
    }

    println!("📡 Requesting {}{}", config.server_url, config.resource_path);
    match negotiator.negotiate().await? {
        NegotiationStep::PaymentRequired(pending) => {
            let requirement = &pending.requirement;
            let amount = requirement.amount_in_decimal_units(profile.token_decimals)?;
            println!("💳 Payment required (challenge {})", pending.id);
            println!("   Recipient: {}", requirement.recipient);
            println!("   Amount: {} {} ({} plancks)", amount, requirement.currency, requirement.amount);
            println!("   Network: {}", requirement.network);
            println!("   Account: {}", profile.explorer_account_url(&requirement.recipient));
            println!("\nSet X402_SIGNED_PAYLOAD to a signed transfer to pay.");
        }
        NegotiationStep::Settled(PaymentOutcome::Success(receipt)) => {
            match (receipt.challenge_id, &receipt.transaction_hash) {
                (Some(_), Some(hash)) => {
                    println!("✅ Payment successful");
                    println!("   Transaction: {}", profile.explorer_extrinsic_url(hash));
                }
                (Some(id), None) => {
                    println!("✅ Payment accepted (challenge {})", id);
                    println!("   The server did not report a transaction hash.");
                }
                (None, _) => println!("✅ Access granted without payment"),
            }
            println!("{}", receipt.body);
        }
        NegotiationStep::Settled(PaymentOutcome::Failed { http_status, body }) => {
            eprintln!("❌ Payment failed with status {}: {}", http_status, body);
            std::process::exit(1);
        }
        NegotiationStep::Settled(PaymentOutcome::Error {
            cause,
            payment_in_flight,
        }) => {
            if payment_in_flight {
                eprintln!("⚠️  Payment status unknown: {}", cause);
                eprintln!("   Check the explorer before paying again.");
            } else {
                eprintln!("❌ Request failed: {}", cause);
            }
            std::process::exit(1);
        }
    }

    Ok(())
}
