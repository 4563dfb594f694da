//! External transaction signing capability
//!
//! The engine never builds or inspects transactions. A [`TransactionSigner`]
//! receives a [`SignRequest`] and returns an opaque [`SignedPayload`] that is
//! forwarded verbatim in the payment header. Account nonces and key material
//! stay with the signer.

use crate::types::{SignRequest, SignedPayload};
use crate::{Result, X402Error};
use async_trait::async_trait;
use std::sync::Mutex;

/// Produces signed transfers for payment requirements
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Sign a transfer of `request.amount` to `request.recipient_address`
    async fn sign(&self, request: &SignRequest) -> Result<SignedPayload>;

    /// Whether the signer has key material and a chain connection
    fn is_available(&self) -> bool {
        true
    }
}

/// Signer handing out a payload that was signed elsewhere
///
/// The payload is released once; a second signing attempt fails so the same
/// transfer is never submitted twice.
#[derive(Debug)]
pub struct PresignedSigner {
    payload: Mutex<Option<SignedPayload>>,
}

impl PresignedSigner {
    /// Wrap a signed payload
    pub fn new(payload: SignedPayload) -> Self {
        Self {
            payload: Mutex::new(Some(payload)),
        }
    }

    /// Wrap a hex-encoded signed payload
    pub fn from_hex(encoded: &str) -> Result<Self> {
        Ok(Self::new(SignedPayload::from_hex(encoded)?))
    }

    fn take(&self) -> Option<SignedPayload> {
        self.payload.lock().ok().and_then(|mut slot| slot.take())
    }
}

#[async_trait]
impl TransactionSigner for PresignedSigner {
    async fn sign(&self, request: &SignRequest) -> Result<SignedPayload> {
        tracing::info!(
            "Releasing presigned transfer of {} to {}",
            request.amount,
            request.recipient_address
        );
        self.take()
            .ok_or_else(|| X402Error::signing_failed("presigned payload already used"))
    }

    fn is_available(&self) -> bool {
        self.payload
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}
