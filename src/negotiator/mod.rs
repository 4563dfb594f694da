//! Challenge-response payment negotiation
//!
//! A [`PaymentNegotiator`] drives one protected resource through the 402
//! protocol:
//!
//! ```text
//! Idle -> AwaitingChallenge -> PaymentRequired -> Signing -> Submitting -> Settled
//! ```
//!
//! The resource is first called without payment. A 402 answer carries the
//! payment terms; the signer turns them into a signed transfer which is
//! attached to exactly one retry. Nothing is retried automatically: a signed
//! payment is submitted at most once, and a fresh challenge is required for
//! any further payment.
//!
//! # Examples
//!
//! ```no_run
//! use polka402::client::HttpResourceClient;
//! use polka402::negotiator::{NegotiationStep, PaymentNegotiator};
//! use polka402::signer::PresignedSigner;
//! use polka402::types::PaymentOutcome;
//!
//! # async fn example() -> polka402::Result<()> {
//! let client = HttpResourceClient::new("http://127.0.0.1:3000")?;
//! let negotiator = PaymentNegotiator::new(client, "/api/paid")
//!     .with_signer(PresignedSigner::from_hex("0x2d02...")?);
//!
//! match negotiator.negotiate().await? {
//!     NegotiationStep::Settled(PaymentOutcome::Success(receipt)) => {
//!         println!("Paid: {:?}", receipt.transaction_hash);
//!     }
//!     other => println!("Not granted: {:?}", other),
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::{ResourceClient, ResourceResponse};
use crate::signer::TransactionSigner;
use crate::types::{
    wire, PayloadEncoding, PaymentOutcome, PaymentRequirement, PendingPayment, SettlementReceipt,
};
use crate::{Result, X402Error};
use http::{HeaderMap, HeaderValue, Method};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};


/// Position of a negotiation in the payment protocol
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NegotiationState {
    /// Nothing has been requested yet
    #[default]
    Idle,
    /// The unpaid request is in flight
    AwaitingChallenge,
    /// A challenge arrived and waits for payment
    PaymentRequired(PendingPayment),
    /// The signer is producing the payment
    Signing(PendingPayment),
    /// The paid retry has been sent
    Submitting(PendingPayment),
    /// The negotiation reached a terminal outcome
    Settled(PaymentOutcome),
}

impl NegotiationState {
    /// Short state name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::AwaitingChallenge => "AwaitingChallenge",
            Self::PaymentRequired(_) => "PaymentRequired",
            Self::Signing(_) => "Signing",
            Self::Submitting(_) => "Submitting",
            Self::Settled(_) => "Settled",
        }
    }

    /// The challenge currently being handled, if any
    pub fn pending(&self) -> Option<&PendingPayment> {
        match self {
            Self::PaymentRequired(p) | Self::Signing(p) | Self::Submitting(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a negotiation call stopped
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationStep {
    /// A challenge is pending; call [`PaymentNegotiator::pay`] to settle it
    PaymentRequired(PendingPayment),
    /// The negotiation is over
    Settled(PaymentOutcome),
}

/// Drives the 402 protocol for a single protected resource
pub struct PaymentNegotiator<C> {
    client: C,
    resource: String,
    method: Method,
    encoding: PayloadEncoding,
    auto_pay: bool,
    signer: RwLock<Option<Arc<dyn TransactionSigner>>>,
    state: RwLock<NegotiationState>,
    in_flight: Mutex<()>,
}

impl<C> fmt::Debug for PaymentNegotiator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentNegotiator")
            .field("resource", &self.resource)
            .field("method", &self.method)
            .field("encoding", &self.encoding)
            .field("auto_pay", &self.auto_pay)
            .finish_non_exhaustive()
    }
}

impl<C: ResourceClient> PaymentNegotiator<C> {
    /// Create a negotiator for the resource at `resource`
    pub fn new(client: C, resource: impl Into<String>) -> Self {
        Self {
            client,
            resource: resource.into(),
            method: Method::GET,
            encoding: PayloadEncoding::default(),
            auto_pay: true,
            signer: RwLock::new(None),
            state: RwLock::new(NegotiationState::Idle),
            in_flight: Mutex::new(()),
        }
    }

    /// Set the HTTP method used for the resource
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set how the signed payload is encoded in the payment header
    pub fn with_encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set whether [`negotiate`](Self::negotiate) pays challenges immediately
    pub fn with_auto_pay(mut self, auto_pay: bool) -> Self {
        self.auto_pay = auto_pay;
        self
    }

    /// Attach a signer
    pub fn with_signer(self, signer: impl TransactionSigner + 'static) -> Self {
        Self {
            signer: RwLock::new(Some(Arc::new(signer))),
            ..self
        }
    }

    /// Attach or replace the signer
    pub async fn attach_signer(&self, signer: Arc<dyn TransactionSigner>) {
        *self.signer.write().await = Some(signer);
    }

    /// Remove the signer
    pub async fn detach_signer(&self) {
        *self.signer.write().await = None;
    }

    /// The protected resource path
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The underlying resource client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Current state
    pub async fn state(&self) -> NegotiationState {
        self.state.read().await.clone()
    }

    /// The challenge waiting for payment, if any
    pub async fn pending_payment(&self) -> Option<PendingPayment> {
        self.state.read().await.pending().cloned()
    }

    /// Call the resource without payment
    ///
    /// Starts a fresh cycle from `Idle`, `PaymentRequired` (the previous
    /// challenge is discarded) or `Settled`. A 402 answer leaves the
    /// negotiator in `PaymentRequired`; any other answer settles it.
    pub async fn request(&self) -> Result<NegotiationStep> {
        let _flight = self.begin()?;
        self.request_inner().await
    }

    /// Sign and submit the pending challenge
    ///
    /// The pending requirement is consumed by the submission, so it can be
    /// paid at most once. If signing fails the requirement is kept and `pay`
    /// may be called again without fetching a new challenge.
    pub async fn pay(&self) -> Result<PaymentOutcome> {
        let _flight = self.begin()?;
        self.pay_inner().await
    }

    /// Request the resource and, if auto-pay is enabled, pay the challenge
    pub async fn negotiate(&self) -> Result<NegotiationStep> {
        let _flight = self.begin()?;
        match self.request_inner().await? {
            NegotiationStep::PaymentRequired(pending) if !self.auto_pay => {
                Ok(NegotiationStep::PaymentRequired(pending))
            }
            NegotiationStep::PaymentRequired(_) => {
                self.pay_inner().await.map(NegotiationStep::Settled)
            }
            settled => Ok(settled),
        }
    }

    /// Abandon the current negotiation and return to `Idle`
    ///
    /// Fails with `PaymentStatusUnknown` once a signed payment has been
    /// submitted: the payment may already be on chain.
    pub async fn cancel(&self) -> Result<()> {
        let _flight = match self.begin() {
            Ok(guard) => guard,
            Err(err) => {
                return match &*self.state.read().await {
                    NegotiationState::Submitting(_) => Err(self.status_unknown()),
                    _ => Err(err),
                };
            }
        };

        let mut state = self.state.write().await;
        if let NegotiationState::Submitting(_) = &*state {
            return Err(self.status_unknown());
        }
        tracing::info!("Negotiation for {} cancelled from {}", self.resource, state.name());
        *state = NegotiationState::Idle;
        Ok(())
    }

    /// Return to `Idle` unconditionally, handing back the abandoned state
    ///
    /// Use after `cancel` reported an unknown payment status and the caller
    /// has reconciled it out of band.
    pub async fn reset(&self) -> Result<NegotiationState> {
        let _flight = self.begin()?;
        let previous = std::mem::take(&mut *self.state.write().await);
        if let NegotiationState::Submitting(pending) = &previous {
            tracing::warn!(
                "Negotiation {} reset while its payment status is unknown",
                pending.id
            );
        }
        Ok(previous)
    }

    fn begin(&self) -> Result<MutexGuard<'_, ()>> {
        self.in_flight
            .try_lock()
            .map_err(|_| X402Error::NegotiationInProgress {
                resource: self.resource.clone(),
            })
    }

    fn status_unknown(&self) -> X402Error {
        X402Error::PaymentStatusUnknown {
            resource: self.resource.clone(),
        }
    }

    async fn transition(&self, next: NegotiationState) {
        let mut state = self.state.write().await;
        tracing::debug!("{}: {} -> {}", self.resource, state.name(), next.name());
        *state = next;
    }

    async fn settle(&self, outcome: PaymentOutcome) -> PaymentOutcome {
        self.transition(NegotiationState::Settled(outcome.clone()))
            .await;
        outcome
    }

    async fn request_inner(&self) -> Result<NegotiationStep> {
        {
            let state = self.state.read().await;
            if let NegotiationState::Submitting(_) = &*state {
                return Err(self.status_unknown());
            }
        }
        self.transition(NegotiationState::AwaitingChallenge).await;

        let response = match self
            .client
            .call(self.method.clone(), &self.resource, HeaderMap::new())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Request for {} failed: {}", self.resource, e);
                let outcome = PaymentOutcome::Error {
                    cause: e.to_string(),
                    payment_in_flight: false,
                };
                return Ok(NegotiationStep::Settled(self.settle(outcome).await));
            }
        };

        if !response.is_payment_required() {
            let outcome = self.outcome_of(response, None);
            return Ok(NegotiationStep::Settled(self.settle(outcome).await));
        }

        tracing::warn!("Payment required for {}", self.resource);
        match PaymentRequirement::from_challenge_body(&response.body) {
            Ok(requirement) => {
                let pending = PendingPayment::new(requirement, response.body);
                tracing::info!(
                    "Challenge {}: {} {} to {} on {}",
                    pending.id,
                    pending.requirement.amount,
                    pending.requirement.currency,
                    pending.requirement.recipient,
                    pending.requirement.network
                );
                self.transition(NegotiationState::PaymentRequired(pending.clone()))
                    .await;
                Ok(NegotiationStep::PaymentRequired(pending))
            }
            Err(e) => {
                tracing::error!("Rejecting challenge from {}: {}", self.resource, e);
                self.transition(NegotiationState::Idle).await;
                Err(e)
            }
        }
    }

    async fn pay_inner(&self) -> Result<PaymentOutcome> {
        let signer = self.signer.read().await.clone();

        let (pending, signer) = {
            let mut state = self.state.write().await;
            let pending = match &*state {
                // A dropped signing future leaves `Signing` behind; nothing was sent.
                NegotiationState::PaymentRequired(p) | NegotiationState::Signing(p) => p.clone(),
                NegotiationState::Submitting(_) => return Err(self.status_unknown()),
                _ => return Err(X402Error::NoPendingPayment),
            };

            let signer = match signer {
                Some(signer) if signer.is_available() => signer,
                _ => {
                    tracing::error!("Wallet not connected");
                    *state = NegotiationState::PaymentRequired(pending);
                    return Err(X402Error::SignerUnavailable);
                }
            };

            *state = NegotiationState::Signing(pending.clone());
            (pending, signer)
        };

        tracing::info!("Signing transaction");
        let header = match self.sign_header(signer.as_ref(), &pending).await {
            Ok(header) => header,
            Err(e) => {
                tracing::error!("Transaction signing failed: {}", e);
                self.transition(NegotiationState::PaymentRequired(pending))
                    .await;
                return Err(e);
            }
        };

        // From here on the requirement is spent.
        self.transition(NegotiationState::Submitting(pending.clone()))
            .await;

        let mut headers = HeaderMap::new();
        headers.insert(wire::PAYMENT_HEADER, header);

        tracing::info!("Submitting payment for challenge {}", pending.id);
        let outcome = match self
            .client
            .call(self.method.clone(), &self.resource, headers)
            .await
        {
            Ok(response) => self.outcome_of(response, Some(&pending)),
            Err(e) => {
                tracing::error!(
                    "Payment submission for challenge {} failed, status unknown: {}",
                    pending.id,
                    e
                );
                PaymentOutcome::Error {
                    cause: e.to_string(),
                    payment_in_flight: true,
                }
            }
        };

        match &outcome {
            PaymentOutcome::Success(receipt) => match &receipt.transaction_hash {
                Some(hash) => tracing::info!("Payment successful - Tx: {}", hash),
                None => tracing::warn!(
                    "Payment for challenge {} accepted without a transaction hash",
                    pending.id
                ),
            },
            PaymentOutcome::Failed { http_status, .. } => {
                tracing::warn!("Payment failed with status {}", http_status)
            }
            PaymentOutcome::Error { .. } => {}
        }

        Ok(self.settle(outcome).await)
    }

    async fn sign_header(
        &self,
        signer: &dyn TransactionSigner,
        pending: &PendingPayment,
    ) -> Result<HeaderValue> {
        let payload = signer
            .sign(&pending.requirement.to_sign_request())
            .await
            .map_err(|e| match e {
                X402Error::SigningFailed { .. } => e,
                other => X402Error::signing_failed(other.to_string()),
            })?;

        if payload.is_empty() {
            return Err(X402Error::signing_failed("signer returned an empty payload"));
        }

        HeaderValue::from_str(&payload.encode(self.encoding))
            .map_err(|_| X402Error::signing_failed("signed payload is not a valid header value"))
    }

    fn outcome_of(
        &self,
        response: ResourceResponse,
        paid: Option<&PendingPayment>,
    ) -> PaymentOutcome {
        if response.status.is_success() {
            let receipt = SettlementReceipt::from_body(response.body);
            return PaymentOutcome::Success(match paid {
                Some(pending) => receipt.for_challenge(pending.id),
                None => receipt,
            });
        }

        if paid.is_some() && response.is_payment_required() {
            tracing::warn!(
                "{} answered the paid retry with a new challenge; not renegotiating",
                self.resource
            );
        }

        PaymentOutcome::Failed {
            http_status: response.status.as_u16(),
            body: response.body,
        }
    }
}
