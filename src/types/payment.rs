//! Payment-related types

use super::constants::wire;
use crate::{Result, X402Error};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Payment terms issued by a protected resource in a 402 challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequirement {
    /// Address that must receive the payment
    pub recipient: String,
    /// Amount in the smallest currency unit (plancks)
    #[serde(
        serialize_with = "serialize_amount",
        deserialize_with = "deserialize_amount"
    )]
    pub amount: u128,
    /// Currency symbol (e.g. "PAS")
    pub currency: String,
    /// Network identifier matching a registered profile
    pub network: String,
    /// Optional memo or payment reference
    #[serde(default, alias = "reference", skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl PaymentRequirement {
    /// Create a new payment requirement
    pub fn new(
        recipient: impl Into<String>,
        amount: u128,
        currency: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            amount,
            currency: currency.into(),
            network: network.into(),
            memo: None,
        }
    }

    /// Set the memo
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Extract the requirement from a 402 response body
    pub fn from_challenge_body(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            X402Error::malformed_challenge(format!("challenge body is not JSON: {}", e))
        })?;

        let terms = value
            .get(wire::REQUIREMENTS_FIELD)
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                X402Error::malformed_challenge(format!(
                    "challenge body has no '{}' object",
                    wire::REQUIREMENTS_FIELD
                ))
            })?;

        let requirement: PaymentRequirement = serde_json::from_value(terms.clone())
            .map_err(|e| X402Error::malformed_challenge(e.to_string()))?;

        if requirement.recipient.trim().is_empty() {
            return Err(X402Error::malformed_challenge("recipient is empty"));
        }
        if requirement.network.trim().is_empty() {
            return Err(X402Error::malformed_challenge("network is empty"));
        }

        Ok(requirement)
    }

    /// Build the request handed to the signer
    pub fn to_sign_request(&self) -> SignRequest {
        SignRequest {
            recipient_address: self.recipient.clone(),
            amount: self.amount,
        }
    }

    /// Get the amount in whole tokens, for display only
    pub fn amount_in_decimal_units(&self, decimals: u8) -> Result<Decimal> {
        let amount = Decimal::from_str(&self.amount.to_string())
            .map_err(|_| X402Error::config("Amount exceeds displayable precision"))?;
        let divisor = Decimal::from_str(&format!("1{}", "0".repeat(decimals as usize)))
            .map_err(|_| X402Error::config("Unsupported number of decimals"))?;
        Ok(amount / divisor)
    }
}

fn serialize_amount<S: Serializer>(amount: &u128, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(amount)
}

fn deserialize_amount<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u128, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(u64),
        Text(String),
    }

    match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(n) => Ok(u128::from(n)),
        RawAmount::Text(s) => s
            .trim()
            .parse::<u128>()
            .map_err(|_| D::Error::custom(format!("amount '{}' is not an unsigned integer", s))),
    }
}

/// A requirement received from a challenge, awaiting payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayment {
    /// Identifier of the challenge instance
    pub id: Uuid,
    /// The payment terms
    pub requirement: PaymentRequirement,
    /// The full challenge body as received
    pub challenge_body: String,
    /// When the challenge was received
    pub received_at: DateTime<Utc>,
}

impl PendingPayment {
    /// Wrap a freshly parsed requirement
    pub fn new(requirement: PaymentRequirement, challenge_body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            requirement,
            challenge_body: challenge_body.into(),
            received_at: Utc::now(),
        }
    }
}

/// Input to the external signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    /// Recipient of the transfer
    pub recipient_address: String,
    /// Amount in the smallest currency unit
    pub amount: u128,
}

/// How a signed payload is written into the payment header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// `0x`-prefixed lowercase hex
    #[default]
    Hex,
    /// Standard base64
    Base64,
}

impl FromStr for PayloadEncoding {
    type Err = X402Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(Self::Hex),
            "base64" => Ok(Self::Base64),
            other => Err(X402Error::config(format!(
                "Unknown payload encoding '{}', expected 'hex' or 'base64'",
                other
            ))),
        }
    }
}

/// Opaque proof of payment produced by the signer
#[derive(Clone, PartialEq, Eq)]
pub struct SignedPayload(Vec<u8>);

impl SignedPayload {
    /// Wrap raw signed bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode a hex string, with or without the `0x` prefix
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded.trim().trim_start_matches("0x"))
            .map_err(|e| X402Error::config(format!("Invalid hex payload: {}", e)))?;
        Ok(Self(bytes))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the payload holds no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode for the payment header
    pub fn encode(&self, encoding: PayloadEncoding) -> String {
        match encoding {
            PayloadEncoding::Hex => format!("0x{}", hex::encode(&self.0)),
            PayloadEncoding::Base64 => general_purpose::STANDARD.encode(&self.0),
        }
    }
}

impl fmt::Debug for SignedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignedPayload")
            .field(&format!("{} bytes", self.0.len()))
            .finish()
    }
}

/// Details of a resource that was granted
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReceipt {
    /// Challenge paid for this grant; `None` when no payment was needed
    pub challenge_id: Option<Uuid>,
    /// Transaction identifier, when the server reports one
    pub transaction_hash: Option<String>,
    /// Block or confirmation identifier, when reported
    pub block_hash: Option<String>,
    /// Response body exactly as received
    pub body: String,
    /// When the outcome was recorded
    pub settled_at: DateTime<Utc>,
}

impl SettlementReceipt {
    /// Build a receipt from a success response body
    pub fn from_body(body: impl Into<String>) -> Self {
        let body = body.into();
        let json: Option<Value> = serde_json::from_str(&body).ok();
        let field = |name: &str| {
            json.as_ref()
                .and_then(|v| v.get(name))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            challenge_id: None,
            transaction_hash: field(wire::TRANSACTION_HASH_FIELD),
            block_hash: field(wire::BLOCK_HASH_FIELD),
            body,
            settled_at: Utc::now(),
        }
    }

    /// Mark the receipt as the grant for a paid challenge
    pub fn for_challenge(mut self, challenge_id: Uuid) -> Self {
        self.challenge_id = Some(challenge_id);
        self
    }

    /// Whether a signed payment was submitted for this grant
    pub fn is_paid(&self) -> bool {
        self.challenge_id.is_some()
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Terminal result of a negotiation
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// The resource was granted
    Success(SettlementReceipt),
    /// The resource answered with a definitive rejection
    Failed {
        /// HTTP status of the rejection
        http_status: u16,
        /// Response body exactly as received
        body: String,
    },
    /// The transport failed
    Error {
        /// Description of the failure
        cause: String,
        /// True when a signed payment had already been sent, so its status is unknown
        payment_in_flight: bool,
    },
}

impl PaymentOutcome {
    /// Whether the outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Transaction identifier of a successful payment
    pub fn transaction_hash(&self) -> Option<&str> {
        match self {
            Self::Success(receipt) => receipt.transaction_hash.as_deref(),
            _ => None,
        }
    }
}
