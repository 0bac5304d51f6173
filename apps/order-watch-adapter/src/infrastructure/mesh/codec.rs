//! Mesh Codec Module
//!
//! Converts between the in-memory [`SignedOrder`] and its Mesh wire form, and
//! frames JSON-RPC traffic.
//!
//! # Order Encoding
//!
//! Numeric fields (fees, amounts, salt, expiration) travel as base-10 strings.
//! Addresses, asset data and the signature are passed through unchanged.
//!
//! ```json
//! {"makerFee":"0","salt":"1548619145450","expirationTimeSeconds":"1893456000", ...}
//! ```

use ethers::types::U256;
use serde::Serialize;
use serde_json::Value;

use super::messages::{
    JsonRpcError, JsonRpcRequest, METHOD_SUBSCRIPTION, RawFrame, SubscriptionParams,
    WireRejectedKind, WireRejectedStatus, WireSignedOrder,
};
use crate::domain::order::SignedOrder;
use crate::domain::validation::{RejectionKind, RejectionReason};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// A numeric order field is not a base-10 unsigned integer.
    #[error("invalid numeric field {field}: {value:?}")]
    InvalidNumber {
        /// Wire field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// Frame is neither a response nor a subscription notification.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

// =============================================================================
// Orders
// =============================================================================

impl From<&SignedOrder> for WireSignedOrder {
    fn from(order: &SignedOrder) -> Self {
        Self {
            sender_address: order.sender_address.clone(),
            maker_address: order.maker_address.clone(),
            taker_address: order.taker_address.clone(),
            maker_fee: order.maker_fee.to_string(),
            taker_fee: order.taker_fee.to_string(),
            maker_asset_amount: order.maker_asset_amount.to_string(),
            taker_asset_amount: order.taker_asset_amount.to_string(),
            maker_asset_data: order.maker_asset_data.clone(),
            taker_asset_data: order.taker_asset_data.clone(),
            salt: order.salt.to_string(),
            exchange_address: order.exchange_address.clone(),
            fee_recipient_address: order.fee_recipient_address.clone(),
            expiration_time_seconds: order.expiration_time_seconds.to_string(),
            signature: order.signature.clone(),
        }
    }
}

impl TryFrom<&WireSignedOrder> for SignedOrder {
    type Error = CodecError;

    fn try_from(wire: &WireSignedOrder) -> Result<Self, Self::Error> {
        Ok(Self {
            sender_address: wire.sender_address.clone(),
            maker_address: wire.maker_address.clone(),
            taker_address: wire.taker_address.clone(),
            maker_fee: parse_decimal("makerFee", &wire.maker_fee)?,
            taker_fee: parse_decimal("takerFee", &wire.taker_fee)?,
            maker_asset_amount: parse_decimal("makerAssetAmount", &wire.maker_asset_amount)?,
            taker_asset_amount: parse_decimal("takerAssetAmount", &wire.taker_asset_amount)?,
            maker_asset_data: wire.maker_asset_data.clone(),
            taker_asset_data: wire.taker_asset_data.clone(),
            salt: parse_decimal("salt", &wire.salt)?,
            exchange_address: wire.exchange_address.clone(),
            fee_recipient_address: wire.fee_recipient_address.clone(),
            expiration_time_seconds: parse_decimal(
                "expirationTimeSeconds",
                &wire.expiration_time_seconds,
            )?,
            signature: wire.signature.clone(),
        })
    }
}

/// Encode orders for a `mesh_addOrders` request.
#[must_use]
pub fn encode_orders(orders: &[SignedOrder]) -> Vec<WireSignedOrder> {
    orders.iter().map(WireSignedOrder::from).collect()
}

/// Decode a wire order.
///
/// # Errors
///
/// Returns `CodecError::InvalidNumber` if a numeric field is malformed.
pub fn decode_order(wire: &WireSignedOrder) -> Result<SignedOrder, CodecError> {
    SignedOrder::try_from(wire)
}

fn parse_decimal(field: &'static str, value: &str) -> Result<U256, CodecError> {
    let digits = value.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::InvalidNumber {
            field,
            value: value.to_string(),
        });
    }
    U256::from_dec_str(digits).map_err(|_| CodecError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Build the domain rejection reason for a Mesh rejection.
#[must_use]
pub fn rejection_reason(kind: WireRejectedKind, status: &WireRejectedStatus) -> RejectionReason {
    let kind = match kind {
        WireRejectedKind::ZeroexValidation => RejectionKind::ZeroexValidation,
        WireRejectedKind::MeshError => RejectionKind::MeshError,
        WireRejectedKind::MeshValidation => RejectionKind::MeshValidation,
    };
    RejectionReason::new(kind, status.code.clone(), status.message.clone())
}

// =============================================================================
// JSON-RPC Frames
// =============================================================================

/// Classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshFrame {
    /// Response to a request we sent.
    Response {
        /// Correlation id of the request.
        id: u64,
        /// Result value or error object.
        outcome: Result<Value, JsonRpcError>,
    },
    /// Push notification for a subscription.
    Notification(SubscriptionParams),
}

/// JSON codec for Mesh JSON-RPC frames.
#[derive(Debug, Default, Clone)]
pub struct JsonRpcCodec;

impl JsonRpcCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode a request to its text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters fail to serialize.
    pub fn encode_request<P: Serialize>(
        &self,
        id: u64,
        method: &str,
        params: P,
    ) -> Result<String, CodecError> {
        Ok(serde_json::to_string(&JsonRpcRequest::new(id, method, params))?)
    }

    /// Decode an inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or is neither a response nor
    /// a `mesh_subscription` notification.
    pub fn decode(&self, text: &str) -> Result<MeshFrame, CodecError> {
        let frame: RawFrame = serde_json::from_str(text.trim())?;

        if let Some(id) = frame.id {
            let outcome = match frame.error {
                Some(error) => Err(error),
                None => Ok(frame.result.unwrap_or(Value::Null)),
            };
            return Ok(MeshFrame::Response { id, outcome });
        }

        match (frame.method.as_deref(), frame.params) {
            (Some(METHOD_SUBSCRIPTION), Some(params)) => Ok(MeshFrame::Notification(params)),
            (method, _) => Err(CodecError::InvalidFrame(format!(
                "no id and unsupported method {method:?}"
            ))),
        }
    }
}
