//! Mesh Wire Message Types
//!
//! Serde types for the Mesh JSON-RPC API. Field names follow the wire format
//! (`camelCase`, with `snapshotID` as the one exception).

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// JSON-RPC Framing
// =============================================================================

/// JSON-RPC protocol version tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method used to open a subscription.
pub const METHOD_SUBSCRIBE: &str = "mesh_subscribe";

/// Method used to submit orders.
pub const METHOD_ADD_ORDERS: &str = "mesh_addOrders";

/// Method used to page through the current order set.
pub const METHOD_GET_ORDERS: &str = "mesh_getOrders";

/// Method name carried by subscription notifications.
pub const METHOD_SUBSCRIPTION: &str = "mesh_subscription";

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a, P> {
    /// Protocol version, always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Correlation id.
    pub id: u64,
    /// Method name.
    pub method: &'a str,
    /// Positional parameters.
    pub params: P,
}

impl<'a, P: Serialize> JsonRpcRequest<'a, P> {
    /// Create a request.
    #[must_use]
    pub const fn new(id: u64, method: &'a str, params: P) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

/// Error object of a failed JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

/// Parameters of a subscription notification.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubscriptionParams {
    /// Subscription id returned by `mesh_subscribe`.
    pub subscription: String,
    /// Channel payload.
    #[serde(default)]
    pub result: Value,
}

/// Any inbound frame, before it is classified.
#[derive(Debug, Deserialize)]
pub(crate) struct RawFrame {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<SubscriptionParams>,
}

// =============================================================================
// Orders
// =============================================================================

/// Signed order with every numeric field encoded as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSignedOrder {
    /// Sender address.
    pub sender_address: String,
    /// Maker address.
    pub maker_address: String,
    /// Taker address.
    pub taker_address: String,
    /// Maker fee (decimal).
    pub maker_fee: String,
    /// Taker fee (decimal).
    pub taker_fee: String,
    /// Maker asset amount (decimal).
    pub maker_asset_amount: String,
    /// Taker asset amount (decimal).
    pub taker_asset_amount: String,
    /// Maker asset data.
    pub maker_asset_data: String,
    /// Taker asset data.
    pub taker_asset_data: String,
    /// Salt (decimal).
    pub salt: String,
    /// Exchange address.
    pub exchange_address: String,
    /// Fee recipient address.
    pub fee_recipient_address: String,
    /// Expiration timestamp in seconds (decimal).
    pub expiration_time_seconds: String,
    /// Signature.
    pub signature: String,
}

/// Order event pushed on the `orders` subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrderEvent {
    /// Hash of the order.
    pub order_hash: String,
    /// The order itself.
    pub signed_order: WireSignedOrder,
    /// Event tag, e.g. `ADDED`.
    pub kind: String,
    /// Remaining fillable taker amount (decimal).
    #[serde(default)]
    pub fillable_taker_asset_amount: String,
    /// Transaction that caused the event, if any.
    #[serde(default)]
    pub tx_hash: String,
}

/// Order info as returned by `mesh_addOrders` (accepted) and `mesh_getOrders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireOrderInfo {
    /// Hash of the order.
    #[serde(default)]
    pub order_hash: String,
    /// The order itself.
    pub signed_order: WireSignedOrder,
    /// Remaining fillable taker amount (decimal).
    #[serde(default)]
    pub fillable_taker_asset_amount: String,
}

/// Rejection classification reported by Mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireRejectedKind {
    /// Failed 0x order validation.
    ZeroexValidation,
    /// Internal Mesh failure.
    MeshError,
    /// Rejected by Mesh policy.
    MeshValidation,
}

/// Status detail of a rejected order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRejectedStatus {
    /// Machine-readable code, e.g. `OrderHasInvalidSignature`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Rejected order entry of `mesh_addOrders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRejectedOrderInfo {
    /// Hash of the order.
    #[serde(default)]
    pub order_hash: String,
    /// The order itself.
    pub signed_order: WireSignedOrder,
    /// Rejection classification.
    pub kind: WireRejectedKind,
    /// Rejection detail.
    pub status: WireRejectedStatus,
}

/// Result of `mesh_addOrders`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireValidationResults {
    /// Accepted orders.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub accepted: Vec<WireOrderInfo>,
    /// Rejected orders.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rejected: Vec<WireRejectedOrderInfo>,
}

/// Result of `mesh_getOrders`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireGetOrdersResponse {
    /// Snapshot cursor to reuse for the following pages.
    #[serde(rename = "snapshotID", default)]
    pub snapshot_id: String,
    /// Orders of the requested page.
    #[serde(rename = "ordersInfos", default, deserialize_with = "null_as_empty")]
    pub orders_infos: Vec<WireOrderInfo>,
}

/// Mesh serialises empty lists as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
