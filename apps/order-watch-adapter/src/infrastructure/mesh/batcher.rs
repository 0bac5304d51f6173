//! Submission Batcher
//!
//! Splits a submission into fixed-size chunks and sends them to Mesh one
//! after another. Every chunk waits for a connected session of its own, so a
//! submission can span a reconnect between chunks.
//!
//! Mesh answers with its own `accepted`/`rejected` lists. Those are matched
//! back to the submitted orders by wire form so the combined result is in
//! input order and covers every input exactly once.

use std::collections::{HashMap, VecDeque};

use super::codec::{encode_orders, rejection_reason};
use super::connection::SessionWatch;
use super::messages::{WireSignedOrder, WireValidationResults};
use super::session::MeshError;
use crate::domain::order::SignedOrder;
use crate::domain::validation::{RejectionKind, RejectionReason, ValidationResults};
use crate::error::AdapterError;
use crate::infrastructure::metrics::record_submission;

/// Code reported for orders Mesh left out of its response.
pub const MISSING_RESULT_CODE: &str = "InternalError";

/// Submit `orders` in chunks of `chunk_size`.
///
/// Empty input returns an empty result without touching the connection.
///
/// # Errors
///
/// - `AdapterError::Mesh` if the first chunk fails.
/// - `AdapterError::PartialSubmission` if a later chunk fails, or the adapter
///   stops before it is sent; the error carries the results of the chunks
///   that completed.
/// - `AdapterError::ShutDown` if the adapter stops before the first chunk.
pub async fn submit_in_chunks(
    sessions: &SessionWatch,
    orders: Vec<SignedOrder>,
    chunk_size: usize,
) -> Result<ValidationResults, AdapterError> {
    let mut results = ValidationResults::new();
    if orders.is_empty() {
        return Ok(results);
    }

    for (index, chunk) in orders.chunks(chunk_size.max(1)).enumerate() {
        let session = match sessions.wait_for_session().await {
            Ok(session) => session,
            Err(e) if index == 0 => return Err(e),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    failed_chunk = index,
                    completed = results.len(),
                    "Mesh adapter stopped part-way through a submission"
                );
                return Err(AdapterError::PartialSubmission {
                    completed: results,
                    failed_chunk: index,
                    source: MeshError::ConnectionClosed,
                });
            }
        };

        tracing::debug!(chunk = index, orders = chunk.len(), "Submitting orders to Mesh");

        match session.add_orders(encode_orders(chunk)).await {
            Ok(response) => {
                let chunk_results = reconcile_chunk(chunk, response);
                record_submission(chunk_results.accepted.len(), chunk_results.rejected.len());
                results.extend(chunk_results);
            }
            Err(source) if index == 0 => return Err(AdapterError::Mesh(source)),
            Err(source) => {
                tracing::warn!(
                    error = %source,
                    failed_chunk = index,
                    completed = results.len(),
                    "Mesh submission failed part-way"
                );
                return Err(AdapterError::PartialSubmission {
                    completed: results,
                    failed_chunk: index,
                    source,
                });
            }
        }
    }

    Ok(results)
}

enum Outcome {
    Accepted,
    Rejected(RejectionReason),
}

/// Match one Mesh response back to the chunk it answers.
///
/// The result lists follow chunk order. Orders Mesh did not mention are
/// rejected with `MESH_ERROR InternalError`; entries matching no submitted
/// order are ignored.
#[must_use]
pub fn reconcile_chunk(chunk: &[SignedOrder], response: WireValidationResults) -> ValidationResults {
    let mut positions: HashMap<WireSignedOrder, VecDeque<usize>> = HashMap::new();
    for (index, order) in chunk.iter().enumerate() {
        positions
            .entry(match_key(WireSignedOrder::from(order)))
            .or_default()
            .push_back(index);
    }

    let mut outcomes: Vec<Option<Outcome>> = chunk.iter().map(|_| None).collect();
    let mut place = |wire: WireSignedOrder, order_hash: &str, outcome: Outcome| {
        let slot = positions
            .get_mut(&match_key(wire))
            .and_then(VecDeque::pop_front)
            .and_then(|index| outcomes.get_mut(index));
        match slot {
            Some(slot) => *slot = Some(outcome),
            None => tracing::warn!(%order_hash, "Mesh returned an order that was not submitted"),
        }
    };

    for info in response.accepted {
        place(info.signed_order, &info.order_hash, Outcome::Accepted);
    }
    for info in response.rejected {
        let reason = rejection_reason(info.kind, &info.status);
        place(info.signed_order, &info.order_hash, Outcome::Rejected(reason));
    }

    let mut results = ValidationResults::new();
    for (order, outcome) in chunk.iter().zip(outcomes) {
        match outcome {
            Some(Outcome::Accepted) => results.accept(order.clone()),
            Some(Outcome::Rejected(reason)) => results.reject(order.clone(), reason),
            None => results.reject(
                order.clone(),
                RejectionReason::new(
                    RejectionKind::MeshError,
                    MISSING_RESULT_CODE,
                    "order missing from Mesh response",
                ),
            ),
        }
    }
    results
}

/// Hex fields compare case-insensitively.
fn match_key(mut wire: WireSignedOrder) -> WireSignedOrder {
    for field in [
        &mut wire.sender_address,
        &mut wire.maker_address,
        &mut wire.taker_address,
        &mut wire.maker_asset_data,
        &mut wire.taker_asset_data,
        &mut wire.exchange_address,
        &mut wire.fee_recipient_address,
        &mut wire.signature,
    ] {
        field.make_ascii_lowercase();
    }
    wire
}
