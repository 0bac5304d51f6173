//! Snapshot Fetcher
//!
//! Pages through the node's current order set with `mesh_getOrders`. The
//! first request carries an empty cursor; every later page reuses the
//! snapshot id returned by the first response so all pages come from one
//! consistent view. Each non-empty page is delivered as one Add batch, in
//! page order. The run ends at the first empty page.

use super::codec::decode_order;
use super::session::{MeshError, MeshSession};
use crate::application::ports::LifecycleSink;
use crate::domain::lifecycle::{LifecycleBatch, LifecycleKind};
use crate::infrastructure::metrics::record_lifecycle_batch;

/// Fetch the full order set and deliver it as Add batches.
///
/// Returns the number of orders delivered.
///
/// # Errors
///
/// Returns the first `MeshError` from a page request. Pages delivered before
/// the failure stay delivered.
pub async fn fetch_snapshot(
    session: &dyn MeshSession,
    page_size: usize,
    sink: &dyn LifecycleSink,
) -> Result<usize, MeshError> {
    let mut page: u32 = 0;
    let mut snapshot_id = String::new();
    let mut delivered = 0;

    loop {
        let response = session.get_orders(page, page_size, &snapshot_id).await?;
        if page == 0 {
            snapshot_id = response.snapshot_id;
        }

        if response.orders_infos.is_empty() {
            break;
        }

        let orders: Vec<_> = response
            .orders_infos
            .iter()
            .filter_map(|info| match decode_order(&info.signed_order) {
                Ok(order) => Some(order),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        order_hash = %info.order_hash,
                        "Skipping undecodable snapshot order"
                    );
                    None
                }
            })
            .collect();

        tracing::debug!(page, orders = orders.len(), %snapshot_id, "Snapshot page received");

        if let Some(batch) = LifecycleBatch::new(LifecycleKind::Add, orders) {
            delivered += batch.len();
            record_lifecycle_batch(batch.kind(), batch.len());
            sink.on_lifecycle_event(batch);
        }

        page = page.saturating_add(1);
    }

    Ok(delivered)
}
