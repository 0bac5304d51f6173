//! Local Watcher Adapter
//!
//! Local backend of the [`OrderWatcherAdapter`] contract. Orders are
//! validated by fillability simulation, registered with the local order
//! watcher and announced to the owner one by one.
//!
//! Validity updates from the watcher drive the shadow tracker: an order
//! reported invalid is hidden through `order_filter` and evicted by the
//! periodic sweep once the shadowing margin elapses, unless a valid report
//! clears it first. An eviction removes the order from the watcher and emits
//! exactly one Remove batch for it.
//!
//! The tracked orders and the shadow tracker live in one [`LocalBook`]
//! behind a mutex. The lock is never held across an await or an owner
//! callback.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    FillabilityValidator, LifecycleSink, OrderHasher, OrderStateUpdate, OrderStateWatcher,
    OrderWatcherAdapter, WatcherError,
};
use crate::domain::lifecycle::LifecycleBatch;
use crate::domain::order::{OrderHash, SignedOrder};
use crate::domain::shadow::ShadowOrderTracker;
use crate::domain::validation::{RejectionKind, RejectionReason, ValidationResults};
use crate::error::AdapterError;
use crate::infrastructure::config::ShadowSettings;
use crate::infrastructure::metrics::{
    record_lifecycle_batch, record_shadow_evictions, record_submission, set_shadowed_orders,
};

/// Rejection code for orders that fail fillability simulation.
pub const NOT_FILLABLE_CODE: &str = "OrderNotFillable";

/// Rejection code for orders the local watcher refuses.
pub const WATCHER_REJECTED_CODE: &str = "OrderWatcherRejected";

/// Shortest sweep period; a zero cleanup interval cannot drive a ticker.
const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

/// Orders tracked by the local adapter and their shadow state.
#[derive(Debug, Default)]
pub struct LocalBook {
    orders: HashMap<OrderHash, SignedOrder>,
    shadows: ShadowOrderTracker,
}

impl LocalBook {
    /// Number of tracked orders.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.orders.len()
    }

    /// Number of shadowed orders.
    #[must_use]
    pub fn shadowed(&self) -> usize {
        self.shadows.len()
    }
}

/// Order watcher backed by local fillability simulation.
pub struct LocalWatcherAdapter<V, W, H>
where
    V: FillabilityValidator + 'static,
    W: OrderStateWatcher + 'static,
    H: OrderHasher + 'static,
{
    validator: Arc<V>,
    watcher: Arc<W>,
    hasher: Arc<H>,
    sink: Arc<dyn LifecycleSink>,
    book: Arc<Mutex<LocalBook>>,
    simulation_taker_address: String,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<V, W, H> LocalWatcherAdapter<V, W, H>
where
    V: FillabilityValidator + 'static,
    W: OrderStateWatcher + 'static,
    H: OrderHasher + 'static,
{
    /// Create the adapter and start its shadow task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(
        settings: &ShadowSettings,
        validator: Arc<V>,
        watcher: Arc<W>,
        hasher: Arc<H>,
        sink: Arc<dyn LifecycleSink>,
    ) -> Self {
        let book = Arc::new(Mutex::new(LocalBook::default()));
        let cancel = CancellationToken::new();

        let shadow_task = ShadowTask {
            book: Arc::clone(&book),
            watcher: Arc::clone(&watcher),
            sink: Arc::clone(&sink),
            settings: settings.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(shadow_task.run(watcher.subscribe()));

        tracing::info!(
            margin_ms = duration_millis(settings.shadowing_margin),
            cleanup_interval_ms = duration_millis(settings.cleanup_interval),
            "Local watcher adapter started"
        );

        Self {
            validator,
            watcher,
            hasher,
            sink,
            book,
            simulation_taker_address: settings.simulation_taker_address.clone(),
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Number of tracked orders.
    #[must_use]
    pub fn tracked_orders(&self) -> usize {
        self.book.lock().tracked()
    }

    /// Number of shadowed orders.
    #[must_use]
    pub fn shadowed_orders(&self) -> usize {
        self.book.lock().shadowed()
    }

    /// Stop the shadow task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Shadow task failed");
        }
    }

    async fn admit(&self, order: &SignedOrder) -> Result<(), RejectionReason> {
        self.validator
            .validate_fillable(order, &self.simulation_taker_address)
            .await
            .map_err(|e| {
                RejectionReason::new(RejectionKind::LocalValidation, NOT_FILLABLE_CODE, e.message)
            })?;

        self.watcher.add_order(order).await.map_err(|e| {
            RejectionReason::new(RejectionKind::LocalWatcher, WATCHER_REJECTED_CODE, e.message)
        })
    }
}

impl<V, W, H> Drop for LocalWatcherAdapter<V, W, H>
where
    V: FillabilityValidator + 'static,
    W: OrderStateWatcher + 'static,
    H: OrderHasher + 'static,
{
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<V, W, H> std::fmt::Debug for LocalWatcherAdapter<V, W, H>
where
    V: FillabilityValidator + 'static,
    W: OrderStateWatcher + 'static,
    H: OrderHasher + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let book = self.book.lock();
        f.debug_struct("LocalWatcherAdapter")
            .field("tracked", &book.tracked())
            .field("shadowed", &book.shadowed())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<V, W, H> OrderWatcherAdapter for LocalWatcherAdapter<V, W, H>
where
    V: FillabilityValidator + 'static,
    W: OrderStateWatcher + 'static,
    H: OrderHasher + 'static,
{
    async fn add_orders(
        &self,
        orders: Vec<SignedOrder>,
    ) -> Result<ValidationResults, AdapterError> {
        let mut results = ValidationResults::new();

        for order in orders {
            match self.admit(&order).await {
                Ok(()) => {
                    let order_hash = self.hasher.order_hash(&order);
                    self.book.lock().orders.insert(order_hash, order.clone());

                    let batch = LifecycleBatch::add(order.clone());
                    record_lifecycle_batch(batch.kind(), batch.len());
                    self.sink.on_lifecycle_event(batch);
                    results.accept(order);
                }
                Err(reason) => {
                    tracing::debug!(%reason, "Order rejected locally");
                    results.reject(order, reason);
                }
            }
        }

        record_submission(results.accepted.len(), results.rejected.len());
        Ok(results)
    }

    fn remove_orders(&self, orders: &[SignedOrder]) {
        for order in orders {
            let order_hash = self.hasher.order_hash(order);
            self.watcher.remove_order(&order_hash);

            let mut book = self.book.lock();
            book.orders.remove(&order_hash);
            book.shadows.clear(&order_hash);
        }
        set_shadowed_orders(self.book.lock().shadowed());
    }

    fn order_filter(&self, order: &SignedOrder) -> bool {
        let order_hash = self.hasher.order_hash(order);
        self.book.lock().shadows.is_shadowed(&order_hash)
    }
}

// =============================================================================
// Shadow Task
// =============================================================================

/// Sole consumer of watcher updates and sole evictor of shadowed orders.
struct ShadowTask<W: OrderStateWatcher> {
    book: Arc<Mutex<LocalBook>>,
    watcher: Arc<W>,
    sink: Arc<dyn LifecycleSink>,
    settings: ShadowSettings,
    cancel: CancellationToken,
}

impl<W: OrderStateWatcher> ShadowTask<W> {
    async fn run(self, mut updates: mpsc::Receiver<Result<OrderStateUpdate, WatcherError>>) {
        let period = self.settings.cleanup_interval.max(MIN_SWEEP_PERIOD);
        let mut sweep = tokio::time::interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut watching = true;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                update = updates.recv(), if watching => match update {
                    Some(Ok(update)) => self.apply_update(&update),
                    Some(Err(e)) => tracing::warn!(error = %e, "Order watcher reported an error"),
                    None => {
                        tracing::warn!("Order watcher update stream ended");
                        watching = false;
                    }
                },
                _ = sweep.tick() => self.sweep(),
            }
        }

        tracing::debug!("Shadow task stopped");
    }

    fn apply_update(&self, update: &OrderStateUpdate) {
        let now = Instant::now().into_std();
        let shadowed = {
            let mut book = self.book.lock();
            book.shadows
                .record_validity(&update.order_hash, update.is_valid, now);
            book.shadows.len()
        };

        tracing::trace!(
            order_hash = %update.order_hash,
            is_valid = update.is_valid,
            "Order validity changed"
        );
        set_shadowed_orders(shadowed);
    }

    /// Evict every shadow older than the margin.
    fn sweep(&self) {
        let now = Instant::now().into_std();
        let (evicted, shadowed) = {
            let mut guard = self.book.lock();
            let book = &mut *guard;
            let evicted: Vec<_> = book
                .shadows
                .expired(now, self.settings.shadowing_margin)
                .into_iter()
                .map(|order_hash| {
                    book.shadows.clear(&order_hash);
                    let order = book.orders.remove(&order_hash);
                    (order_hash, order)
                })
                .collect();
            (evicted, book.shadows.len())
        };

        let mut count = 0;
        for (order_hash, order) in evicted {
            let Some(order) = order else {
                tracing::debug!(%order_hash, "Dropping shadow of untracked order");
                continue;
            };

            self.watcher.remove_order(&order_hash);
            tracing::info!(%order_hash, "Evicting order after shadowing margin");

            let batch = LifecycleBatch::remove(order);
            record_lifecycle_batch(batch.kind(), batch.len());
            self.sink.on_lifecycle_event(batch);
            count += 1;
        }

        if count > 0 {
            record_shadow_evictions(count);
        }
        set_shadowed_orders(shadowed);
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use ethers::types::U256;

    use super::*;
    use crate::application::ports::ValidationError;
    use crate::domain::lifecycle::LifecycleKind;
    use crate::domain::order::fixtures::order_with_salt;

    struct SaltHasher;

    impl OrderHasher for SaltHasher {
        fn order_hash(&self, order: &SignedOrder) -> OrderHash {
            OrderHash::new(format!("0x{:x}", order.salt))
        }
    }

    /// Rejects orders whose salt is in `unfillable`.
    #[derive(Default)]
    struct FakeValidator {
        unfillable: HashSet<U256>,
        takers: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FillabilityValidator for FakeValidator {
        async fn validate_fillable(
            &self,
            order: &SignedOrder,
            simulation_taker: &str,
        ) -> Result<(), ValidationError> {
            self.takers.lock().push(simulation_taker.to_string());
            if self.unfillable.contains(&order.salt) {
                Err(ValidationError::new("insufficient maker balance"))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct FakeWatcher {
        refuse: HashSet<U256>,
        added: Mutex<Vec<U256>>,
        removed: Mutex<Vec<OrderHash>>,
        updates: Mutex<Option<mpsc::Sender<Result<OrderStateUpdate, WatcherError>>>>,
    }

    #[async_trait]
    impl OrderStateWatcher for FakeWatcher {
        async fn add_order(&self, order: &SignedOrder) -> Result<(), WatcherError> {
            if self.refuse.contains(&order.salt) {
                return Err(WatcherError::new("order already watched"));
            }
            self.added.lock().push(order.salt);
            Ok(())
        }

        fn remove_order(&self, order_hash: &OrderHash) {
            self.removed.lock().push(order_hash.clone());
        }

        fn subscribe(&self) -> mpsc::Receiver<Result<OrderStateUpdate, WatcherError>> {
            let (tx, rx) = mpsc::channel(16);
            *self.updates.lock() = Some(tx);
            rx
        }
    }

    type Batches = Arc<Mutex<Vec<LifecycleBatch>>>;

    fn adapter(
        validator: FakeValidator,
        watcher: Arc<FakeWatcher>,
    ) -> (LocalWatcherAdapter<FakeValidator, FakeWatcher, SaltHasher>, Batches) {
        let batches: Batches = Arc::new(Mutex::new(Vec::new()));
        let sink_batches = Arc::clone(&batches);
        let settings = ShadowSettings {
            simulation_taker_address: "0x00000000000000000000000000000000000000aa".to_string(),
            ..ShadowSettings::default()
        };
        let adapter = LocalWatcherAdapter::spawn(
            &settings,
            Arc::new(validator),
            watcher,
            Arc::new(SaltHasher),
            Arc::new(move |batch: LifecycleBatch| sink_batches.lock().push(batch)),
        );
        (adapter, batches)
    }

    #[tokio::test]
    async fn add_orders_partitions_and_announces_each_accepted_order() {
        let validator = FakeValidator {
            unfillable: HashSet::from([U256::from(2)]),
            ..FakeValidator::default()
        };
        let watcher = Arc::new(FakeWatcher {
            refuse: HashSet::from([U256::from(3)]),
            ..FakeWatcher::default()
        });
        let (adapter, batches) = adapter(validator, Arc::clone(&watcher));

        let orders: Vec<_> = (1..=4).map(order_with_salt).collect();
        let results = adapter.add_orders(orders.clone()).await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results.accepted.len(), 2);
        assert_eq!(
            results.rejected[0].message(),
            "LOCAL_VALIDATION OrderNotFillable: insufficient maker balance"
        );
        assert_eq!(
            results.rejected[1].message(),
            "LOCAL_WATCHER OrderWatcherRejected: order already watched"
        );

        let batches = batches.lock();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.kind() == LifecycleKind::Add && b.len() == 1));
        assert_eq!(batches[0].orders()[0], orders[0]);
        assert_eq!(batches[1].orders()[0], orders[3]);
        assert_eq!(adapter.tracked_orders(), 2);
    }

    #[tokio::test]
    async fn simulation_uses_configured_taker() {
        let watcher = Arc::new(FakeWatcher::default());
        let validator = FakeValidator::default();
        let (adapter, _batches) = adapter(validator, watcher);

        adapter.add_orders(vec![order_with_salt(1)]).await.unwrap();

        let takers = adapter.validator.takers.lock().clone();
        assert_eq!(takers, vec!["0x00000000000000000000000000000000000000aa"]);
    }

    #[tokio::test]
    async fn empty_add_returns_empty_results() {
        let (adapter, batches) = adapter(FakeValidator::default(), Arc::new(FakeWatcher::default()));
        let results = adapter.add_orders(Vec::new()).await.unwrap();
        assert!(results.is_empty());
        assert!(batches.lock().is_empty());
    }

    #[tokio::test]
    async fn invalid_update_shadows_and_valid_update_clears() {
        let watcher = Arc::new(FakeWatcher::default());
        let (adapter, _batches) = adapter(FakeValidator::default(), Arc::clone(&watcher));
        let order = order_with_salt(5);
        adapter.add_orders(vec![order.clone()]).await.unwrap();

        let updates = watcher.updates.lock().clone().unwrap();
        let order_hash = SaltHasher.order_hash(&order);

        updates
            .send(Ok(OrderStateUpdate {
                order_hash: order_hash.clone(),
                is_valid: false,
            }))
            .await
            .unwrap();
        wait_until(|| adapter.order_filter(&order)).await;

        updates
            .send(Ok(OrderStateUpdate {
                order_hash,
                is_valid: true,
            }))
            .await
            .unwrap();
        wait_until(|| !adapter.order_filter(&order)).await;
    }

    #[tokio::test]
    async fn remove_orders_unwatches_and_clears_shadow() {
        let watcher = Arc::new(FakeWatcher::default());
        let (adapter, _batches) = adapter(FakeValidator::default(), Arc::clone(&watcher));
        let order = order_with_salt(9);
        adapter.add_orders(vec![order.clone()]).await.unwrap();

        let order_hash = SaltHasher.order_hash(&order);
        let updates = watcher.updates.lock().clone().unwrap();
        updates
            .send(Ok(OrderStateUpdate {
                order_hash: order_hash.clone(),
                is_valid: false,
            }))
            .await
            .unwrap();
        wait_until(|| adapter.order_filter(&order)).await;

        adapter.remove_orders(std::slice::from_ref(&order));

        assert!(!adapter.order_filter(&order));
        assert_eq!(adapter.tracked_orders(), 0);
        assert_eq!(*watcher.removed.lock(), vec![order_hash]);
    }

    #[tokio::test]
    async fn watcher_errors_do_not_stop_tracking() {
        let watcher = Arc::new(FakeWatcher::default());
        let (adapter, _batches) = adapter(FakeValidator::default(), Arc::clone(&watcher));
        let order = order_with_salt(11);
        adapter.add_orders(vec![order.clone()]).await.unwrap();

        let updates = watcher.updates.lock().clone().unwrap();
        updates
            .send(Err(WatcherError::new("block stream stalled")))
            .await
            .unwrap();
        updates
            .send(Ok(OrderStateUpdate {
                order_hash: SaltHasher.order_hash(&order),
                is_valid: false,
            }))
            .await
            .unwrap();

        wait_until(|| adapter.order_filter(&order)).await;
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }
}
