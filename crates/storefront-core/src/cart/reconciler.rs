//! Cart reconciler: the single owner of local cart state.
//!
//! Every mutation is applied in memory and written through to the
//! [`DurableStore`] before the call returns. The outcome of both halves is
//! reported together in a [`MutationReport`]; a failed write never rolls back
//! memory, it raises the persistence failure flag instead.
//!
//! Staleness is checked at explicit checkpoints: on restore, before each
//! mutation, and whenever a caller observes the cart via [`CartReconciler::observe`].

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::cart::model::{Cart, CartItem, ProductSnapshot};
use crate::cart::store::DurableStore;
use crate::cart::sync::CartEnvelope;
use crate::clock::Clock;
use crate::error::{PersistenceError, SyncError};

/// Durable key holding the JSON array of cart items.
pub const CART_ITEMS_KEY: &str = "cart_items";

/// Durable key holding `lastModifiedAt` as epoch milliseconds.
pub const CART_MODIFIED_AT_KEY: &str = "cart_last_modified_at";

/// Default age after which a persisted cart is discarded.
pub const DEFAULT_STALENESS_HORIZON_HOURS: i64 = 24;

/// Outcome of a cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationReport {
    /// Whether in-memory state changed.
    pub changed: bool,
    /// Set when the change could not be written to the durable store.
    pub persistence_error: Option<PersistenceError>,
}

impl MutationReport {
    fn unchanged() -> Self {
        Self::default()
    }

    fn applied(persisted: Result<(), PersistenceError>) -> Self {
        Self {
            changed: true,
            persistence_error: persisted.err(),
        }
    }

    /// True when memory and the durable store agree after the mutation.
    pub fn is_persisted(&self) -> bool {
        self.persistence_error.is_none()
    }
}

/// Owns the cart and its persisted record.
pub struct CartReconciler {
    cart: Cart,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    staleness_horizon: Duration,
    persistence_failure: Option<PersistenceError>,
}

impl CartReconciler {
    /// Restores the cart from `store`, discarding it if it is stale.
    ///
    /// An unreadable record leaves the cart empty and raises the persistence
    /// failure flag; the next successful write replaces the record.
    pub fn restore(
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        staleness_horizon: Duration,
    ) -> Self {
        let mut reconciler = Self {
            cart: Cart::new(),
            store,
            clock,
            staleness_horizon,
            persistence_failure: None,
        };

        match reconciler.load_record() {
            Ok(Some((items, modified_at))) => {
                let stamped = modified_at.is_some();
                let modified_at = modified_at.unwrap_or_else(|| reconciler.clock.now());
                reconciler.cart = Cart::from_items(items, Some(modified_at));
                tracing::debug!(
                    "[CartReconciler] Restored {} cart lines (last modified {})",
                    reconciler.cart.len(),
                    modified_at
                );
                if !stamped {
                    // Older records carry no timestamp; start the staleness window now.
                    let result = reconciler.write_modified_at(modified_at);
                    let _ = reconciler.record(result);
                }
            }
            Ok(None) => {
                tracing::debug!("[CartReconciler] No persisted cart, starting empty");
            }
            Err(e) => {
                tracing::warn!("[CartReconciler] Failed to restore cart: {}", e);
                reconciler.persistence_failure = Some(e);
            }
        }

        reconciler.expire_if_stale();
        reconciler
    }

    /// Restores with the default 24 hour staleness horizon.
    pub fn restore_with_default_horizon(
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::restore(
            store,
            clock,
            Duration::hours(DEFAULT_STALENESS_HORIZON_HOURS),
        )
    }

    /// The current cart without running the staleness checkpoint.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The current cart, after discarding it if it has gone stale.
    pub fn observe(&mut self) -> &Cart {
        self.expire_if_stale();
        &self.cart
    }

    /// Current lines in insertion order, after the staleness checkpoint.
    pub fn snapshot(&mut self) -> Vec<CartItem> {
        self.observe().to_vec()
    }

    pub fn staleness_horizon(&self) -> Duration {
        self.staleness_horizon
    }

    /// The last persistence failure, if no write has succeeded since.
    pub fn persistence_failure(&self) -> Option<&PersistenceError> {
        self.persistence_failure.as_ref()
    }

    /// Acknowledges a surfaced persistence failure.
    pub fn clear_persistence_failure(&mut self) {
        self.persistence_failure = None;
    }

    /// Clears the cart if it is older than the staleness horizon.
    ///
    /// Returns `true` if the cart was discarded.
    pub fn expire_if_stale(&mut self) -> bool {
        let now = self.clock.now();
        if !self.cart.is_stale(now, self.staleness_horizon) {
            return false;
        }
        tracing::info!(
            "[CartReconciler] Cart last modified {:?} is older than {}h, clearing",
            self.cart.last_modified_at(),
            self.staleness_horizon.num_hours()
        );
        self.clear();
        true
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Adds `quantity` of `product`, merging into an existing line with the same id.
    ///
    /// A quantity of zero is treated as one.
    pub fn add_item(&mut self, product: ProductSnapshot, quantity: u32) -> MutationReport {
        self.expire_if_stale();
        let now = self.clock.now();
        tracing::debug!(
            "[CartReconciler] add_item id={} quantity={}",
            product.id,
            quantity
        );
        self.cart.add(product, quantity, now);
        let result = self.persist();
        MutationReport::applied(self.record(result))
    }

    /// Sets a line's quantity, clamped to at least 1. Absent ids are ignored.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) -> MutationReport {
        self.expire_if_stale();
        let clamped = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        let now = self.clock.now();
        if !self.cart.set_quantity(id, clamped, now) {
            return MutationReport::unchanged();
        }
        tracing::debug!("[CartReconciler] update_quantity id={} quantity={}", id, clamped);
        let result = self.persist();
        MutationReport::applied(self.record(result))
    }

    /// Removes a line. Removing an absent id touches neither memory nor storage.
    pub fn remove_item(&mut self, id: &str) -> MutationReport {
        self.expire_if_stale();
        let now = self.clock.now();
        if !self.cart.remove(id, now) {
            return MutationReport::unchanged();
        }
        tracing::debug!("[CartReconciler] remove_item id={}", id);
        let result = self.persist();
        MutationReport::applied(self.record(result))
    }

    /// Empties the cart and deletes its persisted record.
    pub fn clear(&mut self) -> MutationReport {
        let had_state = !self.cart.is_empty() || self.cart.last_modified_at().is_some();
        self.cart.reset();
        // Both deletes run; the first failure is reported.
        let items = self.store.remove(CART_ITEMS_KEY);
        let modified_at = self.store.remove(CART_MODIFIED_AT_KEY);
        let result = items.and(modified_at);
        let persistence_error = self.record(result).err();
        MutationReport {
            changed: had_state,
            persistence_error,
        }
    }

    // ------------------------------------------------------------------------
    // Server reconciliation
    // ------------------------------------------------------------------------

    /// Replaces local state with the server's cart, verbatim.
    ///
    /// A response that violates the cart invariants is rejected and local
    /// state is left untouched.
    pub fn apply_server_cart(&mut self, items: Vec<CartItem>) -> Result<MutationReport, SyncError> {
        CartEnvelope::new(items.clone()).validate()?;
        let now = self.clock.now();
        self.cart.replace_all(items, now);
        tracing::info!(
            "[CartReconciler] Adopted server cart with {} lines",
            self.cart.len()
        );
        let result = self.persist();
        Ok(MutationReport::applied(self.record(result)))
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    fn persist(&self) -> Result<(), PersistenceError> {
        let items = serde_json::to_string(&self.cart.to_vec())
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        self.store.set(CART_ITEMS_KEY, &items)?;
        match self.cart.last_modified_at() {
            Some(modified_at) => self.write_modified_at(modified_at),
            None => self.store.remove(CART_MODIFIED_AT_KEY),
        }
    }

    fn write_modified_at(&self, modified_at: DateTime<Utc>) -> Result<(), PersistenceError> {
        self.store.set(
            CART_MODIFIED_AT_KEY,
            &modified_at.timestamp_millis().to_string(),
        )
    }

    /// Updates the failure flag from a write result and passes it through.
    fn record(&mut self, result: Result<(), PersistenceError>) -> Result<(), PersistenceError> {
        match &result {
            Ok(()) => self.persistence_failure = None,
            Err(e) => {
                tracing::warn!(
                    "[CartReconciler] Persistence failed, keeping in-memory cart: {}",
                    e
                );
                self.persistence_failure = Some(e.clone());
            }
        }
        result
    }

    #[allow(clippy::type_complexity)]
    fn load_record(
        &self,
    ) -> Result<Option<(Vec<CartItem>, Option<DateTime<Utc>>)>, PersistenceError> {
        let Some(raw_items) = self.store.get(CART_ITEMS_KEY)? else {
            return Ok(None);
        };
        let mut items: Vec<CartItem> =
            serde_json::from_str(&raw_items).map_err(|e| PersistenceError::Corrupt {
                key: CART_ITEMS_KEY.to_string(),
                message: e.to_string(),
            })?;
        for item in &mut items {
            item.quantity = item.quantity.max(1);
        }

        let modified_at = match self.store.get(CART_MODIFIED_AT_KEY)? {
            Some(raw) => {
                let millis = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| PersistenceError::Corrupt {
                        key: CART_MODIFIED_AT_KEY.to_string(),
                        message: e.to_string(),
                    })?;
                DateTime::from_timestamp_millis(millis)
            }
            None => None,
        };

        Ok(Some((items, modified_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::store::MemoryStore;
    use crate::clock::ManualClock;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    // Store that counts writes and can be told to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
        fail_removal_of: Mutex<Option<&'static str>>,
        writes: AtomicUsize,
    }

    impl DurableStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PersistenceError::Write {
                    key: key.to_string(),
                    message: "quota exceeded".to_string(),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), PersistenceError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if *self.fail_removal_of.lock().unwrap() == Some(key) {
                return Err(PersistenceError::Write {
                    key: key.to_string(),
                    message: "locked".to_string(),
                });
            }
            self.inner.remove(key)
        }
    }

    fn setup() -> (Arc<FlakyStore>, Arc<ManualClock>, CartReconciler) {
        let store = Arc::new(FlakyStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let reconciler =
            CartReconciler::restore_with_default_horizon(store.clone(), clock.clone());
        (store, clock, reconciler)
    }

    fn product(id: &str) -> ProductSnapshot {
        ProductSnapshot::new(id, format!("Product {}", id), 10.0)
    }

    fn persisted_items(store: &FlakyStore) -> Vec<CartItem> {
        store
            .get(CART_ITEMS_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
            .unwrap_or_default()
    }

    fn server_item(id: &str, quantity: u32) -> CartItem {
        CartItem::from_product(product(id), quantity, Utc::now())
    }

    #[test]
    fn test_persisted_record_tracks_every_mutation() {
        let (store, _clock, mut cart) = setup();

        cart.add_item(product("1"), 2);
        assert_eq!(persisted_items(&store), cart.cart().to_vec());

        cart.add_item(product("2"), 1);
        cart.update_quantity("1", 7);
        assert_eq!(persisted_items(&store), cart.cart().to_vec());

        cart.remove_item("2");
        cart.update_quantity("1", -4);
        assert_eq!(persisted_items(&store), cart.cart().to_vec());
        assert_eq!(cart.cart().get("1").unwrap().quantity, 1);
    }

    #[test]
    fn test_duplicate_add_sums_quantities() {
        let (_store, _clock, mut cart) = setup();
        cart.add_item(product("x"), 3);
        cart.add_item(product("x"), 4);

        assert_eq!(cart.cart().len(), 1);
        assert_eq!(cart.cart().get("x").unwrap().quantity, 7);
    }

    #[test]
    fn test_update_quantity_clamps_to_one() {
        let (_store, _clock, mut cart) = setup();
        cart.add_item(product("x"), 5);

        let report = cart.update_quantity("x", 0);
        assert!(report.changed);
        assert_eq!(cart.cart().get("x").unwrap().quantity, 1);
    }

    #[test]
    fn test_noop_mutations_do_not_write_or_touch_timestamp() {
        let (store, clock, mut cart) = setup();
        cart.add_item(product("x"), 1);
        let stamped = cart.cart().last_modified_at();
        let writes = store.writes.load(Ordering::SeqCst);

        clock.advance(Duration::hours(1));
        assert!(!cart.remove_item("absent").changed);
        assert!(!cart.update_quantity("absent", 3).changed);
        assert!(!cart.update_quantity("x", 1).changed);

        assert_eq!(store.writes.load(Ordering::SeqCst), writes);
        assert_eq!(cart.cart().last_modified_at(), stamped);
    }

    #[test]
    fn test_clear_deletes_persisted_record() {
        let (store, _clock, mut cart) = setup();
        cart.add_item(product("x"), 1);
        cart.clear();

        assert!(cart.cart().is_empty());
        assert!(store.inner.keys().is_empty());
    }

    #[test]
    fn test_clear_removes_timestamp_even_if_items_delete_fails() {
        let (store, _clock, mut cart) = setup();
        cart.add_item(product("x"), 1);
        *store.fail_removal_of.lock().unwrap() = Some(CART_ITEMS_KEY);

        let report = cart.clear();

        assert!(report.changed);
        assert!(matches!(
            report.persistence_error,
            Some(PersistenceError::Write { ref key, .. }) if key == CART_ITEMS_KEY
        ));
        assert!(cart.persistence_failure().is_some());
        assert!(store.inner.get(CART_MODIFIED_AT_KEY).unwrap().is_none());
        assert!(store.inner.get(CART_ITEMS_KEY).unwrap().is_some());
    }

    #[test]
    fn test_stale_cart_cleared_on_next_access() {
        let (store, clock, mut cart) = setup();
        cart.add_item(product("x"), 2);

        clock.advance(Duration::hours(24) + Duration::minutes(1));
        assert!(cart.observe().is_empty());
        assert_eq!(store.get(CART_ITEMS_KEY).unwrap(), None);
    }

    #[test]
    fn test_stale_cart_cleared_before_mutation() {
        let (_store, clock, mut cart) = setup();
        cart.add_item(product("old"), 2);

        clock.advance(Duration::hours(25));
        cart.add_item(product("new"), 1);

        let ids: Vec<_> = cart.cart().items().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["new".to_string()]);
    }

    #[test]
    fn test_restore_discards_stale_record() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        {
            let mut cart =
                CartReconciler::restore_with_default_horizon(store.clone(), clock.clone());
            cart.add_item(product("x"), 1);
        }

        clock.advance(Duration::hours(48));
        let restored = CartReconciler::restore_with_default_horizon(store.clone(), clock);
        assert!(restored.cart().is_empty());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_restore_fresh_record() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        {
            let mut cart =
                CartReconciler::restore_with_default_horizon(store.clone(), clock.clone());
            cart.add_item(product("a"), 1);
            cart.add_item(product("b"), 3);
        }

        clock.advance(Duration::hours(2));
        let restored = CartReconciler::restore_with_default_horizon(store, clock);
        let ids: Vec<_> = restored.cart().items().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(restored.cart().get("b").unwrap().quantity, 3);
    }

    #[test]
    fn test_restore_without_timestamp_starts_window() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let items = vec![server_item("a", 2)];
        store
            .set(CART_ITEMS_KEY, &serde_json::to_string(&items).unwrap())
            .unwrap();

        let restored = CartReconciler::restore_with_default_horizon(store.clone(), clock.clone());
        assert_eq!(restored.cart().len(), 1);
        assert_eq!(
            store.get(CART_MODIFIED_AT_KEY).unwrap(),
            Some(clock.now().timestamp_millis().to_string())
        );
    }

    #[test]
    fn test_restore_corrupt_record_raises_flag() {
        let store = Arc::new(MemoryStore::new());
        store.set(CART_ITEMS_KEY, "{not json").unwrap();

        let restored =
            CartReconciler::restore_with_default_horizon(store, Arc::new(ManualClock::new(Utc::now())));
        assert!(restored.cart().is_empty());
        assert!(matches!(
            restored.persistence_failure(),
            Some(PersistenceError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_persistence_failure_keeps_memory_and_raises_flag() {
        let (store, _clock, mut cart) = setup();
        store.fail_writes.store(true, Ordering::SeqCst);

        let report = cart.add_item(product("x"), 2);
        assert!(report.changed);
        assert!(!report.is_persisted());
        assert_eq!(cart.cart().get("x").unwrap().quantity, 2);
        assert!(cart.persistence_failure().is_some());

        store.fail_writes.store(false, Ordering::SeqCst);
        let report = cart.add_item(product("x"), 1);
        assert!(report.is_persisted());
        assert!(cart.persistence_failure().is_none());
        assert_eq!(persisted_items(&store), cart.cart().to_vec());
    }

    #[test]
    fn test_server_cart_replaces_local_state_verbatim() {
        let (store, _clock, mut cart) = setup();
        cart.add_item(product("1"), 2);
        cart.add_item(product("discontinued"), 1);

        let server = vec![server_item("1", 1), server_item("2", 1)];
        let report = cart.apply_server_cart(server.clone()).unwrap();

        assert!(report.changed);
        assert_eq!(cart.cart().to_vec(), server);
        assert!(!cart.cart().contains("discontinued"));
        assert_eq!(persisted_items(&store), server);
    }

    #[test]
    fn test_invalid_server_cart_is_rejected() {
        let (_store, _clock, mut cart) = setup();
        cart.add_item(product("1"), 2);
        let before = cart.cart().clone();

        let mut bad = server_item("1", 1);
        bad.quantity = 0;

        assert!(matches!(
            cart.apply_server_cart(vec![bad]),
            Err(SyncError::InvalidResponse(_))
        ));
        assert_eq!(cart.cart(), &before);
    }
}
