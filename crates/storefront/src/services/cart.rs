//! Cart state store.
//!
//! [`CartStore`] owns the authoritative in-process [`Cart`]. Every mutation
//! follows the same order:
//!
//! 1. validate the request (a missing size is rejected, nothing changes)
//! 2. apply it to the in-memory cart and persist it to local storage
//! 3. if a session token is present and we are not offline, push the change
//!    to the remote cart service in a detached task, then reconcile
//!
//! Step 3 never blocks the caller and never fails the operation: a remote
//! failure only flips the shared offline flag. The local cart stays the read
//! model until a later reconcile succeeds, at which point the server's cart
//! replaces it.
//!
//! Reconciles can overlap (two quick mutations each trigger one). Each takes a
//! ticket from a monotonic counter before calling out, and a response is only
//! applied if no newer ticket has been applied already.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use pawpal_core::{Cart, CartError, CartLine, ProductId, Quantity, SizeLabel, parse_line_key};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::backend::CartService;
use crate::connectivity::Connectivity;
use crate::services::catalog::CatalogCache;
use crate::session::SessionTokens;
use crate::storage::KeyValueStore;

/// Local storage key the serialized cart lives under.
pub const CART_STORAGE_KEY: &str = "cartItems";

// =============================================================================
// Outcomes
// =============================================================================

/// User-facing confirmation of a cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartNotice {
    /// A unit was added.
    Added {
        /// Line product.
        product_id: ProductId,
        /// Line size.
        size: SizeLabel,
        /// Quantity after the add.
        quantity: Quantity,
    },
    /// A line was removed.
    Removed {
        /// Line product.
        product_id: ProductId,
        /// Line size.
        size: SizeLabel,
    },
    /// A line's quantity was set.
    Updated {
        /// Line product.
        product_id: ProductId,
        /// Line size.
        size: SizeLabel,
        /// New quantity.
        quantity: Quantity,
    },
    /// The requested line did not exist.
    Unchanged,
    /// The cart was emptied.
    Cleared,
}

impl fmt::Display for CartNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { .. } => f.write_str("Added to cart"),
            Self::Removed { .. } => f.write_str("Removed from cart"),
            Self::Updated { .. } => f.write_str("Cart updated"),
            Self::Unchanged => f.write_str("Item not in cart"),
            Self::Cleared => f.write_str("Cart cleared"),
        }
    }
}

/// How a remote synchronization attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No token, or offline: nothing was sent.
    Skipped,
    /// The server cart was fetched and committed.
    Synced,
    /// The server cart was fetched but a newer reconcile had already landed.
    Stale,
    /// A remote call failed; the store is now offline.
    WentOffline,
    /// The sync task panicked or was cancelled by runtime shutdown.
    Aborted,
}

/// A detached remote synchronization.
///
/// Dropping the handle does not cancel the work; awaiting [`SyncTask::wait`]
/// reports how it ended.
#[derive(Debug)]
pub struct SyncTask(JoinHandle<SyncOutcome>);

impl SyncTask {
    /// Wait for the remote call (and the reconcile it triggers) to finish.
    pub async fn wait(self) -> SyncOutcome {
        self.0.await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Cart sync task failed");
            SyncOutcome::Aborted
        })
    }
}

/// Result of a successful cart mutation.
#[derive(Debug)]
#[must_use = "the notice should be shown to the user"]
pub struct Mutation {
    /// What changed.
    pub notice: CartNotice,
    /// Remote push, if one was started.
    pub sync: Option<SyncTask>,
}

/// A change to push to the remote cart service.
#[derive(Debug, Clone)]
enum RemoteOp {
    Add(ProductId, SizeLabel),
    Remove(ProductId, SizeLabel),
    Set(ProductId, SizeLabel, Quantity),
}

// =============================================================================
// CartStore
// =============================================================================

/// Authoritative cart, mirrored locally and synchronized remotely.
///
/// Cheaply cloneable; clones share state. Construct one per process (or per
/// test) and inject it where needed.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    slot: RwLock<CartSlot>,
    storage: Arc<dyn KeyValueStore>,
    remote: Arc<dyn CartService>,
    session: Arc<dyn SessionTokens>,
    catalog: CatalogCache,
    tickets: AtomicU64,
}

struct CartSlot {
    cart: Cart,
    /// Ticket of the newest reconcile applied so far.
    applied_ticket: u64,
}

impl CartStore {
    /// Create a store, restoring any cart persisted in `storage`.
    ///
    /// The store shares the catalog's connectivity flag.
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        remote: Arc<dyn CartService>,
        session: Arc<dyn SessionTokens>,
        catalog: CatalogCache,
    ) -> Self {
        let cart = restore(storage.as_ref());
        Self {
            inner: Arc::new(CartStoreInner {
                slot: RwLock::new(CartSlot {
                    cart,
                    applied_ticket: 0,
                }),
                storage,
                remote,
                session,
                catalog,
                tickets: AtomicU64::new(0),
            }),
        }
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, CartSlot> {
        self.inner
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.inner
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cart
            .clone()
    }

    /// Flattened lines of the current cart.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.snapshot().lines()
    }

    /// Sum of every quantity in the cart.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.snapshot().total_items()
    }

    /// Sum of `price × quantity`, skipping products missing from the catalog.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        let catalog = &self.inner.catalog;
        self.snapshot()
            .total_amount(|id| catalog.price_of(id.as_str()))
    }

    /// Whether remote sync is currently paused.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.connectivity().is_offline()
    }

    /// The catalog used for totals.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    fn connectivity(&self) -> &Connectivity {
        self.inner.catalog.connectivity()
    }

    // =========================================================================
    // Local commit
    // =========================================================================

    /// Replace the cart and persist it. No remote call.
    ///
    /// Every mutation goes through here, so the cart invariants hold after
    /// each operation. A storage failure is logged and otherwise ignored: the
    /// in-memory cart stays correct, only durability is lost.
    pub fn commit(&self, cart: Cart) {
        let mut slot = self.write_slot();
        self.commit_locked(&mut slot, cart);
    }

    /// Persists while the slot lock is held, so the stored cart always
    /// matches the latest commit. The write is blocking file I/O on the
    /// calling thread, a tokio worker when called from a handler or a
    /// reconcile.
    fn commit_locked(&self, slot: &mut CartSlot, mut cart: Cart) {
        cart.prune();
        match serde_json::to_string(&cart) {
            Ok(json) => {
                if let Err(e) = self.inner.storage.set(CART_STORAGE_KEY, &json) {
                    tracing::warn!(error = %e, "Failed to persist cart, keeping it in memory only");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize cart"),
        }
        slot.cart = cart;
    }

    /// Apply `f` to a copy of the cart and commit the result atomically.
    fn mutate<R>(&self, f: impl FnOnce(&mut Cart) -> R) -> R {
        let mut slot = self.write_slot();
        let mut next = slot.cart.clone();
        let result = f(&mut next);
        self.commit_locked(&mut slot, next);
        result
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `(product_id, size)`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::SizeRequired`] if `size` is blank, or another
    /// [`CartError`] for a malformed product id. The cart is unchanged.
    pub fn add_line(&self, product_id: &str, size: &str) -> Result<Mutation, CartError> {
        let (product_id, size) = parse_line_key(product_id, size)?;
        let quantity = self.mutate(|cart| cart.increment(product_id.clone(), size.clone()));
        tracing::debug!(%product_id, %size, %quantity, "Added cart line");

        let sync = self.spawn_sync(RemoteOp::Add(product_id.clone(), size.clone()));
        Ok(Mutation {
            notice: CartNotice::Added {
                product_id,
                size,
                quantity,
            },
            sync,
        })
    }

    /// Remove the `(product_id, size)` line.
    ///
    /// A line that does not exist leaves the cart untouched and makes no
    /// remote call.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] for a blank size or malformed product id.
    pub fn remove_line(&self, product_id: &str, size: &str) -> Result<Mutation, CartError> {
        let (product_id, size) = parse_line_key(product_id, size)?;
        let removed = {
            let mut slot = self.write_slot();
            if slot.cart.quantity(product_id.as_str(), size.as_str()).is_none() {
                None
            } else {
                let mut next = slot.cart.clone();
                let removed = next.remove(product_id.as_str(), size.as_str());
                self.commit_locked(&mut slot, next);
                removed
            }
        };

        if removed.is_none() {
            return Ok(Mutation {
                notice: CartNotice::Unchanged,
                sync: None,
            });
        }

        tracing::debug!(%product_id, %size, "Removed cart line");
        let sync = self.spawn_sync(RemoteOp::Remove(product_id.clone(), size.clone()));
        Ok(Mutation {
            notice: CartNotice::Removed { product_id, size },
            sync,
        })
    }

    /// Set the `(product_id, size)` line to `quantity`.
    ///
    /// `quantity <= 0` behaves exactly like [`CartStore::remove_line`].
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] for a blank size or malformed product id.
    pub fn set_quantity(
        &self,
        product_id: &str,
        size: &str,
        quantity: i64,
    ) -> Result<Mutation, CartError> {
        let Some(quantity) = Quantity::from_signed(quantity) else {
            return self.remove_line(product_id, size);
        };

        let (product_id, size) = parse_line_key(product_id, size)?;
        self.mutate(|cart| {
            cart.set_quantity(product_id.clone(), size.clone(), i64::from(quantity.get()))
        });
        tracing::debug!(%product_id, %size, %quantity, "Set cart line quantity");

        let sync = self.spawn_sync(RemoteOp::Set(product_id.clone(), size.clone(), quantity));
        Ok(Mutation {
            notice: CartNotice::Updated {
                product_id,
                size,
                quantity,
            },
            sync,
        })
    }

    /// Empty the cart locally.
    ///
    /// Used after an order is placed. The server clears its own cart as part
    /// of order placement, so nothing is pushed.
    pub fn clear(&self) -> Mutation {
        self.commit(Cart::new());
        Mutation {
            notice: CartNotice::Cleared,
            sync: None,
        }
    }

    // =========================================================================
    // Remote synchronization
    // =========================================================================

    /// The token to use for a remote call, if remote sync is allowed now.
    fn remote_token(&self) -> Option<SecretString> {
        if self.connectivity().is_offline() {
            return None;
        }
        self.inner.session.token()
    }

    fn spawn_sync(&self, op: RemoteOp) -> Option<SyncTask> {
        let token = self.remote_token()?;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(?op, "No async runtime, cart change kept local only");
            return None;
        };

        let store = self.clone();
        Some(SyncTask(runtime.spawn(async move { store.push(op, token).await })))
    }

    #[instrument(skip(self, token))]
    async fn push(&self, op: RemoteOp, token: SecretString) -> SyncOutcome {
        let remote = &self.inner.remote;
        let result = match &op {
            RemoteOp::Add(p, s) => remote.add(&token, p, s).await,
            RemoteOp::Remove(p, s) => remote.remove(&token, p, s).await,
            RemoteOp::Set(p, s, q) => remote.set_quantity(&token, p, s, *q).await,
        };

        match result {
            Ok(()) => {
                self.connectivity().mark_online();
                self.reconcile().await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote cart update failed, keeping local cart");
                self.connectivity().mark_offline(&e);
                SyncOutcome::WentOffline
            }
        }
    }

    /// Replace the local cart with the server's.
    ///
    /// Skipped without a token or while offline. On failure the local cart is
    /// left untouched and the store goes offline. A response older than one
    /// already applied is discarded.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> SyncOutcome {
        let Some(token) = self.remote_token() else {
            return SyncOutcome::Skipped;
        };
        let ticket = self.inner.tickets.fetch_add(1, Ordering::SeqCst) + 1;

        let raw = match self.inner.remote.current_cart(&token).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, ticket, "Cart reconcile failed");
                self.connectivity().mark_offline(&e);
                return SyncOutcome::WentOffline;
            }
        };
        self.connectivity().mark_online();

        let server_cart = Cart::validate(&raw);
        let mut slot = self.write_slot();
        if ticket < slot.applied_ticket {
            tracing::debug!(ticket, applied = slot.applied_ticket, "Discarding stale cart");
            return SyncOutcome::Stale;
        }
        slot.applied_ticket = ticket;
        self.commit_locked(&mut slot, server_cart);
        drop(slot);

        tracing::debug!(ticket, "Cart reconciled with server");
        SyncOutcome::Synced
    }

    /// Leave offline mode and reconcile.
    ///
    /// This is the explicit "try again" path: while offline, mutations stop
    /// calling out, so something has to clear the flag.
    pub async fn resync(&self) -> SyncOutcome {
        self.connectivity().mark_online();
        self.reconcile().await
    }
}

/// Load the persisted cart, treating unreadable or malformed data as empty.
fn restore(storage: &dyn KeyValueStore) -> Cart {
    match storage.get(CART_STORAGE_KEY) {
        Ok(Some(json)) => Cart::from_json_str(&json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Persisted cart is not valid JSON, starting empty");
            Cart::new()
        }),
        Ok(None) => Cart::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read persisted cart, starting empty");
            Cart::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use async_trait::async_trait;
    use pawpal_core::{Price, Product};
    use serde_json::{Value, json};
    use tokio::sync::oneshot;

    use super::*;
    use crate::backend::{CatalogService, ProductList, RemoteError};
    use crate::session::SessionSlot;
    use crate::storage::{MemoryStore, StorageError};

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    /// Remote cart that mirrors calls into its own cart.
    #[derive(Default)]
    struct FakeRemote {
        server: Mutex<Cart>,
        fail: AtomicBool,
        calls: Mutex<Vec<String>>,
        gated: bool,
        gates: Mutex<Vec<Option<oneshot::Sender<Value>>>>,
    }

    impl FakeRemote {
        fn gated() -> Self {
            Self {
                gated: true,
                ..Self::default()
            }
        }

        fn check(&self, call: String) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().push(call);
            if self.fail.load(Ordering::SeqCst) {
                return Err(RemoteError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        async fn wait_for_gates(&self, n: usize) {
            for _ in 0..500 {
                if self.gates.lock().unwrap().len() >= n {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            panic!("expected {n} pending cart fetches");
        }

        fn release(&self, index: usize, cart: Value) {
            let sender = self.gates.lock().unwrap()[index].take().unwrap();
            sender.send(cart).unwrap();
        }
    }

    #[async_trait]
    impl CartService for FakeRemote {
        async fn add(
            &self,
            _token: &SecretString,
            product_id: &ProductId,
            size: &SizeLabel,
        ) -> Result<(), RemoteError> {
            self.check(format!("add {product_id}/{size}"))?;
            self.server
                .lock()
                .unwrap()
                .increment(product_id.clone(), size.clone());
            Ok(())
        }

        async fn remove(
            &self,
            _token: &SecretString,
            product_id: &ProductId,
            size: &SizeLabel,
        ) -> Result<(), RemoteError> {
            self.check(format!("remove {product_id}/{size}"))?;
            self.server
                .lock()
                .unwrap()
                .remove(product_id.as_str(), size.as_str());
            Ok(())
        }

        async fn set_quantity(
            &self,
            _token: &SecretString,
            product_id: &ProductId,
            size: &SizeLabel,
            quantity: Quantity,
        ) -> Result<(), RemoteError> {
            self.check(format!("set {product_id}/{size}={quantity}"))?;
            self.server.lock().unwrap().set_quantity(
                product_id.clone(),
                size.clone(),
                i64::from(quantity.get()),
            );
            Ok(())
        }

        async fn current_cart(&self, _token: &SecretString) -> Result<Value, RemoteError> {
            self.check("get".to_string())?;
            if self.gated {
                let (tx, rx) = oneshot::channel();
                self.gates.lock().unwrap().push(Some(tx));
                return rx.await.map_err(|_| RemoteError::MissingData("cartData"));
            }
            Ok(serde_json::to_value(&*self.server.lock().unwrap()).unwrap())
        }
    }

    struct FakeCatalog(Vec<Product>);

    #[async_trait]
    impl CatalogService for FakeCatalog {
        async fn list_products(&self, _allow_cached: bool) -> Result<ProductList, RemoteError> {
            Ok(ProductList {
                products: self.0.clone(),
                cached: false,
            })
        }
    }

    /// Storage whose writes always fail, like a full quota.
    struct FullStorage;

    impl KeyValueStore for FullStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("quota exceeded")))
        }
    }

    struct Harness {
        store: CartStore,
        remote: Arc<FakeRemote>,
        storage: Arc<MemoryStore>,
        session: SessionSlot,
    }

    fn harness_with(remote: FakeRemote, storage: MemoryStore, signed_in: bool) -> Harness {
        let remote = Arc::new(remote);
        let storage = Arc::new(storage);
        let session = SessionSlot::default();
        if signed_in {
            session.sign_in(SecretString::from("test-token"));
        }
        let catalog = CatalogCache::new(
            Arc::new(FakeCatalog(vec![product("a", 1000)])),
            Connectivity::new(),
        );
        let store = CartStore::new(
            storage.clone(),
            remote.clone(),
            Arc::new(session.clone()),
            catalog,
        );
        Harness {
            store,
            remote,
            storage,
            session,
        }
    }

    fn harness(signed_in: bool) -> Harness {
        harness_with(FakeRemote::default(), MemoryStore::new(), signed_in)
    }

    fn product(id: &str, cents: u32) -> Product {
        serde_json::from_value(json!({
            "_id": id,
            "name": id,
            "price": Price::from_cents(cents).amount().to_string(),
        }))
        .unwrap()
    }

    fn as_json(cart: &Cart) -> Value {
        serde_json::to_value(cart).unwrap()
    }

    fn assert_invariants(cart: &Cart) {
        let value = as_json(cart);
        for (_, sizes) in value.as_object().unwrap() {
            let sizes = sizes.as_object().unwrap();
            assert!(!sizes.is_empty(), "empty inner mapping in {value}");
            for quantity in sizes.values() {
                assert!(quantity.as_u64().unwrap() >= 1, "bad quantity in {value}");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Local behavior (no token)
    // -------------------------------------------------------------------------

    #[test]
    fn test_add_line_without_token_stays_local() {
        let h = harness(false);
        let mutation = h.store.add_line("a", "M").unwrap();

        assert_eq!(mutation.notice.to_string(), "Added to cart");
        assert!(mutation.sync.is_none());
        assert_eq!(h.store.snapshot().quantity("a", "M"), Some(Quantity::ONE));
        assert_eq!(
            h.storage.get(CART_STORAGE_KEY).unwrap().as_deref(),
            Some(r#"{"a":{"M":1}}"#)
        );
        assert!(h.remote.calls().is_empty());
    }

    #[test]
    fn test_add_line_requires_size() {
        let h = harness(false);
        let err = h.store.add_line("a", "").unwrap_err();
        assert_eq!(err, CartError::SizeRequired);
        assert_eq!(err.to_string(), "Select a size");
        assert!(h.store.snapshot().is_empty());
        assert!(h.storage.get(CART_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_invariants_hold_after_every_mutation() {
        let h = harness(false);
        let steps: [(&str, &str, i64); 8] = [
            ("a", "M", 1),
            ("a", "L", 3),
            ("b", "S", 2),
            ("a", "M", 0),
            ("b", "S", -1),
            ("c", "XL", 5),
            ("a", "L", 0),
            ("c", "XL", 0),
        ];
        for (product, size, quantity) in steps {
            let _ = h.store.add_line(product, size).unwrap();
            assert_invariants(&h.store.snapshot());
            let _ = h.store.set_quantity(product, size, quantity).unwrap();
            assert_invariants(&h.store.snapshot());
            let _ = h.store.remove_line("b", "S").unwrap();
            assert_invariants(&h.store.snapshot());
        }
        assert!(h.store.snapshot().is_empty());
    }

    #[test]
    fn test_add_then_remove_round_trips() {
        let h = harness(false);
        let _ = h.store.set_quantity("x", "S", 2).unwrap();
        let before = h.store.snapshot();

        let _ = h.store.add_line("a", "M").unwrap();
        let _ = h.store.remove_line("a", "M").unwrap();
        assert_eq!(h.store.snapshot(), before);
    }

    #[test]
    fn test_set_quantity_zero_equals_remove() {
        let via_set = harness(false);
        let via_remove = harness(false);
        for h in [&via_set, &via_remove] {
            let _ = h.store.set_quantity("a", "M", 2).unwrap();
            let _ = h.store.set_quantity("a", "L", 1).unwrap();
        }

        let set = via_set.store.set_quantity("a", "M", 0).unwrap();
        let removed = via_remove.store.remove_line("a", "M").unwrap();
        assert_eq!(set.notice, removed.notice);
        assert_eq!(via_set.store.snapshot(), via_remove.store.snapshot());
    }

    #[test]
    fn test_remove_missing_line_is_unchanged() {
        let h = harness(false);
        let mutation = h.store.remove_line("a", "M").unwrap();
        assert_eq!(mutation.notice, CartNotice::Unchanged);
        assert!(h.storage.get(CART_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_total_item_count() {
        let h = harness(false);
        let _ = h.store.set_quantity("shirt", "M", 2).unwrap();
        let _ = h.store.set_quantity("shirt", "L", 1).unwrap();
        assert_eq!(h.store.total_item_count(), 3);
    }

    #[tokio::test]
    async fn test_total_amount_skips_unknown_products() {
        let h = harness(false);
        h.store.catalog().load().await;
        let _ = h.store.set_quantity("a", "M", 2).unwrap();
        let _ = h.store.set_quantity("b", "M", 5).unwrap();
        assert_eq!(h.store.total_amount(), Decimal::from(20));
    }

    #[test]
    fn test_restores_and_validates_persisted_cart() {
        let storage = MemoryStore::with_entry(
            CART_STORAGE_KEY,
            r#"{"a": {"M": "2", "L": 1}, "b": {"S": 0}}"#,
        );
        let h = harness_with(FakeRemote::default(), storage, false);
        assert_eq!(as_json(&h.store.snapshot()), json!({ "a": { "L": 1 } }));
    }

    #[test]
    fn test_corrupt_persisted_cart_starts_empty() {
        let storage = MemoryStore::with_entry(CART_STORAGE_KEY, "{{{");
        let h = harness_with(FakeRemote::default(), storage, false);
        assert!(h.store.snapshot().is_empty());
    }

    #[test]
    fn test_storage_failure_keeps_memory_state() {
        let catalog = CatalogCache::new(Arc::new(FakeCatalog(Vec::new())), Connectivity::new());
        let store = CartStore::new(
            Arc::new(FullStorage),
            Arc::new(FakeRemote::default()),
            Arc::new(SessionSlot::default()),
            catalog,
        );

        let _ = store.add_line("a", "M").unwrap();
        assert_eq!(store.snapshot().quantity("a", "M"), Some(Quantity::ONE));
    }

    #[test]
    fn test_clear() {
        let h = harness(false);
        let _ = h.store.set_quantity("a", "M", 2).unwrap();
        assert_eq!(h.store.clear().notice, CartNotice::Cleared);
        assert!(h.store.snapshot().is_empty());
        assert_eq!(
            h.storage.get(CART_STORAGE_KEY).unwrap().as_deref(),
            Some("{}")
        );
    }

    // -------------------------------------------------------------------------
    // Remote behavior (token present)
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_add_line_pushes_then_reconciles() {
        let h = harness(true);
        h.remote
            .server
            .lock()
            .unwrap()
            .set_quantity(ProductId::parse("x").unwrap(), SizeLabel::one_size(), 4);

        let mutation = h.store.add_line("a", "M").unwrap();
        assert_eq!(mutation.sync.unwrap().wait().await, SyncOutcome::Synced);

        assert_eq!(h.remote.calls(), ["add a/M", "get"]);
        assert_eq!(
            as_json(&h.store.snapshot()),
            json!({ "a": { "M": 1 }, "x": { "one-size": 4 } })
        );
        assert!(!h.store.is_offline());
    }

    #[tokio::test]
    async fn test_remote_failure_goes_offline_and_keeps_line() {
        let h = harness(true);
        h.remote.fail.store(true, Ordering::SeqCst);

        let mutation = h.store.add_line("a", "M").unwrap();
        assert_eq!(h.store.snapshot().quantity("a", "M"), Some(Quantity::ONE));
        assert_eq!(mutation.sync.unwrap().wait().await, SyncOutcome::WentOffline);

        assert!(h.store.is_offline());
        assert_eq!(h.store.snapshot().quantity("a", "M"), Some(Quantity::ONE));

        // Offline: later mutations stay local
        let mutation = h.store.add_line("a", "M").unwrap();
        assert!(mutation.sync.is_none());
        assert_eq!(h.remote.calls(), ["add a/M"]);
    }

    #[tokio::test]
    async fn test_remove_and_set_push_matching_calls() {
        let h = harness(true);
        let m = h.store.set_quantity("a", "M", 3).unwrap();
        m.sync.unwrap().wait().await;
        let m = h.store.remove_line("a", "M").unwrap();
        m.sync.unwrap().wait().await;

        assert_eq!(h.remote.calls(), ["set a/M=3", "get", "remove a/M", "get"]);
        assert!(h.store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_server_wins() {
        let h = harness(true);
        let _ = h.store.clear();
        h.session.sign_out();
        let _ = h.store.add_line("local", "M").unwrap();
        h.session.sign_in(SecretString::from("test-token"));

        h.remote
            .server
            .lock()
            .unwrap()
            .set_quantity(ProductId::parse("remote").unwrap(), SizeLabel::one_size(), 1);

        assert_eq!(h.store.reconcile().await, SyncOutcome::Synced);
        assert_eq!(
            as_json(&h.store.snapshot()),
            json!({ "remote": { "one-size": 1 } })
        );
        assert_eq!(
            h.storage.get(CART_STORAGE_KEY).unwrap().as_deref(),
            Some(r#"{"remote":{"one-size":1}}"#)
        );
    }

    #[tokio::test]
    async fn test_reconcile_validates_server_cart() {
        let h = harness_with(FakeRemote::gated(), MemoryStore::new(), true);

        let store = h.store.clone();
        let task = tokio::spawn(async move { store.reconcile().await });
        h.remote.wait_for_gates(1).await;
        h.remote
            .release(0, json!({ "a": { "M": 2, "L": "3", "S": 0 }, "b": {} }));

        assert_eq!(task.await.unwrap(), SyncOutcome::Synced);
        assert_eq!(as_json(&h.store.snapshot()), json!({ "a": { "M": 2 } }));
    }

    #[tokio::test]
    async fn test_stale_reconcile_is_discarded() {
        let h = harness_with(FakeRemote::gated(), MemoryStore::new(), true);

        let first = h.store.clone();
        let first = tokio::spawn(async move { first.reconcile().await });
        h.remote.wait_for_gates(1).await;

        let second = h.store.clone();
        let second = tokio::spawn(async move { second.reconcile().await });
        h.remote.wait_for_gates(2).await;

        // Newer response lands first
        h.remote.release(1, json!({ "new": { "M": 1 } }));
        assert_eq!(second.await.unwrap(), SyncOutcome::Synced);

        h.remote.release(0, json!({ "old": { "M": 9 } }));
        assert_eq!(first.await.unwrap(), SyncOutcome::Stale);

        assert_eq!(as_json(&h.store.snapshot()), json!({ "new": { "M": 1 } }));
    }

    #[tokio::test]
    async fn test_reconcile_failure_leaves_local_cart() {
        let h = harness(false);
        let _ = h.store.add_line("a", "M").unwrap();
        h.session.sign_in(SecretString::from("test-token"));
        h.remote.fail.store(true, Ordering::SeqCst);

        assert_eq!(h.store.reconcile().await, SyncOutcome::WentOffline);
        assert!(h.store.is_offline());
        assert_eq!(as_json(&h.store.snapshot()), json!({ "a": { "M": 1 } }));

        // Offline reconciles are skipped without calling out
        assert_eq!(h.store.reconcile().await, SyncOutcome::Skipped);
        assert_eq!(h.remote.calls(), ["get"]);
    }

    #[tokio::test]
    async fn test_resync_clears_offline() {
        let h = harness(true);
        h.store.catalog().connectivity().mark_offline(&"earlier failure");
        assert_eq!(h.store.reconcile().await, SyncOutcome::Skipped);

        assert_eq!(h.store.resync().await, SyncOutcome::Synced);
        assert!(!h.store.is_offline());
    }

    #[tokio::test]
    async fn test_reconcile_without_token_is_skipped() {
        let h = harness(false);
        assert_eq!(h.store.reconcile().await, SyncOutcome::Skipped);
        assert!(h.remote.calls().is_empty());
    }
}
