//! Integration tests for the storefront sync engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storefront-sync-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_sync` - Debounced pushes and their cancellation
//! - `merge_on_login` - Pull and reconcile on authentication
//! - `persistence` - Restart recovery through the file store
//! - `catalog_events` - Bulk load fallback and push-event application
//!
//! Everything runs in-process against the fakes below; no test touches the
//! network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use storefront_sync::catalog::CatalogSource;
use storefront_sync::channel::EventHub;
use storefront_sync::remote::{RemoteError, RemoteStore};
use storefront_sync::store::{LocalStore, MemoryStore};
use storefront_sync::{Session, SessionDeps, SyncConfig};
use storefront_sync_core::{
    CartLine, Email, LineKey, ProductId, ProductRecord, SessionIdentity, UserId,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// FakeRemote
// =============================================================================

/// One recorded call against [`FakeRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    SaveCart(UserId, Vec<CartLine>),
    FetchCart(UserId),
    SaveWishlist(UserId, Vec<ProductId>),
    FetchWishlist(UserId),
}

/// In-memory remote store that records every call.
///
/// Payloads are recorded when a call starts, before any configured delay.
#[derive(Debug, Default)]
pub struct FakeRemote {
    carts: Mutex<HashMap<UserId, Vec<CartLine>>>,
    wishlists: Mutex<HashMap<UserId, Vec<ProductId>>>,
    calls: Mutex<Vec<RemoteCall>>,
    fail_fetches: AtomicBool,
    fail_saves: AtomicBool,
    fetch_delay: Mutex<Duration>,
    save_delay: Mutex<Duration>,
}

impl FakeRemote {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_cart(&self, user: &UserId, lines: Vec<CartLine>) {
        lock(&self.carts).insert(user.clone(), lines);
    }

    pub fn seed_wishlist(&self, user: &UserId, ids: Vec<ProductId>) {
        lock(&self.wishlists).insert(user.clone(), ids);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *lock(&self.fetch_delay) = delay;
    }

    pub fn set_save_delay(&self, delay: Duration) {
        *lock(&self.save_delay) = delay;
    }

    /// Remote cart as last saved or seeded.
    #[must_use]
    pub fn stored_cart(&self, user: &UserId) -> Vec<CartLine> {
        lock(&self.carts).get(user).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        lock(&self.calls).clone()
    }

    /// Every cart save, in call order.
    #[must_use]
    pub fn cart_saves(&self) -> Vec<(UserId, Vec<CartLine>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::SaveCart(user, lines) => Some((user, lines)),
                _ => None,
            })
            .collect()
    }

    /// Every wishlist save, in call order.
    #[must_use]
    pub fn wishlist_saves(&self) -> Vec<(UserId, Vec<ProductId>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::SaveWishlist(user, ids) => Some((user, ids)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RemoteCall) {
        lock(&self.calls).push(call);
    }

    async fn pause(delay: &Mutex<Duration>) {
        let delay = *lock(delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(flag: &AtomicBool) -> Result<(), RemoteError> {
        if flag.load(Ordering::SeqCst) {
            return Err(RemoteError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn save_cart(&self, user: &UserId, lines: &[CartLine]) -> Result<(), RemoteError> {
        self.record(RemoteCall::SaveCart(user.clone(), lines.to_vec()));
        Self::pause(&self.save_delay).await;
        Self::check(&self.fail_saves)?;
        lock(&self.carts).insert(user.clone(), lines.to_vec());
        Ok(())
    }

    async fn fetch_cart(&self, user: &UserId) -> Result<Vec<CartLine>, RemoteError> {
        self.record(RemoteCall::FetchCart(user.clone()));
        Self::pause(&self.fetch_delay).await;
        Self::check(&self.fail_fetches)?;
        Ok(self.stored_cart(user))
    }

    async fn save_wishlist(&self, user: &UserId, ids: &[ProductId]) -> Result<(), RemoteError> {
        self.record(RemoteCall::SaveWishlist(user.clone(), ids.to_vec()));
        Self::pause(&self.save_delay).await;
        Self::check(&self.fail_saves)?;
        lock(&self.wishlists).insert(user.clone(), ids.to_vec());
        Ok(())
    }

    async fn fetch_wishlist(&self, user: &UserId) -> Result<Vec<ProductId>, RemoteError> {
        self.record(RemoteCall::FetchWishlist(user.clone()));
        Self::pause(&self.fetch_delay).await;
        Self::check(&self.fail_fetches)?;
        Ok(lock(&self.wishlists).get(user).cloned().unwrap_or_default())
    }
}

// =============================================================================
// FakeCatalog
// =============================================================================

/// Catalog source returning a fixed result.
#[derive(Debug, Clone)]
pub struct FakeCatalog {
    result: Result<Vec<ProductRecord>, u16>,
}

impl FakeCatalog {
    #[must_use]
    pub const fn ok(records: Vec<ProductRecord>) -> Self {
        Self {
            result: Ok(records),
        }
    }

    /// Fails every fetch with the given HTTP status.
    #[must_use]
    pub const fn failing(status: u16) -> Self {
        Self {
            result: Err(status),
        }
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>, RemoteError> {
        self.result.clone().map_err(|status| RemoteError::Api {
            status,
            message: "catalog unavailable".to_string(),
        })
    }
}

// =============================================================================
// TestContext
// =============================================================================

/// A started session wired to fakes.
pub struct TestContext {
    pub session: Session,
    pub store: Arc<dyn LocalStore>,
    pub remote: Arc<FakeRemote>,
    pub hub: EventHub,
}

impl TestContext {
    /// Start a session over the given collaborators with default config.
    #[must_use]
    pub fn start(
        store: Arc<dyn LocalStore>,
        remote: Arc<FakeRemote>,
        catalog: FakeCatalog,
    ) -> Self {
        let hub = EventHub::default();
        let session = Session::start(
            SessionDeps {
                store: Arc::clone(&store),
                remote: remote.clone(),
                catalog_source: Arc::new(catalog),
                channel: Arc::new(hub.clone()),
            },
            &SyncConfig::default(),
        );
        Self {
            session,
            store,
            remote,
            hub,
        }
    }

    /// Anonymous session over an empty in-memory store and [`sample_catalog`].
    #[must_use]
    pub fn anonymous() -> Self {
        Self::with_remote(FakeRemote::new())
    }

    /// Like [`TestContext::anonymous`] but sharing `remote`.
    #[must_use]
    pub fn with_remote(remote: Arc<FakeRemote>) -> Self {
        Self::start(
            Arc::new(MemoryStore::new("test")),
            remote,
            FakeCatalog::ok(sample_catalog()),
        )
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Two products: `P1` with sizes S:5, M:3 and `P2` with L:1.
#[must_use]
pub fn sample_catalog() -> Vec<ProductRecord> {
    let mut tee = ProductRecord::new("P1", "TEE-001", "Pineapple Tee");
    tee.sizes.insert("S".to_string(), 5);
    tee.sizes.insert("M".to_string(), 3);

    let mut hoodie = ProductRecord::new("P2", "HOOD-001", "Harbour Hoodie");
    hoodie.sizes.insert("L".to_string(), 1);

    vec![tee, hoodie]
}

/// An identity with a derived email address.
///
/// # Panics
///
/// Panics if `id` does not form a valid email local part.
#[must_use]
#[allow(clippy::expect_used)]
pub fn identity(id: &str) -> SessionIdentity {
    let email = Email::parse(&format!("{id}@example.com")).expect("fixture email is valid");
    SessionIdentity::new(UserId::new(id), id, email)
}

/// Non-gift line key.
#[must_use]
pub fn key(product: &str, size: &str) -> LineKey {
    LineKey::new(product, size, false)
}

/// Let spawned tasks run without advancing the clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
