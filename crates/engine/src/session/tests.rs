use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use storefront_sync_core::{
    CartLine, Email, ProductId, ProductRecord, PushEvent, SessionIdentity, UserId,
};

use super::*;
use crate::channel::EventHub;
use crate::remote::RemoteError;
use crate::store::MemoryStore;

#[derive(Default)]
struct Remote {
    cart: Mutex<Vec<CartLine>>,
    wishlist: Mutex<Vec<ProductId>>,
    cart_pushes: Mutex<Vec<Vec<CartLine>>>,
    wishlist_pushes: Mutex<Vec<Vec<ProductId>>>,
    fail: AtomicBool,
}

impl Remote {
    fn failure(&self) -> Result<(), RemoteError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(RemoteError::Api {
                status: 503,
                message: "down".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for Remote {
    async fn save_cart(&self, _user: &UserId, lines: &[CartLine]) -> Result<(), RemoteError> {
        self.cart_pushes.lock().unwrap().push(lines.to_vec());
        self.failure()
    }

    async fn fetch_cart(&self, _user: &UserId) -> Result<Vec<CartLine>, RemoteError> {
        self.failure()?;
        Ok(self.cart.lock().unwrap().clone())
    }

    async fn save_wishlist(&self, _user: &UserId, ids: &[ProductId]) -> Result<(), RemoteError> {
        self.wishlist_pushes.lock().unwrap().push(ids.to_vec());
        self.failure()
    }

    async fn fetch_wishlist(&self, _user: &UserId) -> Result<Vec<ProductId>, RemoteError> {
        self.failure()?;
        Ok(self.wishlist.lock().unwrap().clone())
    }
}

struct Catalog(Vec<ProductRecord>);

#[async_trait]
impl CatalogSource for Catalog {
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>, RemoteError> {
        Ok(self.0.clone())
    }
}

struct Harness {
    session: Session,
    store: Arc<MemoryStore>,
    remote: Arc<Remote>,
    hub: EventHub,
}

fn harness_with(store: Arc<MemoryStore>, remote: Arc<Remote>) -> Harness {
    let hub = EventHub::default();
    let mut product = ProductRecord::new("P1", "SKU-1", "Tee");
    product.sizes.insert("S".to_string(), 5);
    product.sizes.insert("M".to_string(), 3);

    let deps = SessionDeps {
        store: store.clone(),
        remote: remote.clone(),
        catalog_source: Arc::new(Catalog(vec![product])),
        channel: Arc::new(hub.clone()),
    };
    let session = Session::start(deps, &SyncConfig::default());
    Harness {
        session,
        store,
        remote,
        hub,
    }
}

fn harness() -> Harness {
    harness_with(
        Arc::new(MemoryStore::new("test")),
        Arc::new(Remote::default()),
    )
}

fn alice() -> SessionIdentity {
    SessionIdentity::new(
        UserId::new("u-alice"),
        "Alice",
        Email::parse("alice@example.com").unwrap(),
    )
}

fn tee(size: &str) -> LineKey {
    LineKey::new("P1", size, false)
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_burst_of_adds_pushes_final_state_once() {
    let h = harness();
    h.session.login(alice()).await;

    h.session.add_to_cart(&tee("M"), 1);
    tokio::time::advance(Duration::from_millis(200)).await;
    h.session.add_to_cart(&tee("M"), 1);
    tokio::time::advance(Duration::from_millis(200)).await;
    let last = h.session.add_to_cart(&tee("S"), 2);

    tokio::time::advance(Duration::from_millis(1900)).await;
    settle().await;
    assert!(h.remote.cart_pushes.lock().unwrap().is_empty());

    tokio::time::advance(Duration::from_millis(200)).await;
    settle().await;
    let pushes = h.remote.cart_pushes.lock().unwrap();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0], last.lines().to_vec());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_anonymous_mutations_write_through_without_push() {
    let h = harness();
    h.session.add_to_cart(&tee("M"), 1);
    h.session.toggle_wishlist(&ProductId::new("P1"));

    assert_eq!(h.session.pending_pushes(), 0);
    assert!(h.store.load("cart").unwrap().is_some());
    assert_eq!(h.store.load("wishlist").unwrap().as_deref(), Some(r#"["P1"]"#));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_logout_cancels_pending_push_and_clears() {
    let h = harness();
    h.session.login(alice()).await;
    h.session.add_to_cart(&tee("M"), 3);
    assert_eq!(h.session.pending_pushes(), 1);

    h.session.logout();

    tokio::time::advance(Duration::from_secs(5)).await;
    settle().await;
    assert!(h.remote.cart_pushes.lock().unwrap().is_empty());
    assert!(h.session.cart().is_empty());
    assert!(h.session.wishlist().is_empty());
    assert!(h.store.load("user").unwrap().is_none());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_login_adopts_remote_into_empty_local() {
    let remote = Arc::new(Remote::default());
    *remote.cart.lock().unwrap() = vec![CartLine::new("P1", "S", 1), CartLine::new("P2", "M", 2)];
    *remote.wishlist.lock().unwrap() = vec![ProductId::new("P9")];
    let h = harness_with(Arc::new(MemoryStore::new("test")), remote);

    h.session.login(alice()).await;

    assert_eq!(h.session.cart().len(), 2);
    assert!(h.session.wishlist().contains(&ProductId::new("P9")));
    assert_eq!(h.session.pending_pushes(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_login_keeps_nonempty_local_and_pushes_it() {
    let remote = Arc::new(Remote::default());
    *remote.cart.lock().unwrap() = vec![CartLine::new("P1", "S", 1), CartLine::new("P2", "M", 2)];
    let h = harness_with(Arc::new(MemoryStore::new("test")), remote);

    h.session.add_to_cart(&tee("L"), 1);
    h.session.login(alice()).await;

    assert_eq!(h.session.cart().lines(), &[CartLine::new("P1", "L", 1)]);

    tokio::time::advance(Duration::from_secs(3)).await;
    settle().await;
    assert_eq!(
        *h.remote.cart_pushes.lock().unwrap(),
        vec![vec![CartLine::new("P1", "L", 1)]]
    );
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_failed_pull_leaves_local_untouched() {
    let remote = Arc::new(Remote::default());
    remote.fail.store(true, Ordering::SeqCst);
    let h = harness_with(Arc::new(MemoryStore::new("test")), remote);

    h.session.add_to_cart(&tee("M"), 2);
    h.session.login(alice()).await;

    assert_eq!(h.session.cart().lines(), &[CartLine::new("P1", "M", 2)]);
    assert!(h.session.is_authenticated());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_restored_identity_pulls_on_start() {
    let store = Arc::new(MemoryStore::new("test"));
    save_json(store.as_ref(), StoreKey::User, &alice()).unwrap();
    let remote = Arc::new(Remote::default());
    *remote.wishlist.lock().unwrap() = vec![ProductId::new("P3")];

    let h = harness_with(store, remote);
    h.session.wait_synced().await;

    assert_eq!(h.session.identity().unwrap().id, UserId::new("u-alice"));
    assert_eq!(h.session.wishlist().ids(), &[ProductId::new("P3")]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_catalog_follows_push_events() {
    let h = harness();
    h.session.wait_catalog_loaded().await;
    assert_eq!(h.session.product("P1").unwrap().stock("S"), Some(5));

    h.hub.publish(PushEvent::StockUpdated {
        product_id: ProductId::new("P1"),
        size: "S".to_string(),
        new_stock: 2,
    });
    settle().await;

    let product = h.session.product("P1").unwrap();
    assert_eq!(product.stock("S"), Some(2));
    assert_eq!(product.stock("M"), Some(3));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_stop_releases_subscription() {
    let h = harness();
    assert_eq!(h.hub.subscriber_count(), 1);

    h.session.stop();
    settle().await;
    assert_eq!(h.hub.subscriber_count(), 0);

    h.session.login(alice()).await;
    h.session.add_to_cart(&tee("M"), 1);
    assert_eq!(h.session.pending_pushes(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_update_profile_requires_same_user() {
    let h = harness();
    let mut renamed = alice();
    renamed.name = "Alice B.".to_string();
    assert!(!h.session.update_profile(renamed.clone()));

    h.session.login(alice()).await;
    assert!(h.session.update_profile(renamed));
    assert_eq!(h.session.identity().unwrap().name, "Alice B.");

    let stored: SessionIdentity = load_json(h.store.as_ref(), StoreKey::User).unwrap();
    assert_eq!(stored.name, "Alice B.");
}
