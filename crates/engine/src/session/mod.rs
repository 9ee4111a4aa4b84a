//! Session context.
//!
//! A [`Session`] owns everything one storefront session needs: the cart and
//! wishlist models, the identity, the catalog cache, the push subscription,
//! and the debounced remote pushes. Nothing is global, so independent sessions
//! can run side by side (and do, in tests).
//!
//! # Lifecycle
//!
//! - [`Session::start`] restores persisted state, spawns the catalog bulk
//!   load and the push-event applier, and pulls remote state if a persisted
//!   identity was restored.
//! - Mutations swap the model, write through to the local store, and arm a
//!   debounced push when an identity is present.
//! - [`Session::login`], [`Session::logout`], and [`Session::update_profile`]
//!   drive the Anonymous/Authenticated state machine (see `lifecycle`).
//! - [`Session::stop`] (or dropping the last handle) tears everything down.
//!
//! Collaborator failures never reach the caller. They are logged and reported
//! to Sentry, and the session carries on with local state.

mod lifecycle;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use serde::Serialize;
use storefront_sync_core::{CartLine, LineKey, ProductId, ProductRecord, SessionIdentity};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::catalog::{CatalogCache, CatalogSource, load_catalog};
use crate::channel::{PushChannel, Subscription};
use crate::config::SyncConfig;
use crate::error::{add_breadcrumb, report, set_sentry_user};
use crate::model::{Cart, Wishlist};
use crate::remote::RemoteStore;
use crate::store::{LocalStore, StoreKey, load_json, save_json};
use crate::sync::{Debouncer, SyncTarget};

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionDeps {
    /// Durable local persistence.
    pub store: Arc<dyn LocalStore>,
    /// Per-user remote cart/wishlist copies.
    pub remote: Arc<dyn RemoteStore>,
    /// Catalog bulk fetch.
    pub catalog_source: Arc<dyn CatalogSource>,
    /// Catalog change notifications.
    pub channel: Arc<dyn PushChannel>,
}

/// A running storefront session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    catalog: Arc<RwLock<CatalogCache>>,
    catalog_loaded: Arc<watch::Sender<bool>>,
    /// Highest identity epoch whose pull has settled.
    pull_settled: watch::Sender<u64>,
    state: Mutex<SessionState>,
    debouncer: Debouncer<SyncTarget>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct SessionState {
    identity: Option<SessionIdentity>,
    cart: Cart,
    wishlist: Wishlist,
    /// Bumped on every identity change. A pull only applies if the epoch it
    /// started under is still current.
    epoch: u64,
    stopped: bool,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner).drain(..) {
            task.abort();
        }
    }
}

impl SessionInner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    /// Write-through. Failures are reported and otherwise ignored.
    fn persist<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) {
        if let Err(e) = save_json(self.store.as_ref(), key, value) {
            report("local store write", &e);
        }
    }

    fn forget(&self, key: StoreKey) {
        if let Err(e) = self.store.remove(key.as_str()) {
            report("local store remove", &e);
        }
    }
}

// =============================================================================
// Start / stop
// =============================================================================

impl Session {
    /// Start a session.
    ///
    /// Restores identity, cart, and wishlist from the local store (malformed
    /// values count as absent), spawns the catalog bulk load, subscribes to the
    /// push channel, and pulls remote state when an identity was restored.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    #[instrument(skip_all)]
    pub fn start(deps: SessionDeps, config: &SyncConfig) -> Self {
        let SessionDeps {
            store,
            remote,
            catalog_source,
            channel,
        } = deps;

        let identity: Option<SessionIdentity> = load_json(store.as_ref(), StoreKey::User);
        let cart: Cart = load_json(store.as_ref(), StoreKey::Cart).unwrap_or_default();
        let wishlist: Wishlist = load_json(store.as_ref(), StoreKey::Wishlist).unwrap_or_default();
        info!(
            authenticated = identity.is_some(),
            cart_lines = cart.len(),
            wishlist = wishlist.len(),
            "Restored session state"
        );

        let restored = identity.clone();
        let epoch = u64::from(restored.is_some());

        let session = Self {
            inner: Arc::new(SessionInner {
                store,
                remote,
                catalog: Arc::new(RwLock::new(CatalogCache::new())),
                catalog_loaded: Arc::new(watch::Sender::new(false)),
                pull_settled: watch::Sender::new(0),
                state: Mutex::new(SessionState {
                    identity,
                    cart,
                    wishlist,
                    epoch,
                    stopped: false,
                }),
                debouncer: Debouncer::new(config.debounce),
                tasks: Mutex::new(Vec::new()),
            }),
        };

        session.spawn_catalog_load(catalog_source);
        session.spawn_event_applier(channel.subscribe());

        if let Some(identity) = restored {
            set_sentry_user(&identity.id, Some(identity.email.as_str()));
            session.spawn_pull(identity, epoch);
        }

        session
    }

    fn spawn_catalog_load(&self, source: Arc<dyn CatalogSource>) {
        let catalog = Arc::clone(&self.inner.catalog);
        let loaded = Arc::clone(&self.inner.catalog_loaded);
        let task = tokio::spawn(async move {
            load_catalog(source.as_ref(), &catalog).await;
            loaded.send_replace(true);
        });
        self.inner.track(task);
    }

    fn spawn_event_applier(&self, mut subscription: Subscription) {
        let catalog = Arc::clone(&self.inner.catalog);
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                catalog
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .apply_event(&event);
            }
            debug!("Push channel closed, event applier exiting");
        });
        self.inner.track(task);
    }

    /// Tear the session down.
    ///
    /// Stops the catalog load and the event applier (releasing the push
    /// subscription) and cancels pending pushes. Local state stays readable
    /// and mutations still write through, but nothing is pushed afterwards.
    pub fn stop(&self) {
        self.inner.state().stopped = true;
        self.inner.debouncer.cancel_all();
        for task in self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
        self.inner.catalog_loaded.send_replace(true);
        info!("Session stopped");
    }

    /// Run any pending pushes now and wait for them.
    pub async fn flush(&self) {
        self.inner.debouncer.flush().await;
    }

    /// Wait until the catalog bulk load has completed (successfully or with
    /// the placeholder set), or the session was stopped.
    pub async fn wait_catalog_loaded(&self) {
        let mut loaded = self.inner.catalog_loaded.subscribe();
        let _ = loaded.wait_for(|done| *done).await;
    }

    /// Wait until the pull for the current identity (if any) has settled.
    pub async fn wait_synced(&self) {
        let epoch = self.inner.state().epoch;
        let mut settled = self.inner.pull_settled.subscribe();
        let _ = settled.wait_for(|done| *done >= epoch).await;
    }
}

// =============================================================================
// Accessors
// =============================================================================

impl Session {
    /// Current cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.inner.state().cart.clone()
    }

    /// Current wishlist.
    #[must_use]
    pub fn wishlist(&self) -> Wishlist {
        self.inner.state().wishlist.clone()
    }

    /// Current identity, if authenticated.
    #[must_use]
    pub fn identity(&self) -> Option<SessionIdentity> {
        self.inner.state().identity.clone()
    }

    /// Whether an identity is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state().identity.is_some()
    }

    /// Snapshot of the catalog cache.
    #[must_use]
    pub fn catalog(&self) -> CatalogCache {
        self.inner
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Look up one product by either id scheme.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<ProductRecord> {
        self.inner
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Number of pushes currently waiting out the debounce delay.
    #[must_use]
    pub fn pending_pushes(&self) -> usize {
        self.inner.debouncer.armed_count()
    }
}

// =============================================================================
// Mutations
// =============================================================================

impl Session {
    /// Add `quantity` units of `key`. Non-positive quantities are ignored.
    pub fn add_to_cart(&self, key: &LineKey, quantity: i64) -> Cart {
        add_breadcrumb(
            "cart",
            "Added to cart",
            &[("product_id", key.product_id.as_str()), ("size", key.size.as_str())],
        );
        self.mutate_cart(|cart| cart.add(key, quantity))
    }

    /// Set the quantity of `key`'s line to an absolute value (not validated).
    pub fn update_quantity(&self, key: &LineKey, quantity: i64) -> Cart {
        self.mutate_cart(|cart| cart.set_quantity(key, quantity))
    }

    /// Move `key`'s line to `new_size`, merging into an existing line there.
    pub fn update_size(&self, key: &LineKey, new_size: &str) -> Cart {
        self.mutate_cart(|cart| cart.set_size(key, new_size))
    }

    /// Remove `key`'s line. No-op if absent.
    pub fn remove_from_cart(&self, key: &LineKey) -> Cart {
        add_breadcrumb(
            "cart",
            "Removed from cart",
            &[("product_id", key.product_id.as_str()), ("size", key.size.as_str())],
        );
        self.mutate_cart(|cart| cart.remove(key))
    }

    /// Empty the cart.
    pub fn clear_cart(&self) -> Cart {
        self.mutate_cart(|_| Cart::new())
    }

    /// Add `id` to the wishlist, or remove it if already present.
    pub fn toggle_wishlist(&self, id: &ProductId) -> Wishlist {
        add_breadcrumb("wishlist", "Toggled wishlist", &[("product_id", id.as_str())]);

        let (wishlist, armed) = {
            let mut state = self.inner.state();
            state.wishlist = state.wishlist.toggle(id);
            self.inner.persist(StoreKey::Wishlist, &state.wishlist);
            (state.wishlist.clone(), state.identity.is_some() && !state.stopped)
        };
        if armed {
            self.schedule_push(SyncTarget::Wishlist);
        }
        wishlist
    }

    fn mutate_cart(&self, f: impl FnOnce(&Cart) -> Cart) -> Cart {
        let (cart, armed) = {
            let mut state = self.inner.state();
            state.cart = f(&state.cart);
            self.inner.persist(StoreKey::Cart, &state.cart);
            (state.cart.clone(), state.identity.is_some() && !state.stopped)
        };
        debug!(lines = cart.len(), units = cart.total_quantity(), "Cart updated");
        if armed {
            self.schedule_push(SyncTarget::Cart);
        }
        cart
    }

    /// Arm the debounced push for `target`. The push reads the model when it
    /// fires, not now.
    fn schedule_push(&self, target: SyncTarget) {
        let session = Arc::downgrade(&self.inner);
        self.inner.debouncer.arm(target, push(session, target));
    }
}

enum Payload {
    Cart(Vec<CartLine>),
    Wishlist(Vec<ProductId>),
}

/// Send the latest `target` collection for the current identity.
async fn push(session: Weak<SessionInner>, target: SyncTarget) {
    let Some(inner) = session.upgrade() else {
        return;
    };

    let (user, payload) = {
        let state = inner.state();
        let Some(identity) = &state.identity else {
            debug!(%target, "Identity gone before push fired, skipping");
            return;
        };
        let payload = match target {
            SyncTarget::Cart => Payload::Cart(state.cart.lines().to_vec()),
            SyncTarget::Wishlist => Payload::Wishlist(state.wishlist.ids().to_vec()),
        };
        (identity.id.clone(), payload)
    };

    let result = match &payload {
        Payload::Cart(lines) => inner.remote.save_cart(&user, lines).await,
        Payload::Wishlist(ids) => inner.remote.save_wishlist(&user, ids).await,
    };

    match result {
        Ok(()) => info!(%target, user = %user, "Pushed to remote"),
        Err(e) => report(&format!("{target} push"), &e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
