//! Anonymous/Authenticated state machine and merge-on-login.
//!
//! | From          | Trigger                  | Effect                                  |
//! |---------------|--------------------------|-----------------------------------------|
//! | Anonymous     | `login`                  | persist identity, pull cart + wishlist  |
//! | Authenticated | `login` (other user id)  | cancel pushes, persist, pull            |
//! | Authenticated | `login` / `update_profile` (same id) | re-persist only             |
//! | any           | `logout`                 | forget identity, clear cart + wishlist  |

use std::sync::{Arc, Weak};

use storefront_sync_core::{CartLine, ProductId, SessionIdentity, UserId};
use tracing::{debug, info, instrument, warn};

use super::{Session, SessionInner};
use crate::error::{add_breadcrumb, clear_sentry_user, report, set_sentry_user};
use crate::model::{Cart, Wishlist};
use crate::remote::{RemoteError, RemoteStore};
use crate::store::StoreKey;
use crate::sync::{Reconciled, SyncTarget, reconcile};

impl Session {
    /// Authenticate the session and reconcile with the remote copies.
    ///
    /// Persists `identity`, then fetches the remote cart and wishlist
    /// concurrently. Each remote collection replaces the local one only if the
    /// local one is empty. Returns once both pulls have settled; failures are
    /// logged and leave local state untouched.
    ///
    /// Logging in again with the same user id only refreshes the stored
    /// profile.
    #[instrument(skip_all, fields(user = %identity.id))]
    pub async fn login(&self, identity: SessionIdentity) {
        let epoch = {
            let mut state = self.inner.state();
            let same_user = state
                .identity
                .as_ref()
                .is_some_and(|current| current.id == identity.id);

            self.inner.persist(StoreKey::User, &identity);
            state.identity = Some(identity.clone());
            if same_user {
                debug!("Already authenticated as this user, profile refreshed");
                return;
            }

            // Pushes armed for a previous identity must not fire under this one.
            self.inner.debouncer.cancel_all();
            state.epoch += 1;
            state.epoch
        };

        set_sentry_user(&identity.id, Some(identity.email.as_str()));
        add_breadcrumb("auth", "Logged in", &[("user_id", identity.id.as_str())]);
        info!("Session authenticated");

        pull(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.remote),
            identity.id,
            epoch,
        )
        .await;
    }

    /// Return to anonymous.
    ///
    /// Forgets the identity, cancels pending pushes, and clears the cart and
    /// wishlist both in memory and in the local store. Remote copies are left
    /// as they were.
    pub fn logout(&self) {
        let epoch = {
            let mut state = self.inner.state();
            self.inner.debouncer.cancel_all();

            state.identity = None;
            state.cart = Cart::new();
            state.wishlist = Wishlist::new();
            state.epoch += 1;

            self.inner.forget(StoreKey::User);
            self.inner.persist(StoreKey::Cart, &state.cart);
            self.inner.persist(StoreKey::Wishlist, &state.wishlist);
            state.epoch
        };

        self.inner.settle(epoch);
        clear_sentry_user();
        add_breadcrumb("auth", "Logged out", &[]);
        info!("Session logged out");
    }

    /// Replace the profile of the current identity without re-syncing.
    ///
    /// Returns `false` (and changes nothing) unless the session is
    /// authenticated as `identity.id`.
    pub fn update_profile(&self, identity: SessionIdentity) -> bool {
        let mut state = self.inner.state();
        let Some(current) = &state.identity else {
            warn!(user = %identity.id, "Profile update while anonymous, ignoring");
            return false;
        };
        if current.id != identity.id {
            warn!(
                current = %current.id,
                user = %identity.id,
                "Profile update for a different user, ignoring"
            );
            return false;
        }

        self.inner.persist(StoreKey::User, &identity);
        set_sentry_user(&identity.id, Some(identity.email.as_str()));
        state.identity = Some(identity);
        true
    }

    /// Pull in the background for an identity restored at startup.
    pub(super) fn spawn_pull(&self, identity: SessionIdentity, epoch: u64) {
        let task = tokio::spawn(pull(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.remote),
            identity.id,
            epoch,
        ));
        self.inner.track(task);
    }

    /// Reconcile pulled collections with local state. Returns the targets
    /// whose local copy was kept and still needs to reach the remote.
    fn apply_pull(
        &self,
        epoch: u64,
        cart: Result<Vec<CartLine>, RemoteError>,
        wishlist: Result<Vec<ProductId>, RemoteError>,
    ) -> Vec<SyncTarget> {
        let mut state = self.inner.state();
        if state.epoch != epoch {
            debug!(epoch, current = state.epoch, "Identity changed during pull, discarding");
            return Vec::new();
        }

        let mut push = Vec::new();

        match cart {
            Err(e) => report("cart pull", &e),
            Ok(remote) => match reconcile(state.cart.is_empty(), remote.is_empty()) {
                Reconciled::TakeRemote => {
                    state.cart = Cart::from_lines(remote);
                    self.inner.persist(StoreKey::Cart, &state.cart);
                    info!(lines = state.cart.len(), "Adopted remote cart");
                }
                Reconciled::KeepLocal => {
                    debug!(discarded = remote.len(), "Kept local cart");
                    if !state.cart.is_empty() {
                        push.push(SyncTarget::Cart);
                    }
                }
            },
        }

        match wishlist {
            Err(e) => report("wishlist pull", &e),
            Ok(remote) => match reconcile(state.wishlist.is_empty(), remote.is_empty()) {
                Reconciled::TakeRemote => {
                    state.wishlist = Wishlist::from(remote);
                    self.inner.persist(StoreKey::Wishlist, &state.wishlist);
                    info!(ids = state.wishlist.len(), "Adopted remote wishlist");
                }
                Reconciled::KeepLocal => {
                    debug!(discarded = remote.len(), "Kept local wishlist");
                    if !state.wishlist.is_empty() {
                        push.push(SyncTarget::Wishlist);
                    }
                }
            },
        }

        if state.stopped {
            push.clear();
        }
        push
    }
}

impl SessionInner {
    /// Mark the pull for `epoch` as settled.
    pub(super) fn settle(&self, epoch: u64) {
        self.pull_settled.send_modify(|settled| *settled = (*settled).max(epoch));
    }
}

/// Fetch both collections for `user` and reconcile them into the session.
async fn pull(
    session: Weak<SessionInner>,
    remote: Arc<dyn RemoteStore>,
    user: UserId,
    epoch: u64,
) {
    let (cart, wishlist) = tokio::join!(remote.fetch_cart(&user), remote.fetch_wishlist(&user));

    let Some(inner) = session.upgrade() else {
        return;
    };
    let session = Session { inner };

    for target in session.apply_pull(epoch, cart, wishlist) {
        session.schedule_push(target);
    }
    session.inner.settle(epoch);
}
