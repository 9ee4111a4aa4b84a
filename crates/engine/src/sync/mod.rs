//! Remote sync policy.
//!
//! Local state is authoritative while a session runs. Changes are pushed to
//! the remote store after a quiet period ([`Debouncer`]), and the remote copy
//! is pulled once per authentication and reconciled with [`reconcile`].

mod debounce;

pub use debounce::Debouncer;

/// A collection kept in sync with the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTarget {
    /// The cart lines.
    Cart,
    /// The wishlist ids.
    Wishlist,
}

impl SyncTarget {
    /// Lowercase name, used in logs and breadcrumbs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
        }
    }
}

impl std::fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of reconciling a pulled collection with local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Replace local with the remote copy.
    TakeRemote,
    /// Keep local as-is.
    KeepLocal,
}

/// Local wins unless it is empty and the remote copy is not.
///
/// There is no element-level merge: a non-empty local collection is never
/// combined with the remote one.
#[must_use]
pub const fn reconcile(local_is_empty: bool, remote_is_empty: bool) -> Reconciled {
    if local_is_empty && !remote_is_empty {
        Reconciled::TakeRemote
    } else {
        Reconciled::KeepLocal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_table() {
        assert_eq!(reconcile(true, false), Reconciled::TakeRemote);
        assert_eq!(reconcile(true, true), Reconciled::KeepLocal);
        assert_eq!(reconcile(false, false), Reconciled::KeepLocal);
        assert_eq!(reconcile(false, true), Reconciled::KeepLocal);
    }

    #[test]
    fn test_target_names() {
        assert_eq!(SyncTarget::Cart.to_string(), "cart");
        assert_eq!(SyncTarget::Wishlist.as_str(), "wishlist");
    }
}
