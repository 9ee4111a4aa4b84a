//! Integration tests for debounced remote pushes.
//!
//! All tests run on a paused clock; the debounce delay is the default 2s.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use storefront_sync_core::{CartLine, ProductId, UserId};
use storefront_sync_integration_tests::{FakeRemote, TestContext, identity, key, settle};

async fn advance(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

// =============================================================================
// Coalescing
// =============================================================================

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_three_adds_within_500ms_push_once_with_final_state() {
    let ctx = TestContext::anonymous();
    ctx.session.login(identity("alice")).await;

    ctx.session.add_to_cart(&key("P1", "M"), 1);
    advance(250).await;
    ctx.session.add_to_cart(&key("P1", "M"), 1);
    advance(250).await;
    let final_cart = ctx.session.add_to_cart(&key("P2", "L"), 1);

    advance(5_000).await;

    let saves = ctx.remote.cart_saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].0, UserId::new("alice"));
    assert_eq!(saves[0].1, final_cart.lines().to_vec());
    assert_eq!(
        saves[0].1,
        vec![CartLine::new("P1", "M", 2), CartLine::new("P2", "L", 1)]
    );
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_cart_and_wishlist_push_independently() {
    let ctx = TestContext::anonymous();
    ctx.session.login(identity("alice")).await;

    ctx.session.add_to_cart(&key("P1", "S"), 1);
    advance(1_500).await;
    ctx.session.toggle_wishlist(&ProductId::new("P2"));

    advance(600).await;
    assert_eq!(ctx.remote.cart_saves().len(), 1);
    assert!(ctx.remote.wishlist_saves().is_empty());

    advance(1_500).await;
    assert_eq!(
        ctx.remote.wishlist_saves(),
        vec![(UserId::new("alice"), vec![ProductId::new("P2")])]
    );
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_mutation_during_inflight_push_goes_in_next_window() {
    let ctx = TestContext::anonymous();
    ctx.remote.set_save_delay(Duration::from_secs(1));
    ctx.session.login(identity("alice")).await;

    ctx.session.add_to_cart(&key("P1", "S"), 1);
    advance(2_100).await;
    assert_eq!(ctx.remote.cart_saves().len(), 1);

    // First push is still waiting on the network.
    ctx.session.add_to_cart(&key("P1", "M"), 1);
    advance(3_000).await;
    advance(2_000).await;

    let saves = ctx.remote.cart_saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[0].1, vec![CartLine::new("P1", "S", 1)]);
    assert_eq!(
        saves[1].1,
        vec![CartLine::new("P1", "S", 1), CartLine::new("P1", "M", 1)]
    );
    assert_eq!(ctx.remote.stored_cart(&UserId::new("alice")), saves[1].1);
}

// =============================================================================
// Cancellation and failure
// =============================================================================

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_anonymous_session_never_pushes() {
    let ctx = TestContext::anonymous();
    ctx.session.add_to_cart(&key("P1", "S"), 1);
    ctx.session.toggle_wishlist(&ProductId::new("P1"));

    advance(10_000).await;
    assert!(ctx.remote.calls().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_logout_before_fire_cancels_push() {
    let ctx = TestContext::anonymous();
    ctx.session.login(identity("alice")).await;
    ctx.session.add_to_cart(&key("P1", "S"), 4);

    advance(1_000).await;
    ctx.session.logout();
    advance(5_000).await;

    assert!(ctx.remote.cart_saves().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_switching_identity_redirects_pending_push() {
    let ctx = TestContext::anonymous();
    ctx.session.login(identity("alice")).await;
    ctx.session.add_to_cart(&key("P1", "S"), 1);

    ctx.session.login(identity("bob")).await;
    advance(5_000).await;

    let saves = ctx.remote.cart_saves();
    assert_eq!(saves, vec![(UserId::new("bob"), vec![CartLine::new("P1", "S", 1)])]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_failed_push_is_not_retried() {
    let ctx = TestContext::anonymous();
    ctx.remote.fail_saves(true);
    ctx.session.login(identity("alice")).await;

    ctx.session.add_to_cart(&key("P1", "S"), 1);
    advance(3_000).await;
    advance(60_000).await;

    assert_eq!(ctx.remote.cart_saves().len(), 1);
    assert!(ctx.remote.stored_cart(&UserId::new("alice")).is_empty());
    assert_eq!(ctx.session.cart().total_quantity(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_flush_pushes_without_waiting() {
    let ctx = TestContext::anonymous();
    ctx.session.login(identity("alice")).await;
    ctx.session.add_to_cart(&key("P2", "L"), 1);

    ctx.session.flush().await;

    assert_eq!(ctx.remote.cart_saves().len(), 1);
    assert_eq!(ctx.session.pending_pushes(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_sessions_sharing_a_remote_stay_isolated() {
    let remote = FakeRemote::new();
    let first = TestContext::with_remote(remote.clone());
    let second = TestContext::with_remote(remote.clone());

    first.session.login(identity("alice")).await;
    first.session.add_to_cart(&key("P1", "S"), 1);
    second.session.add_to_cart(&key("P2", "L"), 3);

    assert_eq!(second.session.cart().lines(), &[CartLine::new("P2", "L", 3)]);
    assert!(!second.session.is_authenticated());

    advance(3_000).await;
    assert_eq!(
        remote.cart_saves(),
        vec![(UserId::new("alice"), vec![CartLine::new("P1", "S", 1)])]
    );
}
