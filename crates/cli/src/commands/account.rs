//! Identity commands: `login`, `logout`, `whoami`.

use serde_json::json;
use storefront_sync::{Session, SyncError};
use storefront_sync_core::{Email, SessionIdentity, UserId};

use super::Output;

/// Authenticate and report what the merge produced.
///
/// # Errors
///
/// Returns `SyncError::BadRequest` if `email` is not a valid address.
pub async fn login(
    session: &Session,
    id: String,
    name: String,
    email: &str,
    output: &Output,
) -> storefront_sync::Result<()> {
    let email = Email::parse(email)
        .map_err(|e| SyncError::BadRequest(format!("invalid --email: {e}")))?;
    session.login(SessionIdentity::new(UserId::new(id), name, email)).await;

    let cart = session.cart();
    let wishlist = session.wishlist();
    output.emit(
        &json!({
            "identity": session.identity(),
            "cartLines": cart.len(),
            "wishlist": wishlist.len(),
        }),
        || {
            if let Some(identity) = session.identity() {
                println!("Logged in as {} <{}>", identity.id, identity.email);
            }
            println!(
                "Cart: {} line(s), wishlist: {} item(s)",
                cart.len(),
                wishlist.len()
            );
        },
    );
    Ok(())
}

/// Forget the identity and clear local state.
pub fn logout(session: &Session, output: &Output) {
    let was = session.identity();
    session.logout();
    output.emit(&json!({ "loggedOut": was.as_ref().map(|i| &i.id) }), || {
        match was {
            Some(identity) => println!("Logged out {}", identity.id),
            None => println!("Not logged in; local cart and wishlist cleared"),
        }
    });
}

/// Print the current identity.
pub fn whoami(session: &Session, output: &Output) {
    let identity = session.identity();
    output.emit(&identity, || match &identity {
        Some(identity) if identity.name.is_empty() => {
            println!("{} <{}>", identity.id, identity.email);
        }
        Some(identity) => println!("{} ({}) <{}>", identity.name, identity.id, identity.email),
        None => println!("Anonymous"),
    });
}
