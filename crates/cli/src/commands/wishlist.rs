//! `wishlist` subcommands.

use storefront_sync::Session;
use storefront_sync_core::ProductId;

use super::Output;
use crate::WishlistAction;

/// Run a wishlist subcommand and print the resulting wishlist.
pub fn run(session: &Session, action: WishlistAction, output: &Output) {
    let wishlist = match action {
        WishlistAction::Show => session.wishlist(),
        WishlistAction::Toggle { product } => session.toggle_wishlist(&ProductId::new(product)),
    };

    output.emit(&wishlist, || {
        if wishlist.is_empty() {
            println!("Wishlist is empty");
        }
        for id in wishlist.ids() {
            match session.product(id.as_str()) {
                Some(product) => println!("{id}  {}", product.name),
                None => println!("{id}"),
            }
        }
    });
}
