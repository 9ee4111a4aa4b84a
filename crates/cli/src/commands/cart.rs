//! `cart` subcommands.

use storefront_sync::Session;
use storefront_sync::model::Cart;
use storefront_sync_core::{CurrencyCode, LineKey, Price};

use super::Output;
use crate::CartAction;

/// Run a cart subcommand and print the resulting cart.
pub fn run(session: &Session, action: CartAction, output: &Output) {
    let cart = match action {
        CartAction::Show => session.cart(),
        CartAction::Add {
            product,
            size,
            quantity,
            gift,
        } => {
            if quantity < 1 {
                tracing::warn!(quantity, "Quantity must be at least 1, cart unchanged");
            }
            session.add_to_cart(&LineKey::new(product, size, gift), quantity)
        }
        CartAction::SetQty {
            product,
            size,
            quantity,
            gift,
        } => session.update_quantity(&LineKey::new(product, size, gift), quantity),
        CartAction::SetSize {
            product,
            from,
            to,
            gift,
        } => session.update_size(&LineKey::new(product, from, gift), &to),
        CartAction::Remove {
            product,
            size,
            gift,
        } => session.remove_from_cart(&LineKey::new(product, size, gift)),
        CartAction::Clear => session.clear_cart(),
    };

    output.emit(&cart, || print_cart(session, &cart));
}

fn print_cart(session: &Session, cart: &Cart) {
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }

    for line in cart.lines() {
        let gift = if line.is_gift { " (gift)" } else { "" };
        match session.product(line.product_id.as_str()) {
            Some(product) => {
                let unit = Price::new(product.offer_price, CurrencyCode::default());
                println!(
                    "{:>3} x {} [{}]{gift}  {unit} each",
                    line.quantity, product.name, line.size
                );
            }
            None => println!(
                "{:>3} x {} [{}]{gift}",
                line.quantity, line.product_id, line.size
            ),
        }
    }
    println!("{} line(s), {} unit(s)", cart.len(), cart.total_quantity());
}
