//! Cart/wishlist model.
//!
//! Pure values: every mutation borrows the current model and returns a new
//! one, so a half-applied change is never observable. Nothing here performs
//! I/O; write-through and push scheduling live in the session.

mod cart;
mod wishlist;

pub use cart::Cart;
pub use wishlist::Wishlist;
