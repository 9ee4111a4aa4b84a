//! Core types for storefront sync.
//!
//! This module provides type-safe wrappers for the domain concepts the sync
//! engine moves between memory, local storage, and the remote store.

pub mod cart;
pub mod email;
pub mod event;
pub mod id;
pub mod identity;
pub mod price;
pub mod product;

pub use cart::{CartLine, LineKey};
pub use email::{Email, EmailError};
pub use event::PushEvent;
pub use id::*;
pub use identity::{IdentityError, SessionIdentity};
pub use price::{CurrencyCode, Price};
pub use product::{Color, ExchangePolicy, ExchangePolicyKind, ProductRecord, ProductRecordError};
