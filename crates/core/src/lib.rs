//! Storefront Sync Core - Shared types library.
//!
//! This crate provides the types shared by every storefront-sync component:
//! - `storefront-sync` - The cart/wishlist synchronization engine
//! - `storefront-sync-cli` - Diagnostic CLI driving a live session
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no timers, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product and user ids, cart lines, product records, session
//!   identity, push events

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
