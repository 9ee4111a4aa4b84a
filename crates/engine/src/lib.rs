//! Storefront sync engine.
//!
//! Client-side state for a storefront session: a live product catalog, a cart
//! and a wishlist that persist locally, survive restarts, and reconcile with a
//! per-user remote copy.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use storefront_sync_core::LineKey;
//! use storefront_sync::channel::EventHub;
//! use storefront_sync::config::SyncConfig;
//! use storefront_sync::remote::HttpRemote;
//! use storefront_sync::session::{Session, SessionDeps};
//! use storefront_sync::store::FileStore;
//!
//! let config = SyncConfig::from_env()?;
//! let remote = Arc::new(HttpRemote::new(&config.remote)?);
//! let session = Session::start(
//!     SessionDeps {
//!         store: Arc::new(FileStore::open(&config.store_dir, &config.store_namespace)?),
//!         remote: remote.clone(),
//!         catalog_source: remote,
//!         channel: Arc::new(EventHub::default()),
//!     },
//!     &config,
//! );
//!
//! session.add_to_cart(&LineKey::new("665f", "M", false), 1);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod channel;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod session;
pub mod store;
pub mod sync;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use session::{Session, SessionDeps};
