//! Remote persistence service.
//!
//! Per-user copies of the cart and wishlist live on the storefront backend.
//! The session pushes the latest local state after a quiet period and pulls
//! once per authentication; see [`crate::session`].
//!
//! [`HttpRemote`] is the production client. Tests substitute their own
//! [`RemoteStore`] implementations.

mod http;

pub use http::HttpRemote;

use async_trait::async_trait;
use storefront_sync_core::{CartLine, ProductId, UserId};
use thiserror::Error;

/// Errors that can occur when talking to the remote store or catalog.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Per-user remote copies of the cart and wishlist.
///
/// Every call is independent. Failures are returned to the caller, which
/// logs them and moves on; nothing here retries.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Replace the user's remote cart.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the request fails.
    async fn save_cart(&self, user: &UserId, lines: &[CartLine]) -> Result<(), RemoteError>;

    /// Fetch the user's remote cart. An unknown user yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the request fails.
    async fn fetch_cart(&self, user: &UserId) -> Result<Vec<CartLine>, RemoteError>;

    /// Replace the user's remote wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the request fails.
    async fn save_wishlist(&self, user: &UserId, ids: &[ProductId]) -> Result<(), RemoteError>;

    /// Fetch the user's remote wishlist. An unknown user yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the request fails.
    async fn fetch_wishlist(&self, user: &UserId) -> Result<Vec<ProductId>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::Api {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "API error (503): maintenance");
        assert_eq!(
            RemoteError::RateLimited(30).to_string(),
            "Rate limited, retry after 30 seconds"
        );
    }
}
