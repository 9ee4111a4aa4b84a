//! HTTP client for the storefront backend.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use storefront_sync_core::{CartLine, ProductId, ProductRecord, UserId};
use tracing::{debug, instrument};
use url::Url;

use super::{RemoteError, RemoteStore};
use crate::catalog::CatalogSource;
use crate::config::RemoteConfig;

// =============================================================================
// HttpRemote
// =============================================================================

/// Client for the storefront backend's product and per-user endpoints.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpRemote {
    inner: Arc<HttpRemoteInner>,
}

struct HttpRemoteInner {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemote")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_token", &self.inner.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl HttpRemote {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Http` if the underlying HTTP client cannot be built.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpRemoteInner {
                client,
                base_url: config.base_url.clone(),
                api_token: config.api_token.clone(),
            }),
        })
    }

    /// The base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        endpoint_url(&self.inner.base_url, segments)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// GET a list that may be returned bare or wrapped under `key`.
    async fn get_list<T: DeserializeOwned>(
        &self,
        url: Url,
        key: &str,
    ) -> Result<Vec<T>, RemoteError> {
        let response = self
            .authorize(self.inner.client.get(url))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(key, "Remote list not found, treating as empty");
            return Ok(Vec::new());
        }

        let body = check_status(response).await?.text().await?;
        decode_list(&body, key)
    }

    /// PUT `{ key: items }`.
    async fn put_list<T: Serialize + Sync>(
        &self,
        url: Url,
        key: &str,
        items: &[T],
    ) -> Result<(), RemoteError> {
        let body = serde_json::json!({ key: items });
        let response = self
            .authorize(self.inner.client.put(url))
            .json(&body)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    #[instrument(skip(self, lines), fields(user = %user, lines = lines.len()))]
    async fn save_cart(&self, user: &UserId, lines: &[CartLine]) -> Result<(), RemoteError> {
        let url = self.endpoint(&["users", user.as_str(), "cart"])?;
        self.put_list(url, "cart", lines).await
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn fetch_cart(&self, user: &UserId) -> Result<Vec<CartLine>, RemoteError> {
        let url = self.endpoint(&["users", user.as_str(), "cart"])?;
        self.get_list(url, "cart").await
    }

    #[instrument(skip(self, ids), fields(user = %user, ids = ids.len()))]
    async fn save_wishlist(&self, user: &UserId, ids: &[ProductId]) -> Result<(), RemoteError> {
        let url = self.endpoint(&["users", user.as_str(), "wishlist"])?;
        self.put_list(url, "wishlist", ids).await
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn fetch_wishlist(&self, user: &UserId) -> Result<Vec<ProductId>, RemoteError> {
        let url = self.endpoint(&["users", user.as_str(), "wishlist"])?;
        self.get_list(url, "wishlist").await
    }
}

#[async_trait]
impl CatalogSource for HttpRemote {
    #[instrument(skip(self))]
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>, RemoteError> {
        let url = self.endpoint(&["products"])?;
        self.get_list(url, "products").await
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Resolve `segments` below `base`, percent-encoding each one.
fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| RemoteError::Parse(format!("base URL cannot have a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map 429 and other non-success statuses to errors.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(RemoteError::RateLimited(retry_after));
    }

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(RemoteError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response)
}

/// Decode a bare JSON array or an object carrying the array under `key`.
///
/// A `null` body or a missing/`null` key decodes as an empty list.
fn decode_list<T: DeserializeOwned>(body: &str, key: &str) -> Result<Vec<T>, RemoteError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| RemoteError::Parse(e.to_string()))?;

    let list = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Null => return Ok(Vec::new()),
        serde_json::Value::Object(mut map) => match map.remove(key) {
            None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
            Some(list) => list,
        },
        other => {
            return Err(RemoteError::Parse(format!(
                "expected array or object with `{key}`, got {other}"
            )));
        }
    };

    serde_json::from_value(list).map_err(|e| RemoteError::Parse(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(base: &str) -> RemoteConfig {
        RemoteConfig {
            base_url: Url::parse(base).unwrap(),
            api_token: Some(SecretString::from("k9#Qz!v7Lw2@Rp4x")),
            events_url: None,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_endpoint_encodes_user_id() {
        let base = Url::parse("http://localhost:5000/api/").unwrap();
        let url = endpoint_url(&base, &["users", "a b/c", "cart"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/users/a%20b%2Fc/cart");

        let url = endpoint_url(&base, &["products"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/products");
    }

    #[test]
    fn test_decode_bare_and_wrapped_lists() {
        let bare: Vec<CartLine> =
            decode_list(r#"[{"productId":"p1","size":"M","quantity":2}]"#, "cart").unwrap();
        assert_eq!(bare, vec![CartLine::new("p1", "M", 2)]);

        let wrapped: Vec<ProductId> =
            decode_list(r#"{"wishlist":["p1","p2"],"userId":"u1"}"#, "wishlist").unwrap();
        assert_eq!(wrapped, vec![ProductId::new("p1"), ProductId::new("p2")]);
    }

    #[test]
    fn test_decode_missing_or_null_is_empty() {
        assert!(decode_list::<ProductId>("null", "wishlist").unwrap().is_empty());
        assert!(decode_list::<ProductId>(r#"{"cart":null}"#, "cart").unwrap().is_empty());
        assert!(decode_list::<ProductId>("{}", "wishlist").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed_body() {
        assert!(matches!(
            decode_list::<CartLine>("42", "cart"),
            Err(RemoteError::Parse(_))
        ));
        assert!(matches!(
            decode_list::<CartLine>(r#"[{"size":"M"}]"#, "cart"),
            Err(RemoteError::Parse(_))
        ));
    }

    #[test]
    fn test_products_accept_mongo_ids() {
        let records: Vec<ProductRecord> =
            decode_list(r#"{"products":[{"_id":"665f","name":"Tee"}]}"#, "products").unwrap();
        assert_eq!(records[0].id.as_str(), "665f");
    }

    #[test]
    fn test_debug_redacts_token() {
        let remote = HttpRemote::new(&config("http://localhost:5000/api/")).unwrap();
        let debug = format!("{remote:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("k9#Qz"));
        assert_eq!(remote.base_url().as_str(), "http://localhost:5000/api/");
    }
}
