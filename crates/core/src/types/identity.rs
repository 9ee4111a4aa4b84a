//! Session identity.
//!
//! The identity is the only thing the sync engine needs to know about
//! authentication: whether a user is present, and which id keys their remote
//! cart and wishlist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Email, UserId};

/// The authenticated user for the running session.
///
/// Persisted under the `user` key of the local store. The remote store hands
/// out `_id`, `id`, or both; on input `_id` wins, and only `id` is written
/// back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireSessionIdentity")]
pub struct SessionIdentity {
    /// Remote user id. Keys the remote cart and wishlist.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Account email.
    pub email: Email,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// When the account was created on the remote side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Errors raised while decoding a [`SessionIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The payload had neither `id` nor `_id`.
    #[error("user has neither `id` nor `_id`")]
    MissingId,
}

/// Raw user payload before id normalization.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSessionIdentity {
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<UserId>,
    #[serde(default)]
    name: String,
    email: Email,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<WireSessionIdentity> for SessionIdentity {
    type Error = IdentityError;

    fn try_from(wire: WireSessionIdentity) -> Result<Self, Self::Error> {
        let id = wire.mongo_id.or(wire.id).ok_or(IdentityError::MissingId)?;
        Ok(Self {
            id,
            name: wire.name,
            email: wire.email,
            phone: wire.phone,
            created_at: wire.created_at,
        })
    }
}

impl SessionIdentity {
    /// Create an identity with only the required fields set.
    #[must_use]
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, email: Email) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email,
            phone: None,
            created_at: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_mongo_style_id() {
        let json = r#"{"_id":"u-42","name":"Asha","email":"asha@example.com"}"#;
        let identity: SessionIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.id.as_str(), "u-42");

        let written = serde_json::to_value(&identity).unwrap();
        assert_eq!(written["id"], "u-42");
        assert!(written.get("_id").is_none());
        assert!(written.get("phone").is_none());
    }

    #[test]
    fn test_both_ids_prefer_mongo_id() {
        let json = r#"{
            "_id": "665f",
            "id": "legacy-9",
            "name": "Asha",
            "email": "asha@example.com",
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;
        let identity: SessionIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.id.as_str(), "665f");
        assert!(identity.created_at.is_some());

        let round_trip: SessionIdentity =
            serde_json::from_value(serde_json::to_value(&identity).unwrap()).unwrap();
        assert_eq!(round_trip, identity);
    }

    #[test]
    fn test_missing_id_is_unreadable() {
        let json = r#"{"name":"Asha","email":"asha@example.com"}"#;
        let err = serde_json::from_str::<SessionIdentity>(json).unwrap_err();
        assert!(err.to_string().contains("neither `id` nor `_id`"));
    }

    #[test]
    fn test_invalid_email_is_unreadable() {
        let json = r#"{"id":"u-42","name":"Asha","email":"nope"}"#;
        assert!(serde_json::from_str::<SessionIdentity>(json).is_err());
    }
}
