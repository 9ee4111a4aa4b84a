//! Unified error handling with Sentry integration.
//!
//! The session never propagates collaborator failures to its caller; it logs
//! them and hands them to [`report`], which captures them to Sentry. `SyncError`
//! is the umbrella type for the fallible edges that do return errors:
//! configuration, opening a local store, building HTTP clients, and invalid
//! caller input. Each boundary error converts into it with `?`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::remote::RemoteError;
use crate::store::StoreError;

/// Top-level error type for the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Local store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Remote store or catalog operation failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Invalid input from the caller.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Result type alias for `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Log an absorbed collaborator failure and capture it to Sentry.
///
/// `operation` names what was attempted (e.g., `"cart push"`).
pub fn report<E>(operation: &str, err: &E)
where
    E: std::error::Error + Send + Sync + 'static,
{
    let event_id = sentry::capture_error(err);
    tracing::error!(
        operation,
        error = %err,
        sentry_event_id = %event_id,
        "Sync operation failed"
    );
}

/// Set the Sentry user context from a session identity.
///
/// Call this after an identity becomes available so errors are associated
/// with the user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a cart or wishlist action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to a failed push or pull.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
