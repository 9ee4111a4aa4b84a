//! Command implementations.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod wishlist;

use serde::Serialize;

/// Renders command results as text or JSON.
pub struct Output {
    json: bool,
}

impl Output {
    #[must_use]
    pub const fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as pretty JSON when `--json` was given, otherwise run
    /// `text` to print the human-readable form.
    pub fn emit<T: Serialize + ?Sized>(&self, value: &T, text: impl FnOnce()) {
        if !self.json {
            text();
            return;
        }
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "Failed to encode output"),
        }
    }
}
