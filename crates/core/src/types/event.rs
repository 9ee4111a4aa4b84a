//! Push channel events.
//!
//! Events arrive as `{ "event": <name>, "data": <payload> }` envelopes.

use serde::{Deserialize, Serialize};

use super::{ProductId, ProductRecord};

/// A catalog or order change notification delivered outside the
/// request/response cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// A product was created.
    ProductCreated(ProductRecord),
    /// A product was replaced wholesale.
    ProductUpdated(ProductRecord),
    /// A product was deleted. Carries either id scheme.
    ProductDeleted(ProductId),
    /// One size of one product changed stock.
    #[serde(rename_all = "camelCase")]
    StockUpdated {
        /// Product id, either scheme.
        product_id: ProductId,
        /// Size name.
        size: String,
        /// New stock count.
        new_stock: i64,
    },
    /// An order was placed. Observed but not acted on.
    OrderCreated(serde_json::Value),
}

impl PushEvent {
    /// The wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProductCreated(_) => "product_created",
            Self::ProductUpdated(_) => "product_updated",
            Self::ProductDeleted(_) => "product_deleted",
            Self::StockUpdated { .. } => "stock_updated",
            Self::OrderCreated(_) => "order_created",
        }
    }
}
