//! Product records as held by the catalog cache.
//!
//! The remote store keys documents by `_id`; the rest of the system only ever
//! sees `id`. Normalization happens once, during deserialization, so a
//! [`ProductRecord`] in memory always carries a single canonical id.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::ProductId;

/// Errors raised while normalizing an incoming product payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProductRecordError {
    /// Neither `id` nor `_id` was present.
    #[error("product record has neither `id` nor `_id`")]
    MissingId,
}

/// Exchange policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExchangePolicyKind {
    /// Exchange allowed within a number of days.
    Days,
    /// No exchanges.
    NoExchange,
}

/// Exchange policy attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangePolicy {
    /// Policy kind.
    #[serde(rename = "type")]
    pub kind: ExchangePolicyKind,
    /// Exchange window in days, for [`ExchangePolicyKind::Days`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    /// Free-form policy text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Product colour swatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    /// Display name (e.g., "Sand").
    pub name: String,
    /// Hex code (e.g., "#d8c8a8").
    pub hex: String,
}

/// A product in the catalog.
///
/// Fields the engine does not know about are kept in `extra` so a record
/// survives a load/store round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Canonical product id.
    pub id: ProductId,
    /// The other id scheme, when the payload carried both `id` and `_id`.
    #[serde(skip)]
    alias: Option<ProductId>,
    /// Stock keeping unit.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Categories, genders and tags merged for display.
    pub category: Vec<String>,
    /// Search tags.
    pub tags: Vec<String>,
    /// List price.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub actual_price: Decimal,
    /// Selling price.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub offer_price: Decimal,
    /// Image URLs.
    pub images: Vec<String>,
    /// Long description.
    pub description: String,
    /// Size name to stock count.
    pub sizes: BTreeMap<String, i64>,
    /// Fabric/print quality note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Warehouse pickup point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_point: Option<String>,
    /// Exchange policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_policy: Option<ExchangePolicy>,
    /// Cancellation policy text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_policy: Option<String>,
    /// Colour swatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    /// SKUs of related products.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub linked_products: Vec<String>,
    /// Country of origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_of_origin: Option<String>,
    /// Manufacture date as provided by the remote store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacture_date: Option<String>,
    /// Best-seller flag.
    pub is_best_selling: bool,
    /// Advertised discount.
    #[serde(
        serialize_with = "rust_decimal::serde::float_option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_percentage: Option<Decimal>,
    /// Unrecognized fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProductRecord {
    /// Create a record with the given id and name and everything else empty.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: None,
            sku: sku.into(),
            name: name.into(),
            category: Vec::new(),
            tags: Vec::new(),
            actual_price: Decimal::ZERO,
            offer_price: Decimal::ZERO,
            images: Vec::new(),
            description: String::new(),
            sizes: BTreeMap::new(),
            quality: None,
            pickup_point: None,
            exchange_policy: None,
            cancel_policy: None,
            color: None,
            linked_products: Vec::new(),
            country_of_origin: None,
            manufacture_date: None,
            is_best_selling: false,
            discount_percentage: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Whether `id` names this record under either id scheme.
    #[must_use]
    pub fn matches(&self, id: &str) -> bool {
        self.id.as_str() == id || self.alias.as_ref().is_some_and(|alias| alias.as_str() == id)
    }

    /// Stock count for a size, if the product has that size.
    #[must_use]
    pub fn stock(&self, size: &str) -> Option<i64> {
        self.sizes.get(size).copied()
    }

    /// Whether any size has stock left.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.sizes.values().any(|count| *count > 0)
    }

    /// Stock summed over every size, saturating at the `i64` bounds.
    #[must_use]
    pub fn total_stock(&self) -> i64 {
        self.sizes
            .values()
            .fold(0_i64, |total, count| total.saturating_add(*count))
    }
}

/// Raw product payload before id normalization.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProductRecord {
    #[serde(default)]
    id: Option<ProductId>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<ProductId>,
    #[serde(default)]
    sku: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    actual_price: Decimal,
    #[serde(default)]
    offer_price: Decimal,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    sizes: BTreeMap<String, i64>,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default)]
    pickup_point: Option<String>,
    #[serde(default)]
    exchange_policy: Option<ExchangePolicy>,
    #[serde(default)]
    cancel_policy: Option<String>,
    #[serde(default)]
    color: Option<Color>,
    #[serde(default)]
    linked_products: Vec<String>,
    #[serde(default)]
    country_of_origin: Option<String>,
    #[serde(default)]
    manufacture_date: Option<String>,
    #[serde(default)]
    is_best_selling: bool,
    #[serde(default)]
    discount_percentage: Option<Decimal>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<WireProductRecord> for ProductRecord {
    type Error = ProductRecordError;

    fn try_from(wire: WireProductRecord) -> Result<Self, Self::Error> {
        // `_id` is authoritative when present; a differing `id` is kept as an alias.
        let (id, alias) = match (wire.mongo_id, wire.id) {
            (Some(mongo_id), Some(id)) if mongo_id != id => (mongo_id, Some(id)),
            (Some(mongo_id), _) => (mongo_id, None),
            (None, Some(id)) => (id, None),
            (None, None) => return Err(ProductRecordError::MissingId),
        };

        Ok(Self {
            id,
            alias,
            sku: wire.sku,
            name: wire.name,
            category: wire.category,
            tags: wire.tags,
            actual_price: wire.actual_price,
            offer_price: wire.offer_price,
            images: wire.images,
            description: wire.description,
            sizes: wire.sizes,
            quality: wire.quality,
            pickup_point: wire.pickup_point,
            exchange_policy: wire.exchange_policy,
            cancel_policy: wire.cancel_policy,
            color: wire.color,
            linked_products: wire.linked_products,
            country_of_origin: wire.country_of_origin,
            manufacture_date: wire.manufacture_date,
            is_best_selling: wire.is_best_selling,
            discount_percentage: wire.discount_percentage,
            extra: wire.extra,
        })
    }
}

impl<'de> Deserialize<'de> for ProductRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = WireProductRecord::deserialize(deserializer)?;
        Self::try_from(wire).map_err(serde::de::Error::custom)
    }
}
