//! Built-in diagnostic catalog shown when the bulk fetch fails.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde_json::json;
use storefront_sync_core::ProductRecord;

/// Id of the diagnostic placeholder product.
pub const PLACEHOLDER_PRODUCT_ID: &str = "dummy_error_1";

/// The placeholder record set.
#[must_use]
pub fn placeholder_catalog() -> Vec<ProductRecord> {
    let mut record = ProductRecord::new(PLACEHOLDER_PRODUCT_ID, "DUMMY-ERR", "dummy product");
    record.category = vec!["Uncategorized".to_string()];
    record.description = "Server connection failed. This is a diagnostic placeholder.".to_string();
    record.sizes = BTreeMap::from([("Free Size".to_string(), 1)]);
    record.quality = Some("N/A".to_string());
    record.pickup_point = Some("N/A".to_string());
    record.cancel_policy = Some("N/A".to_string());
    record.country_of_origin = Some("N/A".to_string());
    record.manufacture_date = Some("N/A".to_string());
    record.is_best_selling = true;
    record.discount_percentage = Some(Decimal::ZERO);
    record.extra.insert("gender".to_string(), json!("Unisex"));
    vec![record]
}
