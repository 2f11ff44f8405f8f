//! Product records as served by the catalog API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::ProductId;
use super::price::final_price;

/// A catalog product.
///
/// `countInStock` is signed because the backend does not guarantee it stays
/// non-negative; anything at or below zero means unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Decimal,
    #[serde(default)]
    pub count_in_stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub specs: Map<String, Value>,
}

impl Product {
    /// Effective unit price after discount.
    #[must_use]
    pub fn final_price(&self) -> Decimal {
        final_price(self.price, self.discount_price)
    }

    /// Whether any stock is available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.count_in_stock > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_mongo_style_id() {
        let json = r#"{
            "_id": "64f1c0a2",
            "name": "Trail Runner",
            "price": 120,
            "discountPrice": 20.5,
            "countInStock": 3,
            "images": ["/img/a.jpg"],
            "brand": "Acme",
            "category": "shoes",
            "specs": {"size": "42"}
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "64f1c0a2");
        assert_eq!(product.final_price(), Decimal::new(995, 1));
        assert!(product.in_stock());
        assert_eq!(product.specs.get("size").unwrap(), "42");
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"id": "p1", "name": "Mug", "price": "9.99"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.discount_price, Decimal::ZERO);
        assert_eq!(product.count_in_stock, 0);
        assert!(!product.in_stock());
        assert_eq!(product.final_price(), Decimal::new(999, 2));
    }
}
