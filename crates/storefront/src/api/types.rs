//! Wire types for the storefront REST API.
//!
//! These mirror the JSON the backend sends and expects. Engines work with the
//! `shopkeep_core` types; conversion happens here.

use serde::{Deserialize, Serialize};
use shopkeep_core::{CartItem, CartLine, Product, ProductId};

/// One line of the server-side cart, with the product populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerCartLine {
    #[serde(alias = "productId")]
    pub product: Product,
    pub quantity: u32,
}

impl ServerCartLine {
    /// Snapshot into a cart item carrying the server quantity.
    #[must_use]
    pub fn to_cart_item(&self) -> CartItem {
        CartItem::from_product(&self.product, self.quantity)
    }
}

/// `GET /api/cart` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<ServerCartLine>,
}

/// `PUT /api/cart` request body.
#[derive(Debug, Serialize)]
pub struct ReplaceCartRequest<'a> {
    pub items: &'a [CartLine],
}

/// `POST /api/favorites/merge` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeFavoritesRequest<'a> {
    pub guest_favorites: &'a [ProductId],
}

/// Favorites payload. The backend answers either with a bare array or with
/// `{ "favorites": [...] }` depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FavoritesPayload {
    Wrapped { favorites: Vec<Product> },
    Bare(Vec<Product>),
}

impl FavoritesPayload {
    #[must_use]
    pub fn into_products(self) -> Vec<Product> {
        match self {
            Self::Wrapped { favorites } | Self::Bare(favorites) => favorites,
        }
    }
}

/// Error body returned by the backend on failures.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_response_with_populated_product() {
        let json = r#"{
            "items": [
                {"productId": {"_id": "p1", "name": "Lamp", "price": 40, "countInStock": 2}, "quantity": 1}
            ]
        }"#;
        let response: CartResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 1);
        let item = response.items[0].to_cart_item();
        assert_eq!(item.id.as_str(), "p1");
        assert_eq!(item.qty, 1);
        assert_eq!(item.count_in_stock, 2);
    }

    #[test]
    fn test_cart_response_empty_body() {
        let response: CartResponse = serde_json::from_str("{}").unwrap();
        assert!(response.items.is_empty());
    }

    #[test]
    fn test_replace_cart_body() {
        let lines = vec![CartLine {
            product_id: ProductId::new("p1"),
            quantity: 3,
        }];
        let body = serde_json::to_value(ReplaceCartRequest { items: &lines }).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"items": [{"productId": "p1", "quantity": 3}]})
        );
    }

    #[test]
    fn test_merge_request_body() {
        let ids = vec![ProductId::new("a"), ProductId::new("b")];
        let body = serde_json::to_value(MergeFavoritesRequest {
            guest_favorites: &ids,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"guestFavorites": ["a", "b"]}));
    }

    #[test]
    fn test_favorites_payload_shapes() {
        let wrapped: FavoritesPayload =
            serde_json::from_str(r#"{"favorites": [{"id": "a", "name": "A", "price": 1}]}"#)
                .unwrap();
        assert_eq!(wrapped.into_products().len(), 1);

        let bare: FavoritesPayload =
            serde_json::from_str(r#"[{"id": "a", "name": "A", "price": 1}]"#).unwrap();
        assert_eq!(bare.into_products().len(), 1);
    }
}
