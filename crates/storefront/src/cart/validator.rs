//! Stock validation against live product records.
//!
//! Every line is checked concurrently with its own `GET /api/products/:id`.
//! Results are reassembled in cart order.
//!
//! | Live record | Outcome |
//! |-------------|---------|
//! | missing or `countInStock <= 0` | line dropped, warning |
//! | `countInStock < qty` | quantity clamped, catalog refreshed, warning |
//! | otherwise | catalog refreshed |
//! | fetch failed | line kept unchanged |

use std::sync::Arc;

use futures::future::join_all;
use shopkeep_core::{CartItem, ValidationResult};
use tracing::{debug, instrument, warn};

use crate::api::ShopApi;
use crate::notify::{Notification, Notifier};

/// Outcome of checking one line.
#[derive(Debug)]
enum StockCheck {
    Keep(CartItem),
    Clamped(CartItem),
    Dropped(CartItem),
}

/// Checks cart lines against current stock.
#[derive(Clone)]
pub struct StockValidator {
    api: Arc<dyn ShopApi>,
    notifier: Arc<dyn Notifier>,
}

impl StockValidator {
    pub fn new(api: Arc<dyn ShopApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Validate items against live stock.
    ///
    /// Emits one warning per dropped or clamped line. `changed` is true when
    /// anything was dropped or clamped; catalog refreshes alone do not count.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn validate(&self, items: Vec<CartItem>) -> ValidationResult {
        let checks = join_all(items.into_iter().map(|item| self.check(item))).await;

        let mut changed = false;
        let mut validated_items = Vec::with_capacity(checks.len());

        for check in checks {
            match check {
                StockCheck::Keep(item) => validated_items.push(item),
                StockCheck::Clamped(item) => {
                    changed = true;
                    self.notifier.notify(Notification::warning(format!(
                        "Quantity of {} reduced to {} due to limited stock",
                        item.name, item.qty
                    )));
                    validated_items.push(item);
                }
                StockCheck::Dropped(item) => {
                    changed = true;
                    self.notifier.notify(Notification::warning(format!(
                        "{} is no longer available and was removed from your cart",
                        item.name
                    )));
                }
            }
        }

        debug!(kept = validated_items.len(), changed, "Stock validation finished");
        ValidationResult {
            validated_items,
            changed,
        }
    }

    async fn check(&self, mut item: CartItem) -> StockCheck {
        match self.api.product(&item.id).await {
            Ok(Some(product)) if product.in_stock() => {
                item.refresh_from(&product);
                if item.exceeds_stock() {
                    item.qty = u32::try_from(product.count_in_stock).unwrap_or(u32::MAX);
                    StockCheck::Clamped(item)
                } else {
                    StockCheck::Keep(item)
                }
            }
            Ok(_) => StockCheck::Dropped(item),
            Err(e) => {
                // Unknown stock keeps the line; the next validation decides.
                warn!(product_id = %item.id, error = %e, "Stock check failed, keeping line");
                StockCheck::Keep(item)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{StubApi, product};
    use crate::notify::CollectingNotifier;
    use shopkeep_core::{NotificationLevel, ProductId};

    fn validator(api: StubApi) -> (StockValidator, CollectingNotifier) {
        let notifier = CollectingNotifier::new();
        let validator = StockValidator::new(Arc::new(api), Arc::new(notifier.clone()));
        (validator, notifier)
    }

    #[tokio::test]
    async fn test_validate_keeps_order_and_refreshes_catalog() {
        let api = StubApi::new();
        let mut repriced = product("b", 10);
        repriced.price = rust_decimal::Decimal::new(500, 2);
        api.put_product(product("a", 10));
        api.put_product(repriced.clone());
        let (validator, notifier) = validator(api);

        let mut stale = CartItem::from_product(&product("b", 10), 2);
        stale.name = "Old name".to_string();
        let result = validator
            .validate(vec![CartItem::from_product(&product("a", 10), 1), stale])
            .await;

        assert!(!result.changed);
        let ids: Vec<_> = result.validated_items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(result.validated_items[1].name, repriced.name);
        assert_eq!(result.validated_items[1].price, repriced.price);
        assert_eq!(result.validated_items[1].qty, 2);
        assert!(notifier.take().is_empty());
    }

    #[tokio::test]
    async fn test_validate_drops_missing_and_sold_out() {
        let api = StubApi::new();
        api.put_product(product("sold-out", 0));
        api.put_product(product("ok", 4));
        let (validator, notifier) = validator(api);

        let result = validator
            .validate(vec![
                CartItem::from_product(&product("gone", 3), 1),
                CartItem::from_product(&product("sold-out", 3), 1),
                CartItem::from_product(&product("ok", 4), 1),
            ])
            .await;

        assert!(result.changed);
        assert_eq!(result.validated_items.len(), 1);
        assert_eq!(result.validated_items[0].id, ProductId::new("ok"));

        let notes = notifier.take();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.level == NotificationLevel::Warning));
    }

    #[tokio::test]
    async fn test_validate_clamps_to_stock() {
        let api = StubApi::new();
        api.put_product(product("a", 2));
        let (validator, notifier) = validator(api);

        let result = validator
            .validate(vec![CartItem::from_product(&product("a", 9), 5)])
            .await;

        assert!(result.changed);
        assert_eq!(result.validated_items[0].qty, 2);
        assert_eq!(result.validated_items[0].count_in_stock, 2);
        assert_eq!(notifier.take().len(), 1);
    }

    #[tokio::test]
    async fn test_validate_keeps_line_when_fetch_fails() {
        let api = StubApi::new();
        api.fail_products(true);
        let (validator, notifier) = validator(api);

        let item = CartItem::from_product(&product("a", 1), 7);
        let result = validator.validate(vec![item.clone()]).await;

        assert!(!result.changed);
        assert_eq!(result.validated_items, vec![item]);
        assert!(notifier.take().is_empty());
    }

    #[tokio::test]
    async fn test_validate_empty_cart() {
        let (validator, _) = validator(StubApi::new());
        let result = validator.validate(Vec::new()).await;
        assert!(result.validated_items.is_empty());
        assert!(!result.changed);
    }
}
