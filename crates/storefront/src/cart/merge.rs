//! Guest-into-account cart merge.
//!
//! Runs once per guest-to-authenticated transition, before stock validation.
//! Server lines keep their order and come first; guest-only lines follow in
//! guest order. A product present on both sides gets the summed quantity,
//! capped at the stock reported with the server line. A server line that
//! reports no stock is left uncapped; validation settles it against live stock.

use shopkeep_core::{Cart, CartItem, ProductId};

/// A line whose summed quantity was capped at stock during the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedLine {
    pub id: ProductId,
    pub name: String,
    pub requested: u32,
    pub quantity: u32,
}

/// Result of merging a guest cart into the server cart.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub items: Vec<CartItem>,
    pub reduced: Vec<ReducedLine>,
    /// Whether the guest cart added anything, i.e. the server now needs the
    /// merged cart pushed back.
    pub guest_contributed: bool,
}

/// Merge `guest` into the server lines.
#[must_use]
pub fn merge_carts(server: Vec<CartItem>, guest: &Cart) -> MergeOutcome {
    let mut reduced = Vec::new();
    let mut items: Vec<CartItem> = Vec::with_capacity(server.len() + guest.len());

    for mut item in server {
        if let Some(guest_item) = guest.get(&item.id) {
            let requested = item.qty.saturating_add(guest_item.qty);
            item.qty = match u32::try_from(item.count_in_stock) {
                Ok(available) if available > 0 => requested.min(available),
                _ => requested,
            };
            if item.qty < requested {
                reduced.push(ReducedLine {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    requested,
                    quantity: item.qty,
                });
            }
        }
        items.push(item);
    }

    for guest_item in guest {
        if !items.iter().any(|item| item.id == guest_item.id) {
            items.push(guest_item.clone());
        }
    }

    MergeOutcome {
        items,
        reduced,
        guest_contributed: !guest.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::product;

    fn pairs(items: &[CartItem]) -> Vec<(&str, u32)> {
        items.iter().map(|item| (item.id.as_str(), item.qty)).collect()
    }

    #[test]
    fn test_merge_server_first_then_guest_only() {
        let server = vec![
            CartItem::from_product(&product("s1", 10), 1),
            CartItem::from_product(&product("both", 10), 2),
        ];
        let guest = Cart::from_items(vec![
            CartItem::from_product(&product("g1", 10), 4),
            CartItem::from_product(&product("both", 10), 3),
        ]);

        let outcome = merge_carts(server, &guest);

        assert_eq!(pairs(&outcome.items), vec![("s1", 1), ("both", 5), ("g1", 4)]);
        assert!(outcome.reduced.is_empty());
        assert!(outcome.guest_contributed);
    }

    #[test]
    fn test_merge_caps_sum_at_server_stock() {
        let server = vec![CartItem::from_product(&product("p", 5), 3)];
        let guest = Cart::from_items(vec![CartItem::from_product(&product("p", 99), 4)]);

        let outcome = merge_carts(server, &guest);

        assert_eq!(pairs(&outcome.items), vec![("p", 5)]);
        assert_eq!(
            outcome.reduced,
            vec![ReducedLine {
                id: ProductId::new("p"),
                name: "Product p".to_string(),
                requested: 7,
                quantity: 5,
            }]
        );
    }

    #[test]
    fn test_merge_without_server_stock_left_for_validation() {
        let server = vec![CartItem::from_product(&product("p", 0), 1)];
        let guest = Cart::from_items(vec![CartItem::from_product(&product("p", 3), 1)]);

        let outcome = merge_carts(server, &guest);

        assert_eq!(pairs(&outcome.items), vec![("p", 2)]);
        assert!(outcome.reduced.is_empty());
    }

    #[test]
    fn test_merge_empty_guest_is_server_cart() {
        let server = vec![CartItem::from_product(&product("s", 3), 2)];
        let outcome = merge_carts(server.clone(), &Cart::new());

        assert_eq!(outcome.items, server);
        assert!(!outcome.guest_contributed);
    }

    #[test]
    fn test_merge_empty_server_is_guest_cart() {
        let guest = Cart::from_items(vec![
            CartItem::from_product(&product("a", 3), 1),
            CartItem::from_product(&product("b", 3), 2),
        ]);
        let outcome = merge_carts(Vec::new(), &guest);
        assert_eq!(pairs(&outcome.items), vec![("a", 1), ("b", 2)]);
    }
}
