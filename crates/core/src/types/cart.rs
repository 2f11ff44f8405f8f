//! Cart line items and the ordered cart collection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::ProductId;
use super::price::final_price;
use super::product::Product;

/// A product snapshot with a requested quantity.
///
/// After stock validation `qty <= count_in_stock` holds. `final_price` is kept
/// in line with `price` and `discount_price` by every constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Decimal,
    #[serde(default)]
    pub final_price: Decimal,
    #[serde(default)]
    pub count_in_stock: i64,
    pub qty: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub specs: Map<String, Value>,
}

impl CartItem {
    /// Snapshot a product into a cart line.
    #[must_use]
    pub fn from_product(product: &Product, qty: u32) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            discount_price: product.discount_price,
            final_price: product.final_price(),
            count_in_stock: product.count_in_stock,
            qty,
            images: product.images.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            specs: product.specs.clone(),
        }
    }

    /// Refresh the cached catalog fields from a live product record.
    ///
    /// The quantity is left alone.
    pub fn refresh_from(&mut self, product: &Product) {
        let qty = self.qty;
        *self = Self::from_product(product, qty);
    }

    /// Recompute `final_price` from `price` and `discount_price`.
    pub fn reprice(&mut self) {
        self.final_price = final_price(self.price, self.discount_price);
    }

    /// Whether the requested quantity is more than the cached stock.
    #[must_use]
    pub fn exceeds_stock(&self) -> bool {
        i64::from(self.qty) > self.count_in_stock
    }

    /// Price of the whole line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.final_price * Decimal::from(self.qty)
    }

    /// Wire form used when overwriting the server cart.
    #[must_use]
    pub fn line(&self) -> CartLine {
        CartLine {
            product_id: self.id.clone(),
            quantity: self.qty,
        }
    }
}

/// `{ productId, quantity }` pair sent to the cart endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Totals for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CartSummary {
    pub item_count: u32,
    pub subtotal: Decimal,
    pub savings: Decimal,
}

/// Output of a stock validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub validated_items: Vec<CartItem>,
    pub changed: bool,
}

/// Ordered collection of cart items with unique ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from arbitrary items.
    ///
    /// Duplicate ids are folded into the first occurrence with summed
    /// quantities, zero-quantity lines are dropped and prices are recomputed.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for mut item in items {
            if item.qty == 0 {
                continue;
            }
            item.reprice();
            cart.upsert(item);
        }
        cart
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CartItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    fn get_mut(&mut self, id: &ProductId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Quantity currently held for `id` (zero when absent).
    #[must_use]
    pub fn quantity_of(&self, id: &ProductId) -> u32 {
        self.get(id).map_or(0, |item| item.qty)
    }

    /// Insert a line, or add its quantity to an existing line with the same id.
    ///
    /// An existing line also takes the incoming catalog snapshot. Returns the
    /// resulting quantity.
    pub fn upsert(&mut self, item: CartItem) -> u32 {
        if let Some(existing) = self.get_mut(&item.id) {
            let qty = existing.qty.saturating_add(item.qty);
            *existing = CartItem { qty, ..item };
            qty
        } else {
            let qty = item.qty;
            self.items.push(item);
            qty
        }
    }

    /// Overwrite the quantity of an existing line. Returns `false` if absent.
    pub fn set_quantity(&mut self, id: &ProductId, qty: u32) -> bool {
        match self.get_mut(id) {
            Some(item) => {
                item.qty = qty;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &ProductId) -> Option<CartItem> {
        let idx = self.items.iter().position(|item| &item.id == id)?;
        Some(self.items.remove(idx))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.qty))
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total discount across all lines.
    #[must_use]
    pub fn savings(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| (item.price - item.final_price) * Decimal::from(item.qty))
            .sum()
    }

    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary {
            item_count: self.total_quantity(),
            subtotal: self.subtotal(),
            savings: self.savings(),
        }
    }

    /// Wire lines for a full-cart overwrite.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.items.iter().map(CartItem::line).collect()
    }
}

impl From<Vec<CartItem>> for Cart {
    fn from(items: Vec<CartItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
