//! Favorites: a set of product snapshots keyed by product id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::Product;

/// A favorited product. Stored as a full snapshot, not a reference.
pub type FavoriteItem = Product;

/// Set of favorites with no ordering guarantee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FavoriteItem>", into = "Vec<FavoriteItem>")]
pub struct Favorites {
    items: HashMap<ProductId, FavoriteItem>,
}

impl Favorites {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.items.contains_key(id)
    }

    pub fn insert(&mut self, item: FavoriteItem) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn remove(&mut self, id: &ProductId) -> Option<FavoriteItem> {
        self.items.remove(id)
    }

    /// Flip membership of `product`. Returns `true` if it is now a favorite.
    pub fn toggle(&mut self, product: &Product) -> bool {
        if self.items.remove(&product.id).is_some() {
            false
        } else {
            self.insert(product.clone());
            true
        }
    }

    /// Member ids, sorted so callers get a stable order.
    #[must_use]
    pub fn ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<_> = self.items.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn items(&self) -> impl Iterator<Item = &FavoriteItem> {
        self.items.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl From<Vec<FavoriteItem>> for Favorites {
    fn from(items: Vec<FavoriteItem>) -> Self {
        items.into_iter().collect()
    }
}

impl From<Favorites> for Vec<FavoriteItem> {
    fn from(favorites: Favorites) -> Self {
        let mut items: Vec<_> = favorites.items.into_values().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }
}

impl FromIterator<FavoriteItem> for Favorites {
    fn from_iter<I: IntoIterator<Item = FavoriteItem>>(iter: I) -> Self {
        let mut favorites = Self::new();
        for item in iter {
            favorites.insert(item);
        }
        favorites
    }
}
