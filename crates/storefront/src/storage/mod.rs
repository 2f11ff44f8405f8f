//! Local persistence for guest cart and favorites.
//!
//! [`KeyValueStore`] is the raw string store (the local-storage analogue);
//! [`GuestStore`] layers typed, timestamped JSON envelopes on top of it under
//! two fixed keys.
//!
//! Persisted data is a cache, never the source of truth once a user is
//! authenticated. Envelopes older than the configured maximum age, or that fail
//! to parse, load as empty.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shopkeep_core::{Cart, Favorites};
use thiserror::Error;
use tracing::{info, warn};

/// Storage key for the persisted cart.
pub const CART_KEY: &str = "shopkeep.cart";
/// Storage key for guest favorites.
pub const FAVORITES_KEY: &str = "shopkeep.favorites";

/// Errors from the local key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Absent keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Who a persisted cart belongs to.
///
/// Only `Guest` carts are merged into an account on login. An `Account` cart is
/// a replica of the server cart kept for offline display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreScope {
    #[default]
    Guest,
    Account,
}

/// A cart as read back from local storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredCart {
    pub scope: StoreScope,
    pub cart: Cart,
}

impl StoredCart {
    /// The cart if it is guest data, otherwise an empty cart.
    #[must_use]
    pub fn guest_cart(self) -> Cart {
        match self.scope {
            StoreScope::Guest => self.cart,
            StoreScope::Account => Cart::new(),
        }
    }

    /// The cart if it is an account replica.
    #[must_use]
    pub fn account_cart(self) -> Option<Cart> {
        match self.scope {
            StoreScope::Account => Some(self.cart),
            StoreScope::Guest => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    scope: StoreScope,
    saved_at: DateTime<Utc>,
    items: T,
}

/// Typed access to the guest cart and favorites.
#[derive(Clone)]
pub struct GuestStore {
    backend: Arc<dyn KeyValueStore>,
    max_age: chrono::Duration,
}

impl GuestStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, max_age: chrono::Duration) -> Self {
        Self { backend, max_age }
    }

    /// Load the persisted cart. Missing, stale or corrupt data loads as an
    /// empty guest cart.
    #[must_use]
    pub fn load_cart(&self) -> StoredCart {
        self.load::<Cart>(CART_KEY)
            .map(|envelope| StoredCart {
                scope: envelope.scope,
                cart: envelope.items,
            })
            .unwrap_or_default()
    }

    /// Persist the cart under the given scope.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn save_cart(&self, cart: &Cart, scope: StoreScope) -> Result<(), StorageError> {
        self.save(CART_KEY, cart, scope)
    }

    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn clear_cart(&self) -> Result<(), StorageError> {
        self.backend.remove(CART_KEY)
    }

    /// Load guest favorites. Missing, stale or corrupt data loads as empty.
    #[must_use]
    pub fn load_favorites(&self) -> Favorites {
        self.load::<Favorites>(FAVORITES_KEY)
            .map(|envelope| envelope.items)
            .unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn save_favorites(&self, favorites: &Favorites) -> Result<(), StorageError> {
        self.save(FAVORITES_KEY, favorites, StoreScope::Guest)
    }

    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn clear_favorites(&self) -> Result<(), StorageError> {
        self.backend.remove(FAVORITES_KEY)
    }

    fn save<T: Serialize>(&self, key: &str, items: &T, scope: StoreScope) -> Result<(), StorageError> {
        let envelope = Envelope {
            scope,
            saved_at: Utc::now(),
            items,
        };
        let json = serde_json::to_string(&envelope)?;
        self.backend.set(key, &json)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<Envelope<T>> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read local storage");
                return None;
            }
        };

        let envelope = match decode_envelope::<T>(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable local data");
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(envelope.saved_at);
        if age > self.max_age {
            info!(key, age_days = age.num_days(), "Discarding stale local data");
            if let Err(e) = self.backend.remove(key) {
                warn!(key, error = %e, "Failed to remove stale local data");
            }
            return None;
        }

        Some(envelope)
    }
}

/// Decode an envelope, accepting a bare JSON array as fresh guest data.
fn decode_envelope<T: DeserializeOwned>(raw: &str) -> Result<Envelope<T>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if value.is_array() {
        return Ok(Envelope {
            scope: StoreScope::Guest,
            saved_at: Utc::now(),
            items: serde_json::from_value(value)?,
        });
    }
    serde_json::from_value(value)
}
