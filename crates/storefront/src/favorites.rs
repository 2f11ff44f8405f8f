//! Favorites engine.
//!
//! Guests keep favorites in local storage only. Authenticated sessions treat
//! the server as the source of truth and apply toggles optimistically through
//! an [`OptimisticToggle`], which restores the pre-toggle set if the server
//! rejects the change.
//!
//! On login the guest set is sent to `POST /api/favorites/merge` once; the
//! local guest copy is cleared only after the server has accepted it.

use std::sync::Arc;

use shopkeep_core::{Favorites, HydrationState, Product, ProductId};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::ShopApi;
use crate::error::{Result, StoreError};
use crate::notify::{Notification, Notifier};
use crate::storage::GuestStore;

/// What readers see of the favorites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritesSnapshot {
    pub favorites: Favorites,
    pub state: HydrationState,
}

/// A toggle applied locally and awaiting server confirmation.
///
/// Holds the set as it was before the toggle. [`Self::commit`] discards it,
/// [`Self::revert`] puts it back.
#[derive(Debug)]
#[must_use = "an optimistic toggle must be committed or reverted"]
pub struct OptimisticToggle {
    previous: Favorites,
    product_id: ProductId,
    now_favorite: bool,
}

impl OptimisticToggle {
    /// Toggle `product` in `favorites`, remembering the previous set.
    pub fn apply(favorites: &mut Favorites, product: &Product) -> Self {
        let previous = favorites.clone();
        let now_favorite = favorites.toggle(product);
        Self {
            previous,
            product_id: product.id.clone(),
            now_favorite,
        }
    }

    /// Whether the product is a favorite after the toggle.
    #[must_use]
    pub const fn now_favorite(&self) -> bool {
        self.now_favorite
    }

    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Keep the toggled state.
    pub fn commit(self) -> bool {
        self.now_favorite
    }

    /// Restore the pre-toggle state.
    pub fn revert(self, favorites: &mut Favorites) {
        *favorites = self.previous;
    }
}

/// Owns the favorites set.
pub struct FavoritesEngine {
    api: Arc<dyn ShopApi>,
    store: GuestStore,
    notifier: Arc<dyn Notifier>,
    favorites: Favorites,
    state: HydrationState,
    authenticated: bool,
    snapshots: watch::Sender<FavoritesSnapshot>,
}

impl FavoritesEngine {
    pub fn new(api: Arc<dyn ShopApi>, store: GuestStore, notifier: Arc<dyn Notifier>) -> Self {
        let (snapshots, _) = watch::channel(FavoritesSnapshot::default());
        Self {
            api,
            store,
            notifier,
            favorites: Favorites::new(),
            state: HydrationState::Uninitialized,
            authenticated: false,
            snapshots,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FavoritesSnapshot> {
        self.snapshots.subscribe()
    }

    #[must_use]
    pub const fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    #[must_use]
    pub fn is_favorite(&self, id: &ProductId) -> bool {
        self.favorites.contains(id)
    }

    #[must_use]
    pub const fn state(&self) -> HydrationState {
        self.state
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Mark a restored session as authenticated. Only meaningful before
    /// [`Self::init`].
    pub const fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// Load favorites from local storage (guest) or the server (authenticated).
    #[instrument(skip(self), fields(authenticated = self.authenticated))]
    pub async fn init(&mut self) {
        self.state = HydrationState::Loading;
        self.publish();

        if self.authenticated {
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Initial favorites load failed");
            }
        } else {
            self.favorites = self.store.load_favorites();
        }

        self.state = HydrationState::Ready;
        self.publish();
    }

    /// Replace local favorites with the server's.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` if the fetch fails; local state is kept.
    pub async fn refresh(&mut self) -> Result<()> {
        let products = self.api.favorites().await?;
        self.favorites = products.into_iter().collect();
        debug!(count = self.favorites.len(), "Favorites refreshed from server");
        self.publish();
        Ok(())
    }

    /// Flip a product in or out of favorites. Returns whether it is now a
    /// favorite.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` if the server rejects an authenticated
    /// toggle; the previous set is restored and an error notification sent.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn toggle(&mut self, product: &Product) -> Result<bool> {
        if !self.authenticated {
            let now_favorite = self.favorites.toggle(product);
            if let Err(e) = self.store.save_favorites(&self.favorites) {
                warn!(error = %e, "Failed to persist guest favorites");
            }
            self.publish();
            return Ok(now_favorite);
        }

        let toggle = OptimisticToggle::apply(&mut self.favorites, product);
        self.publish();

        match self.api.toggle_favorite(&product.id).await {
            Ok(()) => Ok(toggle.commit()),
            Err(e) => {
                warn!(product_id = %toggle.product_id(), error = %e, "Favorite toggle rejected, reverting");
                toggle.revert(&mut self.favorites);
                self.publish();
                self.notifier
                    .notify(Notification::error("Could not update favorites. Please try again."));
                Err(e.into())
            }
        }
    }

    /// Send guest favorites to the account. Returns whether a merge happened.
    ///
    /// Nothing is sent when there are no guest favorites.
    ///
    /// # Errors
    ///
    /// `StoreError::MergeFailed` if the server rejects the merge. Guest
    /// favorites stay in local storage for a later retry.
    #[instrument(skip(self))]
    pub async fn merge_on_login(&mut self) -> Result<bool> {
        let guest = self.store.load_favorites();
        if guest.is_empty() {
            return Ok(false);
        }

        let products = match self.api.merge_favorites(&guest.ids()).await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "Favorites merge failed, guest favorites kept");
                self.notifier.notify(Notification::error(
                    "Could not merge your saved favorites. They will be merged when you retry.",
                ));
                return Err(StoreError::MergeFailed(e));
            }
        };

        self.favorites = products.into_iter().collect();
        if let Err(e) = self.store.clear_favorites() {
            warn!(error = %e, "Failed to clear merged guest favorites");
        }
        info!(merged = guest.len(), total = self.favorites.len(), "Guest favorites merged");
        self.publish();
        Ok(true)
    }

    /// Guest-to-authenticated transition: merge guest favorites if there are
    /// any, otherwise load the account's favorites.
    ///
    /// # Errors
    ///
    /// See [`Self::merge_on_login`] and [`Self::refresh`].
    pub async fn on_login(&mut self) -> Result<()> {
        self.authenticated = true;
        let result = match self.merge_on_login().await {
            Ok(true) => Ok(()),
            Ok(false) => self.refresh().await,
            Err(e) => Err(e),
        };
        self.state = HydrationState::Ready;
        self.publish();
        result
    }

    /// Authenticated-to-guest transition: fall back to whatever guest
    /// favorites are stored locally.
    pub fn on_logout(&mut self) {
        self.authenticated = false;
        self.favorites = self.store.load_favorites();
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(FavoritesSnapshot {
            favorites: self.favorites.clone(),
            state: self.state,
        });
    }
}
