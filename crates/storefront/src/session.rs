//! Authentication-aware wiring of the cart and favorites engines.
//!
//! [`ShopSession`] owns both engines and the API handle, and is the only
//! place that changes authentication. Login runs the guest merge exactly once
//! per guest-to-authenticated transition; logging in again while already
//! authenticated only replaces the token.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, instrument};

use crate::api::ShopApi;
use crate::cart::CartEngine;
use crate::error::Result;
use crate::favorites::FavoritesEngine;
use crate::notify::Notifier;
use crate::storage::GuestStore;

/// A shopper's session: cart, favorites and credentials.
pub struct ShopSession {
    api: Arc<dyn ShopApi>,
    cart: CartEngine,
    favorites: FavoritesEngine,
    authenticated: bool,
}

impl ShopSession {
    /// Create a guest session. Must be called inside a Tokio runtime.
    pub fn new(api: Arc<dyn ShopApi>, store: GuestStore, notifier: Arc<dyn Notifier>) -> Self {
        let cart = CartEngine::new(api.clone(), store.clone(), notifier.clone());
        let favorites = FavoritesEngine::new(api.clone(), store, notifier);
        Self {
            api,
            cart,
            favorites,
            authenticated: false,
        }
    }

    /// Hydrate both engines.
    ///
    /// A `token` resumes an authenticated session without merging; the guest
    /// data was already merged when that session logged in.
    #[instrument(skip_all, fields(authenticated = token.is_some()))]
    pub async fn start(&mut self, token: Option<SecretString>) {
        self.authenticated = token.is_some();
        self.api.set_token(token);
        self.cart.set_authenticated(self.authenticated);
        self.favorites.set_authenticated(self.authenticated);

        self.cart.init().await;
        self.favorites.init().await;
    }

    /// Authenticate and merge guest data into the account.
    ///
    /// Both merges are attempted even if the first fails.
    ///
    /// # Errors
    ///
    /// Returns the first merge failure. The session is authenticated either
    /// way; [`Self::retry_merge`] finishes a failed merge.
    #[instrument(skip_all)]
    pub async fn login(&mut self, token: SecretString) -> Result<()> {
        self.api.set_token(Some(token));
        if self.authenticated {
            info!("Token replaced on authenticated session");
            return Ok(());
        }
        self.authenticated = true;

        let cart = self.cart.on_login().await;
        let favorites = self.favorites.on_login().await;
        info!(
            cart_merged = cart.is_ok(),
            favorites_merged = favorites.is_ok(),
            "Logged in"
        );
        cart.and(favorites)
    }

    /// Retry merges that failed during [`Self::login`].
    ///
    /// # Errors
    ///
    /// Returns the first merge failure.
    pub async fn retry_merge(&mut self) -> Result<()> {
        let cart = self.cart.retry_merge().await;
        let favorites = if self.authenticated {
            self.favorites.merge_on_login().await.map(|_| ())
        } else {
            Ok(())
        };
        cart.and(favorites)
    }

    /// Flush pending cart pushes, drop credentials and return to guest state.
    #[instrument(skip_all)]
    pub async fn logout(&mut self) {
        self.cart.flush().await;
        self.api.set_token(None);
        self.authenticated = false;
        self.cart.on_logout();
        self.favorites.on_logout();
        info!("Logged out");
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    #[must_use]
    pub const fn cart(&self) -> &CartEngine {
        &self.cart
    }

    pub const fn cart_mut(&mut self) -> &mut CartEngine {
        &mut self.cart
    }

    #[must_use]
    pub const fn favorites(&self) -> &FavoritesEngine {
        &self.favorites
    }

    pub const fn favorites_mut(&mut self) -> &mut FavoritesEngine {
        &mut self.favorites
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::notify::CollectingNotifier;
    use crate::storage::{MemoryStore, StoreScope};
    use crate::testing::{StubApi, product};
    use shopkeep_core::{Cart, CartItem, ProductId};

    fn session() -> (StubApi, GuestStore, ShopSession) {
        let api = StubApi::new();
        let store = GuestStore::new(Arc::new(MemoryStore::new()), chrono::Duration::days(30));
        let session = ShopSession::new(
            Arc::new(api.clone()),
            store.clone(),
            Arc::new(CollectingNotifier::new()),
        );
        (api, store, session)
    }

    #[tokio::test]
    async fn test_login_merges_once() {
        let (api, store, mut session) = session();
        let p = product("p", 10);
        api.put_product(p.clone());
        store
            .save_cart(
                &Cart::from_items(vec![CartItem::from_product(&p, 2)]),
                StoreScope::Guest,
            )
            .unwrap();

        session.start(None).await;
        session.login(SecretString::from("a")).await.unwrap();
        session.login(SecretString::from("b")).await.unwrap();
        session.cart_mut().flush().await;

        assert!(session.is_authenticated());
        assert!(api.is_authenticated());
        assert_eq!(session.cart().cart().quantity_of(&ProductId::new("p")), 2);
        assert_eq!(api.server_quantities(), vec![("p".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_start_with_token_loads_server_state() {
        let (api, _, mut session) = session();
        let p = product("p", 10);
        api.put_product(p.clone());
        api.set_server_cart(vec![(p.clone(), 3)]);
        api.set_favorites(vec![p]);

        session.start(Some(SecretString::from("t"))).await;

        assert!(session.cart().is_hydrated());
        assert_eq!(session.cart().cart().quantity_of(&ProductId::new("p")), 3);
        assert!(session.favorites().is_favorite(&ProductId::new("p")));
    }

    #[tokio::test]
    async fn test_logout_returns_to_guest() {
        let (api, _, mut session) = session();
        let p = product("p", 10);
        api.put_product(p.clone());

        session.start(Some(SecretString::from("t"))).await;
        session.cart_mut().add_to_cart(&p, 1).unwrap();
        session.logout().await;

        assert!(!session.is_authenticated());
        assert!(!api.is_authenticated());
        assert!(session.cart().cart().is_empty());
        assert_eq!(api.server_quantities(), vec![("p".to_string(), 1)]);
    }
}
