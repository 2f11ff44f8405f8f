//! Command implementations.
//!
//! Each command builds a [`ShopSession`] from [`Context`], runs one operation
//! and flushes pending cart pushes before printing results.

pub mod auth;
pub mod cart;
pub mod favorites;
pub mod live;
pub mod product;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use shopkeep_core::{Product, ProductId};
use shopkeep_storefront::api::{ApiError, HttpShopApi, ShopApi};
use shopkeep_storefront::config::ClientConfig;
use shopkeep_storefront::notify::CollectingNotifier;
use shopkeep_storefront::session::ShopSession;
use shopkeep_storefront::storage::{FileStore, GuestStore, KeyValueStore};

use crate::error::CliError;
use crate::output;

/// Storage key for the saved session token.
const SESSION_KEY: &str = "shopkeep.session";

/// Everything a command needs.
pub struct Context {
    pub config: ClientConfig,
    pub api: HttpShopApi,
    backend: Arc<FileStore>,
    notifier: CollectingNotifier,
}

impl Context {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, CliError> {
        let api = HttpShopApi::new(&config)?;
        let backend = Arc::new(FileStore::new(config.data_dir.clone()));
        Ok(Self {
            config,
            api,
            backend,
            notifier: CollectingNotifier::new(),
        })
    }

    /// Token for this run: `SHOPKEEP_API_TOKEN` wins over a saved login.
    pub fn token(&self) -> Option<SecretString> {
        if let Some(token) = &self.config.api_token {
            return Some(token.clone());
        }
        match self.backend.get(SESSION_KEY) {
            Ok(token) => token.map(SecretString::from),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read saved session");
                None
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the data directory cannot be written.
    pub fn save_token(&self, token: &SecretString) -> Result<(), CliError> {
        self.backend.set(SESSION_KEY, token.expose_secret())?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the data directory cannot be written.
    pub fn clear_token(&self) -> Result<(), CliError> {
        self.backend.remove(SESSION_KEY)?;
        Ok(())
    }

    /// A new guest session that has not been started.
    pub fn session(&self) -> ShopSession {
        let store = GuestStore::new(self.backend.clone(), self.config.guest_max_age);
        ShopSession::new(
            Arc::new(self.api.clone()),
            store,
            Arc::new(self.notifier.clone()),
        )
    }

    /// A session hydrated with the current token, if any.
    pub async fn started_session(&self) -> ShopSession {
        let mut session = self.session();
        session.start(self.token()).await;
        session
    }

    /// Live product record for a cart or favorites operation.
    ///
    /// # Errors
    ///
    /// `ApiError::NotFound` if the product does not exist.
    pub async fn live_product(&self, id: &str) -> Result<Product, CliError> {
        let id = ProductId::new(id);
        self.api
            .product(&id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {id}")).into())
    }

    /// Flush pending pushes and print the notifications collected so far.
    pub async fn finish(&self, session: &mut ShopSession) {
        session.cart_mut().flush().await;
        output::print_notifications(&self.notifier.take());
    }
}
