//! Storefront REST API access.
//!
//! # Architecture
//!
//! - The backend is the source of truth for products, carts and favorites
//! - Engines depend on the [`ShopApi`] trait, never on HTTP directly
//! - [`HttpShopApi`] is the `reqwest` implementation used in production
//! - Catalog reads are cached in memory via `moka`; stock checks never are
//!
//! # Endpoints
//!
//! | Method | Path | Use |
//! |--------|------|-----|
//! | `GET` | `/api/products/:id` | stock validation, product pages |
//! | `GET` | `/api/cart` | authenticated cart read |
//! | `PUT` | `/api/cart` | authenticated cart overwrite |
//! | `GET` | `/api/favorites` | authenticated favorites read |
//! | `PATCH` | `/api/favorites/:id/toggle` | favorite toggle |
//! | `POST` | `/api/favorites/merge` | merge-on-login |
//! | `GET` | `/api/analytics/live` | live counter feed (SSE) |
//!
//! # Example
//!
//! ```rust,ignore
//! use shopkeep_storefront::api::{HttpShopApi, ShopApi};
//!
//! let api = HttpShopApi::new(&config)?;
//! let product = api.product(&ProductId::new("64f1c0a2")).await?;
//! ```

mod http;
pub mod types;

pub use http::HttpShopApi;
pub use types::*;

use async_trait::async_trait;
use secrecy::SecretString;
use shopkeep_core::{CartLine, Product, ProductId};
use thiserror::Error;

/// Errors that can occur when talking to the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Streaming response broke mid-flight.
    #[error("Stream error: {0}")]
    Stream(String),
}

/// Operations the cart and favorites engines need from the backend.
///
/// Implementations must be cheap to share (`Arc<dyn ShopApi>`).
#[async_trait]
pub trait ShopApi: Send + Sync {
    /// Replace the credentials used for authenticated endpoints.
    fn set_token(&self, token: Option<SecretString>);

    /// Live product record, bypassing any cache. `Ok(None)` when the product
    /// no longer exists.
    async fn product(&self, id: &ProductId) -> Result<Option<Product>, ApiError>;

    /// The authenticated user's server-side cart.
    async fn cart(&self) -> Result<Vec<ServerCartLine>, ApiError>;

    /// Overwrite the server-side cart with the full set of lines.
    async fn replace_cart(&self, lines: &[CartLine]) -> Result<(), ApiError>;

    /// The authenticated user's favorites.
    async fn favorites(&self) -> Result<Vec<Product>, ApiError>;

    /// Flip a favorite on the server.
    async fn toggle_favorite(&self, id: &ProductId) -> Result<(), ApiError>;

    /// Merge guest favorites into the account. Returns the merged favorites.
    async fn merge_favorites(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApiError>;
}
