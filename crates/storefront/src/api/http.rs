//! `reqwest` implementation of [`ShopApi`].
//!
//! Products are cached for the configured TTL for catalog browsing. Stock
//! checks go through [`ShopApi::product`], which always hits the network and
//! refreshes the cached entry.

use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use moka::future::Cache;
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use shopkeep_core::{CartLine, Product, ProductId};
use tracing::{debug, instrument};
use url::Url;

use crate::analytics::{self, CounterEvent};
use crate::config::ClientConfig;

use super::types::{
    ApiErrorBody, CartResponse, FavoritesPayload, MergeFavoritesRequest, ReplaceCartRequest,
    ServerCartLine,
};
use super::{ApiError, ShopApi};

const REQUEST_ID_HEADER: &str = "X-Request-Id";
const CACHE_CAPACITY: u64 = 1000;

// =============================================================================
// HttpShopApi
// =============================================================================

/// Client for the storefront REST API.
///
/// Cheaply cloneable; clones share the connection pool, the bearer token and
/// the catalog cache.
#[derive(Clone)]
pub struct HttpShopApi {
    inner: Arc<HttpShopApiInner>,
}

struct HttpShopApiInner {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
    cache: Cache<ProductId, Product>,
}

impl HttpShopApi {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shopkeep/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(HttpShopApiInner {
                client,
                base_url: config.api_url.clone(),
                token: RwLock::new(config.api_token.clone()),
                cache,
            }),
        })
    }

    /// Whether a bearer token is currently set.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner.token.read().is_some()
    }

    /// Product for display, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist, or any
    /// transport error.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn cached_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        if let Some(product) = self.inner.cache.get(id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        self.product(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {id}")))
    }

    /// Open the live analytics counter feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial request fails.
    #[instrument(skip(self))]
    pub async fn live_counters(
        &self,
    ) -> Result<impl Stream<Item = Result<CounterEvent, ApiError>>, ApiError> {
        let request = self
            .request(Method::GET, &["api", "analytics", "live"])?
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let response = check_status(request.send().await?).await?;
        Ok(analytics::counter_stream(response))
    }

    // =========================================================================
    // Request helpers
    // =========================================================================

    /// Resolve path segments against the base URL, escaping each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Parse("API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(%method, %url, %request_id, "API request");

        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id);

        if let Some(token) = self.inner.token.read().as_ref() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        Ok(builder)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            ApiError::Parse(e.to_string())
        })
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        check_status(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl ShopApi for HttpShopApi {
    fn set_token(&self, token: Option<SecretString>) {
        *self.inner.token.write() = token;
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: &ProductId) -> Result<Option<Product>, ApiError> {
        let request = self.request(Method::GET, &["api", "products", id.as_str()])?;
        match self.send_json::<Product>(request).await {
            Ok(product) => {
                self.inner.cache.insert(id.clone(), product.clone()).await;
                Ok(Some(product))
            }
            Err(ApiError::NotFound(_)) => {
                self.inner.cache.invalidate(id).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn cart(&self) -> Result<Vec<ServerCartLine>, ApiError> {
        let request = self.request(Method::GET, &["api", "cart"])?;
        let response: CartResponse = self.send_json(request).await?;
        Ok(response.items)
    }

    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    async fn replace_cart(&self, lines: &[CartLine]) -> Result<(), ApiError> {
        let request = self
            .request(Method::PUT, &["api", "cart"])?
            .json(&ReplaceCartRequest { items: lines });
        self.send_empty(request).await
    }

    #[instrument(skip(self))]
    async fn favorites(&self) -> Result<Vec<Product>, ApiError> {
        let request = self.request(Method::GET, &["api", "favorites"])?;
        let payload: FavoritesPayload = self.send_json(request).await?;
        Ok(payload.into_products())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn toggle_favorite(&self, id: &ProductId) -> Result<(), ApiError> {
        let request = self.request(Method::PATCH, &["api", "favorites", id.as_str(), "toggle"])?;
        self.send_empty(request).await
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn merge_favorites(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApiError> {
        let request = self
            .request(Method::POST, &["api", "favorites", "merge"])?
            .json(&MergeFavoritesRequest {
                guest_favorites: ids,
            });
        let payload: FavoritesPayload = self.send_json(request).await?;
        Ok(payload.into_products())
    }
}

/// Map non-success statuses onto `ApiError`.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ApiError::RateLimited(retry_after));
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        _ => {
            tracing::warn!(status = %status, message = %message, "API returned non-success status");
            ApiError::Api {
                status: status.as_u16(),
                message,
            }
        }
    })
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or_else(|| body.chars().take(200).collect())
}
