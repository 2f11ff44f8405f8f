//! Integration test support for Shopkeep.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopkeep-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenarios` - cart engine against an in-memory backend
//! - `favorites_scenarios` - favorites engine and login merge
//! - `guest_store` - local persistence on disk
//! - `http_client` - `HttpShopApi` against a local HTTP stub
//!
//! [`FakeShop`] stands in for the backend behind `ShopApi`. [`StubServer`]
//! answers raw HTTP for the tests that exercise the real client.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use secrecy::SecretString;
use shopkeep_core::{CartLine, Product, ProductId};
use shopkeep_storefront::api::{ApiError, ServerCartLine, ShopApi};
use shopkeep_storefront::notify::{CollectingNotifier, Notification};
use shopkeep_storefront::session::ShopSession;
use shopkeep_storefront::storage::{GuestStore, KeyValueStore, MemoryStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// =============================================================================
// Fixtures
// =============================================================================

/// A product priced at $10.00 with the given stock.
#[must_use]
pub fn product(id: &str, stock: i64) -> Product {
    priced(id, stock, Decimal::new(1000, 2), Decimal::ZERO)
}

#[must_use]
pub fn priced(id: &str, stock: i64, price: Decimal, discount_price: Decimal) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price,
        discount_price,
        count_in_stock: stock,
        images: vec![format!("/images/{id}.jpg")],
        brand: "Acme".to_string(),
        category: "general".to_string(),
        specs: serde_json::Map::new(),
    }
}

// =============================================================================
// FakeShop
// =============================================================================

#[derive(Default)]
struct ShopState {
    products: HashMap<ProductId, Product>,
    server_cart: Vec<ServerCartLine>,
    favorites: Vec<Product>,
    pushes: Vec<Vec<CartLine>>,
    favorite_merges: Vec<Vec<ProductId>>,
    cart_fetches: usize,
    offline: bool,
    cart_offline: bool,
    push_delay: Option<Duration>,
    token: Option<String>,
}

/// In-memory backend with switchable failures.
#[derive(Clone, Default)]
pub struct FakeShop {
    state: Arc<Mutex<ShopState>>,
}

fn offline() -> ApiError {
    ApiError::Api {
        status: 503,
        message: "backend offline".to_string(),
    }
}

impl FakeShop {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stock(&self, products: impl IntoIterator<Item = Product>) {
        let mut state = self.state.lock();
        for product in products {
            state.products.insert(product.id.clone(), product);
        }
    }

    pub fn set_stock(&self, id: &str, stock: i64) {
        if let Some(product) = self.state.lock().products.get_mut(&ProductId::new(id)) {
            product.count_in_stock = stock;
        }
    }

    pub fn delist(&self, id: &str) {
        self.state.lock().products.remove(&ProductId::new(id));
    }

    pub fn server_cart(&self, lines: &[(&str, u32)]) {
        let mut state = self.state.lock();
        state.server_cart = lines
            .iter()
            .map(|(id, quantity)| ServerCartLine {
                product: state.products[&ProductId::new(*id)].clone(),
                quantity: *quantity,
            })
            .collect();
    }

    pub fn server_favorites(&self, ids: &[&str]) {
        let mut state = self.state.lock();
        state.favorites = ids
            .iter()
            .map(|id| state.products[&ProductId::new(*id)].clone())
            .collect();
    }

    /// Every call fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Only `GET /api/cart` fails.
    pub fn set_cart_offline(&self, offline: bool) {
        self.state.lock().cart_offline = offline;
    }

    /// Make every cart push take this long.
    pub fn set_push_delay(&self, delay: Duration) {
        self.state.lock().push_delay = Some(delay);
    }

    #[must_use]
    pub fn pushes(&self) -> Vec<Vec<CartLine>> {
        self.state.lock().pushes.clone()
    }

    #[must_use]
    pub fn favorite_merges(&self) -> Vec<Vec<ProductId>> {
        self.state.lock().favorite_merges.clone()
    }

    #[must_use]
    pub fn cart_fetches(&self) -> usize {
        self.state.lock().cart_fetches
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    /// Server cart as `(id, quantity)` pairs.
    #[must_use]
    pub fn server_lines(&self) -> Vec<(String, u32)> {
        self.state
            .lock()
            .server_cart
            .iter()
            .map(|line| (line.product.id.to_string(), line.quantity))
            .collect()
    }

    #[must_use]
    pub fn favorite_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .state
            .lock()
            .favorites
            .iter()
            .map(|p| p.id.to_string())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ShopApi for FakeShop {
    fn set_token(&self, token: Option<SecretString>) {
        use secrecy::ExposeSecret;
        self.state.lock().token = token.map(|t| t.expose_secret().to_string());
    }

    async fn product(&self, id: &ProductId) -> Result<Option<Product>, ApiError> {
        let state = self.state.lock();
        if state.offline {
            return Err(offline());
        }
        Ok(state.products.get(id).cloned())
    }

    async fn cart(&self) -> Result<Vec<ServerCartLine>, ApiError> {
        let mut state = self.state.lock();
        if state.offline || state.cart_offline {
            return Err(offline());
        }
        state.cart_fetches += 1;
        Ok(state.server_cart.clone())
    }

    async fn replace_cart(&self, lines: &[CartLine]) -> Result<(), ApiError> {
        let delay = {
            let state = self.state.lock();
            if state.offline {
                return Err(offline());
            }
            state.push_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.pushes.push(lines.to_vec());
        let server_cart = lines
            .iter()
            .filter_map(|line| {
                state.products.get(&line.product_id).map(|product| ServerCartLine {
                    product: product.clone(),
                    quantity: line.quantity,
                })
            })
            .collect();
        state.server_cart = server_cart;
        Ok(())
    }

    async fn favorites(&self) -> Result<Vec<Product>, ApiError> {
        let state = self.state.lock();
        if state.offline {
            return Err(offline());
        }
        Ok(state.favorites.clone())
    }

    async fn toggle_favorite(&self, id: &ProductId) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(offline());
        }
        if let Some(pos) = state.favorites.iter().position(|p| &p.id == id) {
            state.favorites.remove(pos);
            return Ok(());
        }
        match state.products.get(id).cloned() {
            Some(product) => {
                state.favorites.push(product);
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("Product not found: {id}"))),
        }
    }

    async fn merge_favorites(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApiError> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(offline());
        }
        state.favorite_merges.push(ids.to_vec());
        for id in ids {
            if state.favorites.iter().any(|p| &p.id == id) {
                continue;
            }
            if let Some(product) = state.products.get(id).cloned() {
                state.favorites.push(product);
            }
        }
        Ok(state.favorites.clone())
    }
}

// =============================================================================
// Shopper
// =============================================================================

/// One device: a local store that outlives sessions, plus a notifier.
pub struct Shopper {
    pub shop: FakeShop,
    pub backend: Arc<dyn KeyValueStore>,
    pub notifier: CollectingNotifier,
}

impl Shopper {
    #[must_use]
    pub fn new(shop: &FakeShop) -> Self {
        Self::with_backend(shop, Arc::new(MemoryStore::new()))
    }

    #[must_use]
    pub fn with_backend(shop: &FakeShop, backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            shop: shop.clone(),
            backend,
            notifier: CollectingNotifier::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> GuestStore {
        GuestStore::new(self.backend.clone(), chrono::Duration::days(30))
    }

    /// A fresh, not yet started session on this device.
    #[must_use]
    pub fn session(&self) -> ShopSession {
        ShopSession::new(
            Arc::new(self.shop.clone()),
            self.store(),
            Arc::new(self.notifier.clone()),
        )
    }

    /// A started guest session.
    pub async fn guest(&self) -> ShopSession {
        let mut session = self.session();
        session.start(None).await;
        session
    }

    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifier.take()
    }
}

// =============================================================================
// StubServer
// =============================================================================

/// A request as seen by [`StubServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Canned response for one `METHOD /path`.
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub extra_headers: Vec<(String, String)>,
    pub body: String,
}

impl StubResponse {
    #[must_use]
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            extra_headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[must_use]
    pub fn event_stream(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            extra_headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.extra_headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Minimal HTTP/1.1 server answering from a route table.
///
/// One request per connection; unknown routes get a JSON 404.
pub struct StubServer {
    pub base_url: url::Url,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub async fn start(routes: Vec<(&str, &str, StubResponse)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<HashMap<(String, String), StubResponse>> = Arc::new(
            routes
                .into_iter()
                .map(|(method, path, response)| ((method.to_string(), path.to_string()), response))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let Some(request) = read_request(&mut socket).await else {
                        return;
                    };
                    let response = routes
                        .get(&(request.method.clone(), request.path.clone()))
                        .cloned()
                        .unwrap_or_else(|| {
                            StubResponse::json(404, serde_json::json!({"message": "Not found"}))
                        });
                    recorded.lock().push(request);
                    let _ = socket.write_all(render(&response).as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url: url::Url::parse(&format!("http://{addr}/")).unwrap(),
            requests,
        }
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        raw.extend_from_slice(&chunk[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = raw[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn render(response: &StubResponse) -> String {
    let mut out = format!(
        "HTTP/1.1 {} Stub\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n",
        response.status,
        response.content_type,
        response.body.len()
    );
    for (name, value) in &response.extra_headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");
    out.push_str(&response.body);
    out
}
