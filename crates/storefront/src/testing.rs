//! In-memory [`ShopApi`] for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use secrecy::SecretString;
use shopkeep_core::{CartLine, Product, ProductId};

use crate::api::{ApiError, ServerCartLine, ShopApi};

pub fn product(id: &str, stock: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: Decimal::new(1000, 2),
        discount_price: Decimal::ZERO,
        count_in_stock: stock,
        images: vec![],
        brand: String::new(),
        category: String::new(),
        specs: serde_json::Map::new(),
    }
}

#[derive(Default)]
struct StubState {
    products: HashMap<ProductId, Product>,
    server_cart: Vec<ServerCartLine>,
    favorites: Vec<Product>,
    pushes: Vec<Vec<CartLine>>,
    merges: Vec<Vec<ProductId>>,
    fail_products: bool,
    fail_cart: bool,
    fail_push: bool,
    fail_favorites: bool,
    authenticated: bool,
}

#[derive(Clone, Default)]
pub struct StubApi {
    state: Arc<Mutex<StubState>>,
}

fn unavailable() -> ApiError {
    ApiError::Api {
        status: 503,
        message: "unavailable".to_string(),
    }
}

impl StubApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_product(&self, product: Product) {
        self.state.lock().products.insert(product.id.clone(), product);
    }

    pub fn set_server_cart(&self, lines: Vec<(Product, u32)>) {
        self.state.lock().server_cart = lines
            .into_iter()
            .map(|(product, quantity)| ServerCartLine { product, quantity })
            .collect();
    }

    pub fn set_favorites(&self, favorites: Vec<Product>) {
        self.state.lock().favorites = favorites;
    }

    pub fn fail_products(&self, fail: bool) {
        self.state.lock().fail_products = fail;
    }

    pub fn fail_cart(&self, fail: bool) {
        self.state.lock().fail_cart = fail;
    }

    pub fn fail_push(&self, fail: bool) {
        self.state.lock().fail_push = fail;
    }

    pub fn fail_favorites(&self, fail: bool) {
        self.state.lock().fail_favorites = fail;
    }

    pub fn pushes(&self) -> Vec<Vec<CartLine>> {
        self.state.lock().pushes.clone()
    }

    pub fn merges(&self) -> Vec<Vec<ProductId>> {
        self.state.lock().merges.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().authenticated
    }

    pub fn server_quantities(&self) -> Vec<(String, u32)> {
        self.state
            .lock()
            .server_cart
            .iter()
            .map(|line| (line.product.id.to_string(), line.quantity))
            .collect()
    }

    pub fn favorite_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .favorites
            .iter()
            .map(|p| p.id.to_string())
            .collect()
    }
}

#[async_trait]
impl ShopApi for StubApi {
    fn set_token(&self, token: Option<SecretString>) {
        self.state.lock().authenticated = token.is_some();
    }

    async fn product(&self, id: &ProductId) -> Result<Option<Product>, ApiError> {
        let state = self.state.lock();
        if state.fail_products {
            return Err(unavailable());
        }
        Ok(state.products.get(id).cloned())
    }

    async fn cart(&self) -> Result<Vec<ServerCartLine>, ApiError> {
        let state = self.state.lock();
        if state.fail_cart {
            return Err(unavailable());
        }
        Ok(state.server_cart.clone())
    }

    async fn replace_cart(&self, lines: &[CartLine]) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        if state.fail_push {
            return Err(unavailable());
        }
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
        if state.fail_favorites {
            return Err(unavailable());
        }
        Ok(state.favorites.clone())
    }

    async fn toggle_favorite(&self, id: &ProductId) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        if state.fail_favorites {
            return Err(unavailable());
        }
        if let Some(pos) = state.favorites.iter().position(|p| &p.id == id) {
            state.favorites.remove(pos);
        } else if let Some(product) = state.products.get(id).cloned() {
            state.favorites.push(product);
        }
        Ok(())
    }

    async fn merge_favorites(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApiError> {
        let mut state = self.state.lock();
        if state.fail_favorites {
            return Err(unavailable());
        }
        state.merges.push(ids.to_vec());
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
