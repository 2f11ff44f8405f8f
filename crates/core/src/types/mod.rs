//! Core types for Shopkeep.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod favorites;
pub mod id;
pub mod price;
pub mod product;
pub mod status;

pub use cart::{Cart, CartItem, CartLine, CartSummary, ValidationResult};
pub use favorites::{FavoriteItem, Favorites};
pub use id::*;
pub use price::{final_price, format_price};
pub use product::Product;
pub use status::*;
