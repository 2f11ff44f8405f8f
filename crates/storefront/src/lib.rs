//! Shopkeep storefront client library.
//!
//! Client-side state for a shopper: a stock-validated cart that survives
//! login, favorites with optimistic server toggles, and the live analytics
//! counter feed. Everything talks to the backend through [`api::ShopApi`].
//!
//! Start with [`session::ShopSession`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod favorites;
pub mod notify;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;
