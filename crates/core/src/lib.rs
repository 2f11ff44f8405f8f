//! Shopkeep Core - Shared types library.
//!
//! This crate provides common types used across all Shopkeep components:
//! - `storefront` - Client-side cart, favorites and analytics engines
//! - `cli` - Command-line harness driving the engines against a live API
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no persistence. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product ids, prices, products, cart lines, favorites and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
