//! Engine-boundary error type.
//!
//! Server communication failures are normally absorbed by the engines and
//! turned into notifications or log lines. The variants here are what reaches
//! callers: rejected user operations and failed login merges.

use shopkeep_core::ProductId;
use thiserror::Error;

use crate::api::ApiError;

/// Errors returned by cart and favorites operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Product has no stock at all.
    #[error("{name} is out of stock")]
    OutOfStock { id: ProductId, name: String },

    /// Requested quantity is more than the available stock.
    #[error("Only {available} of {name} available (requested {requested})")]
    ExceedsStock {
        id: ProductId,
        name: String,
        requested: u32,
        available: i64,
    },

    /// Quantity must be at least one.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// No cart line for this product.
    #[error("Not in cart: {0}")]
    NotInCart(ProductId),

    /// Login-time merge failed; guest data was kept for a retry.
    #[error("Merge failed: {0}")]
    MergeFailed(#[source] ApiError),

    /// Server call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl StoreError {
    /// Whether the error is a rejected user operation rather than a failure.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::OutOfStock { .. }
                | Self::ExceedsStock { .. }
                | Self::InvalidQuantity(_)
                | Self::NotInCart(_)
        )
    }
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;
