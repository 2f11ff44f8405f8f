//! Price arithmetic using decimal amounts.
//!
//! The backend sends a list price and an absolute discount per product. The
//! effective price a shopper pays is derived here, never trusted from the wire.

use rust_decimal::Decimal;

/// Effective unit price after an absolute discount.
///
/// Returns `price - discount` when `discount` is positive, otherwise `price`.
#[must_use]
pub fn final_price(price: Decimal, discount: Decimal) -> Decimal {
    if discount > Decimal::ZERO {
        price - discount
    } else {
        price
    }
}

/// Format an amount for display (e.g., `$19.99`).
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}
