//! Cart engine and its helpers.
//!
//! - [`CartEngine`]: single-writer cart state, persistence and login merge
//! - [`StockValidator`]: concurrent live-stock checks
//! - [`merge_carts`]: the guest-into-account merge rule
//! - [`CartPusher`]: ordered background pushes to `PUT /api/cart`

mod engine;
mod merge;
mod push;
mod validator;

pub use engine::{CartEngine, CartSnapshot, CheckoutHandoff};
pub use merge::{MergeOutcome, ReducedLine, merge_carts};
pub use push::CartPusher;
pub use validator::StockValidator;
