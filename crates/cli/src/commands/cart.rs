//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! shopkeep cart add 64f1c0a2 -q 2
//! shopkeep cart set 64f1c0a2 1
//! shopkeep cart remove 64f1c0a2
//! shopkeep cart checkout
//! ```

use shopkeep_core::ProductId;

use super::Context;
use crate::error::CliError;
use crate::output;

/// Print the validated cart.
///
/// # Errors
///
/// Infallible today; kept fallible like the other commands.
pub async fn show(ctx: &Context) -> Result<(), CliError> {
    let mut session = ctx.started_session().await;
    ctx.finish(&mut session).await;
    output::print_cart(session.cart().cart());
    Ok(())
}

/// Add a product to the cart, checking its live stock.
///
/// # Errors
///
/// Returns an error if the product cannot be fetched or the stock check
/// rejects the quantity.
pub async fn add(ctx: &Context, id: &str, quantity: u32) -> Result<(), CliError> {
    let product = ctx.live_product(id).await?;
    let mut session = ctx.started_session().await;

    let result = session.cart_mut().add_to_cart(&product, quantity);
    ctx.finish(&mut session).await;
    result?;

    output::print_cart(session.cart().cart());
    Ok(())
}

/// Remove a product from the cart.
///
/// # Errors
///
/// Infallible today; removing an absent product is a no-op.
pub async fn remove(ctx: &Context, id: &str) -> Result<(), CliError> {
    let mut session = ctx.started_session().await;
    if !session.cart_mut().remove_from_cart(&ProductId::new(id)) {
        tracing::info!(product_id = id, "Product was not in the cart");
    }
    ctx.finish(&mut session).await;
    output::print_cart(session.cart().cart());
    Ok(())
}

/// Set the quantity of a cart line.
///
/// # Errors
///
/// Returns an error if the product is not in the cart or the quantity is more
/// than the stock.
pub async fn set(ctx: &Context, id: &str, quantity: u32) -> Result<(), CliError> {
    let mut session = ctx.started_session().await;
    let result = session.cart_mut().update_qty(&ProductId::new(id), quantity);
    ctx.finish(&mut session).await;
    result?;

    output::print_cart(session.cart().cart());
    Ok(())
}

/// Empty the cart, on the server too when logged in.
///
/// # Errors
///
/// Infallible today; kept fallible like the other commands.
pub async fn clear(ctx: &Context) -> Result<(), CliError> {
    let mut session = ctx.started_session().await;
    session.cart_mut().clear_cart(true);
    ctx.finish(&mut session).await;
    output::print_cart(session.cart().cart());
    Ok(())
}

/// Reload the cart from the server.
///
/// # Errors
///
/// `CliError::NotLoggedIn` for guests, or the sync failure.
pub async fn sync(ctx: &Context) -> Result<(), CliError> {
    let mut session = ctx.started_session().await;
    if !session.is_authenticated() {
        return Err(CliError::NotLoggedIn);
    }

    let result = session.cart_mut().sync_with_server(false).await;
    ctx.finish(&mut session).await;
    result?;

    output::print_cart(session.cart().cart());
    Ok(())
}

/// Hand the cart to checkout and clear it locally.
///
/// # Errors
///
/// Infallible today; kept fallible like the other commands.
pub async fn checkout(ctx: &Context) -> Result<(), CliError> {
    let mut session = ctx.started_session().await;
    let handoff = session.cart_mut().begin_checkout();
    ctx.finish(&mut session).await;
    output::print_checkout(&handoff);
    Ok(())
}
