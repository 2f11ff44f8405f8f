//! Favorites commands.

use super::Context;
use crate::error::CliError;
use crate::output;

/// List favorites.
///
/// # Errors
///
/// Infallible today; kept fallible like the other commands.
pub async fn list(ctx: &Context) -> Result<(), CliError> {
    let mut session = ctx.started_session().await;
    ctx.finish(&mut session).await;
    output::print_favorites(session.favorites().favorites());
    Ok(())
}

/// Add or remove a favorite.
///
/// # Errors
///
/// Returns an error if the product cannot be fetched or the server rejects
/// the toggle.
pub async fn toggle(ctx: &Context, id: &str) -> Result<(), CliError> {
    let product = ctx.live_product(id).await?;
    let mut session = ctx.started_session().await;

    let result = session.favorites_mut().toggle(&product).await;
    ctx.finish(&mut session).await;
    let now_favorite = result?;

    output::print_toggle(&product.name, now_favorite);
    Ok(())
}
