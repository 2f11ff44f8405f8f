//! Catalog lookups.

use shopkeep_core::ProductId;

use super::Context;
use crate::error::CliError;
use crate::output;

/// Show a product, served from the catalog cache when fresh.
///
/// # Errors
///
/// Returns an error if the product does not exist or the request fails.
pub async fn show(ctx: &Context, id: &str) -> Result<(), CliError> {
    let product = ctx.api.cached_product(&ProductId::new(id)).await?;
    output::print_product(&product);
    Ok(())
}
