//! Login and logout.

use secrecy::SecretString;

use super::Context;
use crate::error::CliError;
use crate::output;

/// Log in and merge the guest cart and favorites into the account.
///
/// The token is saved only when both merges succeed, so a failed merge is
/// retried by logging in again. Guest data is kept until then.
///
/// # Errors
///
/// Returns the first merge failure, or an error saving the token.
pub async fn login(ctx: &Context, token: String) -> Result<(), CliError> {
    let token = SecretString::from(token);
    let mut session = ctx.session();
    session.start(None).await;

    let result = session.login(token.clone()).await;
    ctx.finish(&mut session).await;
    result?;

    ctx.save_token(&token)?;
    output::print_cart(session.cart().cart());
    Ok(())
}

/// Log out and forget the saved token.
///
/// # Errors
///
/// Returns an error if the saved token cannot be removed.
pub async fn logout(ctx: &Context) -> Result<(), CliError> {
    let mut session = ctx.started_session().await;
    session.logout().await;
    ctx.finish(&mut session).await;
    ctx.clear_token()?;
    tracing::info!("Session token removed");
    Ok(())
}
