//! Live analytics feed.

use futures::StreamExt;
use shopkeep_storefront::analytics::LiveCounters;

use super::Context;
use crate::error::CliError;
use crate::output;

/// Print counters after every update until the feed ends, `limit` updates
/// have arrived or Ctrl-C is pressed.
///
/// # Errors
///
/// Returns an error if the feed cannot be opened.
pub async fn follow(ctx: &Context, limit: Option<usize>) -> Result<(), CliError> {
    let stream = ctx.api.live_counters().await?;
    let mut stream = std::pin::pin!(stream);
    let mut counters = LiveCounters::new();
    let mut seen = 0;

    loop {
        let next = tokio::select! {
            next = stream.next() => next,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        };

        match next {
            Some(Ok(event)) => {
                counters.apply(event);
                output::print_counters(&counters);
                seen += 1;
                if limit.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            Some(Err(e)) => tracing::warn!(error = %e, "Skipping bad counter event"),
            None => {
                tracing::info!("Live feed closed by server");
                break;
            }
        }
    }
    Ok(())
}
