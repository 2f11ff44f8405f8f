//! CLI error type.

use shopkeep_storefront::api::ApiError;
use shopkeep_storefront::config::ConfigError;
use shopkeep_storefront::error::StoreError;
use shopkeep_storefront::storage::StorageError;
use thiserror::Error;

/// Errors that end a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Local storage error: {0}")]
    Storage(#[from] StorageError),

    /// Command requires an authenticated session.
    #[error("Not logged in. Run `shopkeep login --token <TOKEN>` first")]
    NotLoggedIn,
}
