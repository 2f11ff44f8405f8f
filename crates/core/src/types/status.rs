//! Status enums for client-side state.

use serde::{Deserialize, Serialize};

/// Load lifecycle of a client-side store.
///
/// Consumers must not render store-dependent views before `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HydrationState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

impl HydrationState {
    /// Whether the initial load-and-validate cycle has completed.
    #[must_use]
    pub const fn is_hydrated(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}
