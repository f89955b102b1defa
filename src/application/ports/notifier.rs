//! Notification port interface

use async_trait::async_trait;
use thiserror::Error;

/// Notification errors
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Failed to show notification: {0}")]
    SendFailed(String),
}

/// Notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

impl NotificationKind {
    /// Get the freedesktop icon name
    pub const fn icon_name(&self) -> &'static str {
        match self {
            Self::Info => "dialog-information",
            Self::Success => "dialog-ok",
            Self::Error => "dialog-error",
        }
    }
}

/// Port for user-facing alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, kind: NotificationKind, message: &str)
        -> Result<(), NotificationError>;
}
