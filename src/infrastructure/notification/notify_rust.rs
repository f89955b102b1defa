//! Cross-platform notification adapter using notify-rust
//!
//! Works on Windows, macOS, and Linux. The vibrate preference from the
//! engine config has no desktop equivalent and is ignored here.

use async_trait::async_trait;

use crate::application::ports::{NotificationError, NotificationKind, Notifier};

/// Cross-platform notifier using notify-rust
pub struct NotifyRustNotifier {
    /// Application name for notifications
    app_name: String,
}

impl NotifyRustNotifier {
    /// Create a new notify-rust notifier
    pub fn new() -> Self {
        Self {
            app_name: "ZoneRecorder".to_string(),
        }
    }

    /// Create with custom app name
    pub fn with_app_name(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl Default for NotifyRustNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for NotifyRustNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        message: &str,
    ) -> Result<(), NotificationError> {
        let message = message.to_owned();
        let app_name = self.app_name.clone();
        let icon_name = kind.icon_name().to_string();

        // notify-rust operations can block, so run in spawn_blocking
        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .appname(&app_name)
                .summary(&app_name)
                .body(&message)
                .icon(&icon_name)
                .show()
                .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

            Ok(())
        })
        .await
        .map_err(|e| NotificationError::SendFailed(format!("Task join error: {}", e)))?
    }
}
