//! Console notification adapter
//!
//! Prints alerts to stderr instead of the desktop; used by simulation
//! mode and headless hosts.

use async_trait::async_trait;
use colored::Colorize;

use crate::application::ports::{NotificationError, NotificationKind, Notifier};

/// Notifier that writes to stderr
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        message: &str,
    ) -> Result<(), NotificationError> {
        match kind {
            NotificationKind::Info => eprintln!("{} {}", "ℹ".cyan(), message),
            NotificationKind::Success => eprintln!("{} {}", "✓".green(), message),
            NotificationKind::Error => eprintln!("{} {}", "✗".red(), message),
        }
        Ok(())
    }
}
