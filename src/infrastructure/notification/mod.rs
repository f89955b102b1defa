//! Notification adapters

pub mod console;
pub mod notify_rust;

pub use console::ConsoleNotifier;
pub use notify_rust::NotifyRustNotifier;
