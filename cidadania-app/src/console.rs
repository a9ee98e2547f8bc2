//! Console notification surface and system clipboard.

use cidadania_core::{Clipboard, CoreError, Notification, NotificationLevel, Notifier};
use tracing::debug;

const LOG_TARGET: &str = "cidadania::notify";

/// Prints notifications as one-line toasts
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => {
                debug!(target: LOG_TARGET, "Success toast: {}", notification.message);
                println!("✓ {}", notification.message);
            }
            NotificationLevel::Error => {
                debug!(target: LOG_TARGET, "Error toast: {}", notification.message);
                println!("✗ {}", notification.message);
            }
        }
    }
}

/// OS clipboard through `arboard`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy_text(&self, text: &str) -> Result<(), CoreError> {
        arboard::Clipboard::new()
            .and_then(|mut clipboard| clipboard.set_text(text.to_string()))
            .map_err(|e| CoreError::IoError(std::io::Error::other(e.to_string())))
    }
}
