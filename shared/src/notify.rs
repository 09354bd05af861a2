//! Notification recipient resolution
//!
//! Pure resolution of who receives a report. The dispatcher in the backend
//! owns the actual send; configuration arrives as an explicit
//! [`NotificationSettings`] value rather than a global settings lookup.

use serde::{Deserialize, Serialize};

use crate::models::User;

/// Toggles for outbound notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Master switch. When off, recipients are still resolved and logged
    /// but nothing is sent.
    pub enabled: bool,
    /// Notify every user in the administrators role.
    pub notify_administrators: bool,
    /// Notify the user whose account the event concerns.
    pub notify_requester: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            notify_administrators: true,
            notify_requester: true,
        }
    }
}

/// Recipients for a stock-take report: (administrators if configured) ∪
/// (the requester if configured), deduplicated, empty addresses skipped.
pub fn stock_take_recipients(
    administrators: &[User],
    requester: &User,
    settings: &NotificationSettings,
) -> Vec<String> {
    let mut recipients = Vec::new();
    if settings.notify_administrators {
        for admin in administrators {
            push_unique(&mut recipients, &admin.email);
        }
    }
    if settings.notify_requester {
        push_unique(&mut recipients, &requester.email);
    }
    recipients
}

/// Recipients for a transfer notification. Same resolution as a stock-take
/// report, except an administrator performing the transfer themselves is not
/// notified about their own edit.
pub fn transfer_recipients(
    administrators: &[User],
    requester: &User,
    settings: &NotificationSettings,
) -> Vec<String> {
    let mut recipients = stock_take_recipients(administrators, requester, settings);
    if requester.is_administrator() {
        recipients.retain(|email| email != &requester.email);
    }
    recipients
}

fn push_unique(recipients: &mut Vec<String>, email: &str) {
    if email.is_empty() || recipients.iter().any(|existing| existing == email) {
        return;
    }
    recipients.push(email.to_string());
}
