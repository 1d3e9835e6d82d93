//! Outbound alert notifications

pub mod smtp;

use crate::config::NotificationConfig;
use crate::error::Result;
use std::sync::Mutex;
use tracing::{debug, warn};

pub use smtp::SmtpNotifier;

/// Subject line for every alert
pub const NOTIFICATION_SUBJECT: &str = "Alert! file changed found!";

/// Alert payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Plain-text body
    pub text: String,
    /// Rich body for transports that can render markup
    pub html: Option<String>,
}

impl Notification {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: None,
        }
    }
}

/// Delivery capability for alerts. Sends are synchronous.
pub trait Notifier {
    fn send(&self, recipients: &[String], subject: &str, notification: &Notification) -> Result<()>;
}

/// Used when no transport is configured; alerts only reach the log.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, recipients: &[String], subject: &str, _notification: &Notification) -> Result<()> {
        warn!(
            "Notification transport not configured, '{}' not delivered to {} recipient(s)",
            subject,
            recipients.len()
        );
        Ok(())
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Vec<String>, String, Notification)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Vec<String>, String, Notification)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, recipients: &[String], subject: &str, notification: &Notification) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((recipients.to_vec(), subject.to_string(), notification.clone()));
        }
        Ok(())
    }
}

/// Build the notifier for a configuration
pub fn from_config(config: &NotificationConfig) -> Box<dyn Notifier> {
    if config.is_configured() {
        debug!("Notifications go through SMTP host {}:{}", config.smtp, config.port);
        Box::new(SmtpNotifier::new(config.clone()))
    } else {
        debug!("No SMTP host or recipients configured, notifications disabled");
        Box::new(NullNotifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StringList;

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier
            .send(&["ops@example.com".to_string()], NOTIFICATION_SUBJECT, &Notification::plain("body"))
            .unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, vec!["ops@example.com".to_string()]);
        assert_eq!(sent[0].1, NOTIFICATION_SUBJECT);
        assert_eq!(sent[0].2.text, "body");
    }

    #[test]
    fn test_null_notifier_succeeds() {
        assert!(NullNotifier
            .send(&[], NOTIFICATION_SUBJECT, &Notification::plain("body"))
            .is_ok());
    }

    #[test]
    fn test_unconfigured_transport_is_disabled() {
        let mut config = NotificationConfig::default();
        assert!(!config.is_configured());

        config.smtp = "smtp.example.com".to_string();
        config.from = "baseliner@example.com".to_string();
        assert!(!config.is_configured());

        config.to = StringList::parse("ops@example.com");
        assert!(config.is_configured());
    }
}
