//! SMTP delivery

use crate::config::NotificationConfig;
use crate::error::{Error, Result};
use crate::notify::{Notification, Notifier};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::debug;

pub struct SmtpNotifier {
    config: NotificationConfig,
}

impl SmtpNotifier {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, recipients: &[String], subject: &str, notification: &Notification) -> Result<Message> {
        let from: Mailbox = self
            .config
            .from
            .trim()
            .parse()
            .map_err(|e| Error::Notify(format!("invalid sender '{}': {}", self.config.from, e)))?;

        let mut builder = Message::builder().from(from).subject(subject);
        for recipient in recipients {
            let to: Mailbox = recipient
                .trim()
                .parse()
                .map_err(|e| Error::Notify(format!("invalid recipient '{}': {}", recipient, e)))?;
            builder = builder.to(to);
        }

        let message = match &notification.html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                notification.text.clone(),
                format!("<html><body>{}</body></html>", html),
            )),
            None => builder.singlepart(SinglePart::plain(notification.text.clone())),
        };

        message.map_err(|e| Error::Notify(format!("failed to build message: {}", e)))
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let host = self.config.smtp.trim();
        let builder = if self.config.starttls {
            SmtpTransport::starttls_relay(host)
                .map_err(|e| Error::Notify(format!("invalid SMTP relay '{}': {}", host, e)))?
        } else {
            SmtpTransport::builder_dangerous(host)
        };

        let builder = builder.port(self.config.port);
        let builder = if self.config.account.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                self.config.account.clone(),
                self.config.pass.clone(),
            ))
        };

        Ok(builder.build())
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, recipients: &[String], subject: &str, notification: &Notification) -> Result<()> {
        if recipients.is_empty() {
            return Err(Error::Notify("no recipients".to_string()));
        }

        let message = self.build_message(recipients, subject, notification)?;
        self.transport()?
            .send(&message)
            .map_err(|e| Error::Notify(format!("smtp error: {}", e)))?;

        debug!("Email sent to {} recipient(s)", recipients.len());
        Ok(())
    }
}
