//! Email notifiers.
//!
//! - [`SmtpNotifier`]: STARTTLS SMTP via Lettre's async tokio transport
//! - [`ConsoleNotifier`]: logs instead of sending, for local development

use crate::config::EmailConfig;
use imaging_booking_core::providers::{BoxFuture, EmailMessage, Notifier, NotifyError};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

/// Build the notifier selected by `config`.
///
/// # Errors
///
/// Returns [`NotifyError::InvalidMessage`] if the sender address is invalid, or
/// [`NotifyError::Delivery`] if the SMTP transport cannot be configured.
pub fn from_config(config: &EmailConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match &config.smtp_host {
        Some(host) => Ok(Arc::new(SmtpNotifier::new(host, config)?)),
        None => {
            tracing::warn!("SMTP_HOST not set, emails will be logged instead of sent");
            Ok(Arc::new(ConsoleNotifier))
        },
    }
}

/// SMTP notifier using Lettre.
///
/// Cloning shares the transport.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Create a notifier for `host` with the sender and credentials in `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the sender address or relay host is invalid.
    pub fn new(host: &str, config: &EmailConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| NotifyError::InvalidMessage(format!("Invalid from address: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotifyError::Delivery(format!("SMTP relay error: {e}")))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        tracing::info!(host, port = config.smtp_port, "SMTP notifier configured");
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

}

fn build_message(from: &Mailbox, message: EmailMessage) -> Result<Message, NotifyError> {
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e| NotifyError::InvalidMessage(format!("Invalid to address: {e}")))?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(message.subject)
        .header(ContentType::TEXT_HTML)
        .body(message.html_body)
        .map_err(|e| NotifyError::InvalidMessage(format!("Failed to build email: {e}")))
}

impl Notifier for SmtpNotifier {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<(), NotifyError>> {
        Box::pin(async move {
            let email = build_message(&self.from, message)?;
            self.transport
                .send(email)
                .await
                .map(|_| ())
                .map_err(|e| NotifyError::Delivery(format!("Failed to send email: {e}")))
        })
    }
}

/// Notifier that only logs the subject line.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<(), NotifyError>> {
        Box::pin(async move {
            tracing::info!(
                subject = %message.subject,
                body_bytes = message.html_body.len(),
                "Email (console notifier, not sent)"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn email_config() -> EmailConfig {
        Config::from_lookup(|_| None).email
    }

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Appointment Confirmed".to_string(),
            html_body: "<p>See you soon</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_console_notifier_accepts_everything() {
        assert!(ConsoleNotifier.send(message("asha@example.com")).await.is_ok());
    }

    #[test]
    fn test_without_smtp_host_console_is_selected() {
        assert!(from_config(&email_config()).is_ok());
    }

    #[test]
    fn test_invalid_sender_is_rejected() {
        let mut config = email_config();
        config.from_email = "not an address".to_string();
        let result = SmtpNotifier::new("smtp.example.com", &config);
        assert!(matches!(result, Err(NotifyError::InvalidMessage(_))));
    }

    #[test]
    fn test_invalid_recipient_is_rejected_before_sending() {
        let from: Mailbox = "Imaging Centre <noreply@example.com>".parse().unwrap();
        let result = build_message(&from, message("nobody"));
        assert!(matches!(result, Err(NotifyError::InvalidMessage(_))));

        assert!(build_message(&from, message("asha@example.com")).is_ok());
    }
}
