//! SMTP notifier using Lettre.

use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use raffle_core::providers::Notifier;
use raffle_core::{Notification, RaffleError, Result};

/// Sends winner notifications as HTML email.
#[derive(Clone)]
pub struct SmtpNotifier {
    smtp_server: String,
    smtp_port: u16,
    credentials: Credentials,
    from_email: String,
    from_name: String,
}

impl SmtpNotifier {
    /// Create a notifier from SMTP settings.
    #[must_use]
    pub fn new(config: &SmtpConfig) -> Self {
        Self {
            smtp_server: config.host.clone(),
            smtp_port: config.port,
            credentials: Credentials::new(config.username.clone(), config.password.clone()),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }

    /// Creates a new transport for each email.
    fn build_transport(&self) -> Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| RaffleError::StorageFailure(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    /// Build the email for one recipient.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Validation`] for an unusable address.
    pub fn build_message(&self, to: &str, notification: &Notification) -> Result<Message> {
        Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| RaffleError::Validation(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| RaffleError::Validation(format!("Invalid to address: {e}")))?)
            .subject(notification.subject())
            .header(ContentType::TEXT_HTML)
            .body(render_html(notification))
            .map_err(|e| RaffleError::Validation(format!("Failed to build email: {e}")))
    }
}

/// Render the HTML body for a notification.
#[must_use]
pub fn render_html(notification: &Notification) -> String {
    let content = match notification {
        Notification::WinnerNotification {
            user_full_name,
            raffle_name,
            raffle_description,
            winning_number,
            creator_full_name,
            creator_email,
        } => format!(
            r#"<h2 style="color: #16a34a;">Congratulations, {user_full_name}!</h2>
        <p>Your ticket <strong>#{winning_number}</strong> won the raffle <strong>{raffle_name}</strong>.</p>
        <p>{raffle_description}</p>
        <p>Contact {creator_full_name} at <a href="mailto:{creator_email}">{creator_email}</a> to claim your prize.</p>"#
        ),
        Notification::WinnerAnnouncement {
            raffle_name,
            winning_number,
            creator_full_name,
            creator_email,
        } => format!(
            r#"<h2 style="color: #2563eb;">{raffle_name} has a winner</h2>
        <p>The winning ticket is <strong>#{winning_number}</strong>. Thank you for taking part.</p>
        <p>Questions? Write to {creator_full_name} at <a href="mailto:{creator_email}">{creator_email}</a>.</p>"#
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{subject}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        {content}
    </div>
</body>
</html>
"#,
        subject = notification.subject()
    )
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, notification: &Notification) -> Result<()> {
        let email = self.build_message(to, notification)?;
        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| RaffleError::StorageFailure(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| RaffleError::StorageFailure(format!("Email task failed: {e}")))?
        .map(|_| ())
    }
}
