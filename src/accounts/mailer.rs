use async_trait::async_trait;
use lettre::{
    message::MultiPart,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Outbound mail seam. Single attempt, no retry, no queue; a failure
/// surfaces synchronously to the caller.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str, html: &str) -> anyhow::Result<()>;
}

/// Real SMTP transport (STARTTLS).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .port(config.port)
            .build();
        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, text: &str, html: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                text.to_string(),
                html.to_string(),
            ))?;

        self.transport.send(email).await?;
        info!(%to, %subject, "email sent");
        Ok(())
    }
}

/// Development fallback when SMTP is unconfigured: logs the message instead
/// of sending it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, text: &str, _html: &str) -> anyhow::Result<()> {
        info!(
            "=== EMAIL (not sent) ===\nTo: {}\nSubject: {}\n{}\n========================",
            to, subject, text
        );
        Ok(())
    }
}

pub const RESET_SUBJECT: &str = "Your password reset code - StayHub";

/// Plain-text and HTML bodies for the reset-code email.
pub fn reset_email_bodies(code: &str) -> (String, String) {
    let text = format!(
        "Your password reset code is: {code}\nValid for 10 minutes.\n\n\
         If you did not request this reset, you can ignore this email."
    );
    let html = format!(
        "<h2>Your password reset code</h2>\
         <p><strong>{code}</strong></p>\
         <p>Valid for 10 minutes.</p>\
         <p>If you did not request this reset, you can ignore this email.</p>"
    );
    (text, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_email_contains_code_and_validity() {
        let (text, html) = reset_email_bodies("042137");
        assert!(text.contains("042137"));
        assert!(text.contains("10 minutes"));
        assert!(html.contains("<strong>042137</strong>"));
        assert!(html.contains("10 minutes"));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mailer = LogMailer;
        let (text, html) = reset_email_bodies("123456");
        assert!(mailer
            .send("user@example.com", RESET_SUBJECT, &text, &html)
            .await
            .is_ok());
    }
}
