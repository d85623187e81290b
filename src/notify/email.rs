// src/notify/email.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use crate::error::PipelineError;

use super::Mailer;

/// SMTP mailer. Recipient is per call; sender identity and relay come from
/// the environment (SMTP_HOST, SMTP_USER, SMTP_PASS, NOTIFY_EMAIL_FROM).
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST missing")?;
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;
        let from_addr = std::env::var("NOTIFY_EMAIL_FROM").context("NOTIFY_EMAIL_FROM missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();
        let from = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> crate::error::Result<()> {
        let mail_err = |reason: String| PipelineError::Mail {
            to: to.to_string(),
            reason,
        };

        let to_mbox: Mailbox = to.parse().map_err(|e| mail_err(format!("address: {e}")))?;
        let msg = Message::builder()
            .from(self.from.clone())
            .to(to_mbox)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| mail_err(format!("build: {e}")))?;

        self.mailer
            .send(msg)
            .await
            .map_err(|e| mail_err(e.to_string()))?;
        Ok(())
    }
}
