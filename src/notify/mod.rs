// src/notify/mod.rs
pub mod dispatcher;
pub mod email;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Delivers one message to one address.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

pub type DynMailer = Arc<dyn Mailer>;

/// Logs instead of sending. Used when SMTP is not configured so the rest of
/// the pipeline stays exercisable locally.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        tracing::info!(to, subject, "mail suppressed (no SMTP configured)");
        Ok(())
    }
}
