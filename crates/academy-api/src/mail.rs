//! Outgoing mail
//!
//! Delivery itself happens elsewhere; the API only hands over the recipient
//! and the one-time token to embed in the link.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, name: &str, token: &str) -> Result<(), MailError>;

    async fn send_password_reset(&self, to: &str, name: &str, token: &str)
    -> Result<(), MailError>;
}

/// Mailer that writes messages to the log
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, to: &str, name: &str, token: &str) -> Result<(), MailError> {
        info!("Verification email for {} <{}>", name, to);
        debug!("Verification token for {}: {}", to, token);
        Ok(())
    }

    async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), MailError> {
        info!("Password reset email for {} <{}>", name, to);
        debug!("Password reset token for {}: {}", to, token);
        Ok(())
    }
}
