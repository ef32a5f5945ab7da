//! Transactional email: message type, senders, retry policy, templates.

pub mod mailer;
pub mod templates;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use mailer::Mailer;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email transport error: {0}")]
    Transport(String),
    #[error("email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, from: &str, msg: &EmailMessage) -> Result<(), EmailError>;
}

/// JSON POST to a transactional provider, bearer-authenticated.
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpEmailSender {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), api_url: api_url.into(), api_key: api_key.into() }
    }
}

#[derive(Serialize)]
struct ProviderPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, from: &str, msg: &EmailMessage) -> Result<(), EmailError> {
        let payload = ProviderPayload { from, to: [&msg.to], subject: &msg.subject, text: &msg.text, html: msg.html.as_deref() };
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmailError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them.
#[derive(Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, from: &str, msg: &EmailMessage) -> Result<(), EmailError> {
        info!(from, to = %msg.to, subject = %msg.subject, "email_logged");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

pub const EMAIL_RETRY_CONFIG: RetryConfig = RetryConfig { max_attempts: 3, base_delay_ms: 500, max_delay_ms: 5_000 };

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1), capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }
}

impl From<&configs::EmailConfig> for RetryConfig {
    fn from(c: &configs::EmailConfig) -> Self {
        RetryConfig { max_attempts: c.max_attempts, base_delay_ms: c.base_delay_ms, max_delay_ms: c.max_delay_ms }
    }
}

/// Send with exponential backoff; returns the last error after `max_attempts`.
pub async fn send_with_retry(sender: &dyn EmailSender, from: &str, msg: &EmailMessage, retry: RetryConfig) -> Result<u32, EmailError> {
    let attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match sender.send(from, msg).await {
            Ok(()) => return Ok(attempt),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                let delay = retry.delay_for(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, to = %msg.to, "email_retry");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records messages and fails the first `fail_first` sends.
    #[derive(Default)]
    pub struct RecordingSender {
        pub sent: Mutex<Vec<EmailMessage>>,
        pub calls: Mutex<u32>,
        pub fail_first: u32,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, _from: &str, msg: &EmailMessage) -> Result<(), EmailError> {
            let call = {
                let mut c = self.calls.lock().unwrap();
                *c += 1;
                *c
            };
            if call <= self.fail_first {
                return Err(EmailError::Transport("temporary".into()));
            }
            self.sent.lock().unwrap().push(msg.clone());
            Ok(())
        }
    }
}
