use std::sync::Arc;

use common::metrics::EMAILS_TOTAL;
use tracing::{error, info};

use super::{send_with_retry, EmailMessage, EmailSender, HttpEmailSender, LogEmailSender, RetryConfig, EMAIL_RETRY_CONFIG};

/// Fire-and-forget facade over an `EmailSender`. Delivery problems are logged, never returned.
#[derive(Clone)]
pub struct Mailer {
    sender: Arc<dyn EmailSender>,
    from: String,
    retry: RetryConfig,
}

impl Mailer {
    pub fn new(sender: Arc<dyn EmailSender>, from: impl Into<String>, retry: RetryConfig) -> Self {
        Self { sender, from: from.into(), retry }
    }

    /// HTTP delivery when a provider URL is configured, log-only otherwise.
    pub fn from_config(cfg: &configs::EmailConfig) -> Self {
        let sender: Arc<dyn EmailSender> = if cfg.api_url.trim().is_empty() {
            Arc::new(LogEmailSender)
        } else {
            Arc::new(HttpEmailSender::new(cfg.api_url.clone(), cfg.api_key.clone()))
        };
        Self::new(sender, cfg.from.clone(), RetryConfig::from(cfg))
    }

    pub fn log_only() -> Self { Self::new(Arc::new(LogEmailSender), "no-reply@localhost", EMAIL_RETRY_CONFIG) }

    /// Deliver with retries; `true` when the provider accepted the message.
    pub async fn deliver(&self, msg: EmailMessage) -> bool {
        match send_with_retry(self.sender.as_ref(), &self.from, &msg, self.retry).await {
            Ok(attempts) => {
                EMAILS_TOTAL.with_label_values(&["sent"]).inc();
                info!(to = %msg.to, subject = %msg.subject, attempts, "email_sent");
                true
            }
            Err(e) => {
                EMAILS_TOTAL.with_label_values(&["failed"]).inc();
                error!(to = %msg.to, subject = %msg.subject, error = %e, "email_failed");
                false
            }
        }
    }

    /// Deliver in the background so the caller's request is not held up by retries.
    pub fn dispatch(&self, msg: EmailMessage) {
        let mailer = self.clone();
        tokio::spawn(async move {
            mailer.deliver(msg).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::testing::RecordingSender;
    use crate::email::templates;

    #[tokio::test]
    async fn failures_are_swallowed() {
        let sender = Arc::new(RecordingSender { fail_first: 10, ..Default::default() });
        let mailer = Mailer::new(sender.clone(), "from@x.io", RetryConfig { max_attempts: 2, base_delay_ms: 1, max_delay_ms: 1 });
        assert!(!mailer.deliver(templates::welcome("a@b.co", "A")).await);
        assert_eq!(*sender.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn delivers_rendered_template() {
        let sender = Arc::new(RecordingSender::default());
        let mailer = Mailer::new(sender.clone(), "from@x.io", EMAIL_RETRY_CONFIG);
        assert!(mailer.deliver(templates::refund_processed("a@b.co", 1500, "usd")).await);
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent[0].to, "a@b.co");
        assert!(sent[0].text.contains("USD 15.00"));
    }
}
