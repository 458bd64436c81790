//! Transactional email.
//!
//! Delivery is always best effort: callers log failures and carry on.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::database::models::Account;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mail provider rejected the message ({status}): {message}")]
    Provider { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Email {
    pub fn welcome(account: &Account) -> Self {
        Self {
            to: account.email.clone(),
            subject: "Welcome to Nurture".to_string(),
            text: format!(
                "Hi {},\n\nYour account is ready. Sign in to finish setting up your profile.\n\nThe Nurture team",
                account.first_name
            ),
        }
    }

    pub fn collaborator_verified(account: &Account) -> Self {
        Self {
            to: account.email.clone(),
            subject: "Your Nurture collaborator account is verified".to_string(),
            text: format!(
                "Hi {},\n\nYour profile has been verified. You can now publish classes and events.\n\nThe Nurture team",
                account.first_name
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

pub fn from_config(config: &EmailConfig) -> Arc<dyn Mailer> {
    match (&config.api_url, &config.api_key) {
        (Some(url), Some(key)) => {
            info!(from = %config.from_address, "Using HTTP mail delivery");
            Arc::new(HttpMailer::new(url.clone(), key.clone(), config.from_address.clone()))
        }
        _ => {
            warn!("Email delivery is not configured, messages are logged instead");
            Arc::new(LogMailer::default())
        }
    }
}

/// Posts JSON messages to a transactional email API with a bearer key
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [email.to],
                "subject": email.subject,
                "text": email.text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Provider {
                status: status.as_u16(),
                message,
            });
        }
        info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Logs instead of sending; keeps what it "sent" for inspection
#[derive(Default)]
pub struct LogMailer {
    outbox: Mutex<Vec<Email>>,
}

impl LogMailer {
    pub fn outbox(&self) -> Vec<Email> {
        self.outbox.lock().clone()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "Email delivery disabled, message logged");
        self.outbox.lock().push(email);
        Ok(())
    }
}

/// Send and log any failure; never fails the caller
pub async fn deliver(mailer: &dyn Mailer, email: Email) {
    let to = email.to.clone();
    if let Err(e) = mailer.send(email).await {
        warn!(to = %to, error = %e, "Email delivery failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[tokio::test]
    async fn log_mailer_records_messages() {
        let mailer = LogMailer::default();
        let account = Account::new("ana@example.com", String::new(), "Ana".into(), "Lima".into(), None, Role::Mother);
        deliver(&mailer, Email::welcome(&account)).await;

        let outbox = mailer.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to, "ana@example.com");
        assert!(outbox[0].text.contains("Hi Ana"));
    }
}
