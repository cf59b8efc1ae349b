//! Outgoing mail. Messages go to an HTTP relay when one is configured and
//! are only logged otherwise.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> ServiceResult<()>;
}

#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> ServiceResult<()> {
        info!(to = %mail.to, subject = %mail.subject, body = %mail.text, "mail relay disabled; message logged");
        Ok(())
    }
}

/// Posts `{from, to, subject, text}` as JSON to the relay endpoint.
pub struct HttpMailer {
    client: reqwest::Client,
    url: String,
}

impl HttpMailer {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, mail), fields(to = %mail.to))]
    async fn send(&self, mail: OutgoingMail) -> ServiceResult<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(&mail)
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ServiceError::Upstream(format!("mail relay returned {}", resp.status())));
        }
        info!("mail sent");
        Ok(())
    }
}

/// Pick the transport from config.
pub fn from_config(cfg: &configs::MailConfig) -> anyhow::Result<Box<dyn Mailer>> {
    Ok(match cfg.relay_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Box::new(HttpMailer::new(url)?),
        None => Box::new(LogMailer),
    })
}

/// Keeps sent mail in memory.
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub fn outbox(&self) -> Vec<OutgoingMail> {
        self.outbox.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> ServiceResult<()> {
        self.outbox
            .lock()
            .map_err(|e| ServiceError::Upstream(e.to_string()))?
            .push(mail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_mailer_keeps_messages() {
        let m = MemoryMailer::default();
        let mail = OutgoingMail { from: "a@x".into(), to: "b@x".into(), subject: "s".into(), text: "t".into() };
        m.send(mail.clone()).await.unwrap();
        assert_eq!(m.outbox(), vec![mail]);
    }

    #[test]
    fn blank_relay_means_log_only() {
        let cfg = configs::MailConfig { relay_url: Some("  ".into()), from: "no-reply@cultucat.cat".into() };
        assert!(from_config(&cfg).is_ok());
    }
}
