//! Outbound email transports.
//!
//! The server never speaks SMTP itself: [`LogMailer`] records the message
//! through tracing and [`OutboxMailer`] drops `.eml` files into a directory
//! watched by the relay.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use stoactl_core::email::EmailMessage;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to write outbox message: {0}")]
    Io(#[from] std::io::Error),

    #[error("message rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Logs each message instead of delivering it
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "email (log transport)"
        );
        tracing::debug!(body = %message.text_body, "email body");
        Ok(())
    }
}

/// Writes one `.eml` file per message
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if !message.to.contains('@') {
            return Err(MailError::Rejected(format!("invalid recipient '{}'", message.to)));
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let id = Uuid::new_v4().simple().to_string();
        let name = format!("{}-{}.eml", Utc::now().format("%Y%m%dT%H%M%S"), &id[..8]);
        let path = self.dir.join(name);
        tokio::fs::write(&path, message.to_eml(&format!("stoactl-{id}"))).await?;
        tracing::info!(to = %message.to, path = %path.display(), "email written to outbox");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            from: "noreply@example.com".into(),
            to: to.into(),
            subject: "Covenant reminder".into(),
            text_body: "due soon".into(),
            html_body: "<p>due soon</p>".into(),
        }
    }

    #[tokio::test]
    async fn outbox_writes_eml_file() {
        let dir = TempDir::new().unwrap();
        let mailer = OutboxMailer::new(dir.path().join("outbox"));
        mailer.send(&message("banker@example.com")).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("outbox"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].extension().unwrap(), "eml");
        let content = std::fs::read_to_string(&entries[0]).unwrap();
        assert!(content.contains("To: banker@example.com"));
    }

    #[tokio::test]
    async fn outbox_rejects_bad_recipient() {
        let dir = TempDir::new().unwrap();
        let mailer = OutboxMailer::new(dir.path());
        assert!(matches!(
            mailer.send(&message("nobody")).await,
            Err(MailError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        LogMailer.send(&message("x@example.com")).await.unwrap();
    }
}
