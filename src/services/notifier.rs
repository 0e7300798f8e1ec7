use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::path::Path;
use crate::config::MailConfig;

/// Sends the outcome of a task to its recipients. One message per call.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_results(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> Result<()>;

    async fn send_no_results(&self, recipients: &[String], subject: &str, body: &str) -> Result<()>;
}

pub struct SmtpNotifier {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid sender address {}", config.from))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .with_context(|| format!("invalid SMTP relay {}", config.smtp_host))?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build();

        Ok(Self { from, transport })
    }

    fn build_message(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        attachment: Option<(String, Vec<u8>)>,
    ) -> Result<Message> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in recipients {
            let mailbox = recipient
                .parse::<Mailbox>()
                .with_context(|| format!("invalid recipient {}", recipient))?;
            builder = builder.to(mailbox);
        }

        let text = SinglePart::plain(body.to_string());
        let message = match attachment {
            Some((filename, content)) => {
                let csv = ContentType::parse("text/csv").context("invalid attachment content type")?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(text)
                        .singlepart(Attachment::new(filename).body(content, csv)),
                )?
            }
            None => builder.singlepart(text)?,
        };
        Ok(message)
    }

    async fn deliver(&self, message: Message) -> Result<()> {
        self.transport.send(message).await.context("SMTP delivery failed")?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_results(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> Result<()> {
        let content = tokio::fs::read(attachment)
            .await
            .with_context(|| format!("failed to read {}", attachment.display()))?;
        let filename = attachment
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("results.csv")
            .to_string();

        let message = self.build_message(recipients, subject, body, Some((filename, content)))?;
        self.deliver(message).await?;
        tracing::info!("Sent results email to {:?}", recipients);
        Ok(())
    }

    async fn send_no_results(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
        let message = self.build_message(recipients, subject, body, None)?;
        self.deliver(message).await?;
        tracing::info!("Sent no-results email to {:?}", recipients);
        Ok(())
    }
}

/// Stands in for mail delivery when it is disabled.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_results(
        &self,
        recipients: &[String],
        subject: &str,
        _body: &str,
        attachment: &Path,
    ) -> Result<()> {
        tracing::info!(
            "Mail disabled; would send '{}' with {} to {:?}",
            subject,
            attachment.display(),
            recipients
        );
        Ok(())
    }

    async fn send_no_results(&self, recipients: &[String], subject: &str, _body: &str) -> Result<()> {
        tracing::info!("Mail disabled; would send '{}' (no results) to {:?}", subject, recipients);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> SmtpNotifier {
        let config = MailConfig {
            enabled: true,
            smtp_host: "localhost".into(),
            smtp_port: 2525,
            username: "user".into(),
            password: "secret".into(),
            from: "Tenders <tenders@example.com>".into(),
        };
        SmtpNotifier::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn results_message_carries_attachment() {
        let recipients = vec!["a@example.com".to_string(), "b@example.com".to_string()];
        let message = notifier()
            .build_message(
                &recipients,
                "Search Results for pumps",
                "Keywords: pumps",
                Some(("tenders_2024-01-02_filtered.csv".into(), b"id,title\n1,pumps\n".to_vec())),
            )
            .unwrap();

        assert_eq!(message.envelope().to().len(), 2);
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("Subject: Search Results for pumps"));
        assert!(raw.contains("tenders_2024-01-02_filtered.csv"));
        assert!(raw.contains("text/csv"));
    }

    #[tokio::test]
    async fn no_results_message_is_plain() {
        let message = notifier()
            .build_message(&["a@example.com".to_string()], "Search Results for x", "body", None)
            .unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(!raw.contains("multipart/mixed"));
    }

    #[tokio::test]
    async fn bad_recipient_is_rejected() {
        let result = notifier().build_message(&["not an address".to_string()], "s", "b", None);
        assert!(result.is_err());
    }
}
