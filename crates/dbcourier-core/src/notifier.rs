use std::env;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::pipeline::BatchSummary;
use crate::{Error, Result};

/// Trait for delivering run status reports
///
/// Both operations are best-effort at the call site: the orchestrator discards
/// any error they raise, so reporting can never fail a batch.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report one target's failure with its full error detail.
    async fn report_failure(&self, target: &str, detail: &str) -> Result<()>;

    /// Report the end-of-run aggregate.
    async fn report_summary(&self, summary: &BatchSummary) -> Result<()>;
}

/// Notifier used when no reporting channel is configured. Both reports are
/// silent no-ops; an absent channel is not an error.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn report_failure(&self, target: &str, detail: &str) -> Result<()> {
        debug!(
            "No reporting channel configured; dropping failure report for '{}': {}",
            target, detail
        );
        Ok(())
    }

    async fn report_summary(&self, summary: &BatchSummary) -> Result<()> {
        debug!(
            "No reporting channel configured; dropping summary of {} target(s)",
            summary.total
        );
        Ok(())
    }
}

/// Plain-text SMTP notifier
pub struct EmailNotifier {
    smtp_host: String,
    smtp_port: u16,
    smtp_username: String,
    smtp_password: String,
    from_email: String,
    to_emails: Vec<String>,
}

impl EmailNotifier {
    /// Create an email notifier from environment variables
    ///
    /// Required environment variables:
    /// - SMTP_HOST: SMTP server hostname (e.g., smtp.gmail.com)
    /// - SMTP_PORT: SMTP server port (e.g., 587)
    /// - SMTP_USERNAME: SMTP authentication username
    /// - SMTP_PASSWORD: SMTP authentication password
    /// - SMTP_FROM_EMAIL: Sender email address
    /// - SMTP_TO_EMAILS: Comma-separated list of recipient emails
    pub fn from_env() -> Result<Self> {
        let smtp_host = env::var("SMTP_HOST")
            .map_err(|_| Error::Configuration("SMTP_HOST not set".to_string()))?;

        let smtp_port = env::var("SMTP_PORT")
            .map_err(|_| Error::Configuration("SMTP_PORT not set".to_string()))?
            .parse::<u16>()
            .map_err(|_| {
                Error::Configuration("SMTP_PORT must be a valid port number".to_string())
            })?;

        let smtp_username = env::var("SMTP_USERNAME")
            .map_err(|_| Error::Configuration("SMTP_USERNAME not set".to_string()))?;

        let smtp_password = env::var("SMTP_PASSWORD")
            .map_err(|_| Error::Configuration("SMTP_PASSWORD not set".to_string()))?;

        let from_email = env::var("SMTP_FROM_EMAIL")
            .map_err(|_| Error::Configuration("SMTP_FROM_EMAIL not set".to_string()))?;

        let to_emails_str = env::var("SMTP_TO_EMAILS")
            .map_err(|_| Error::Configuration("SMTP_TO_EMAILS not set".to_string()))?;

        let to_emails: Vec<String> = to_emails_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if to_emails.is_empty() {
            return Err(Error::Configuration(
                "SMTP_TO_EMAILS must contain at least one email".to_string(),
            ));
        }

        Ok(Self {
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            from_email,
            to_emails,
        })
    }

    fn send_plain(&self, subject: &str, body: &str) -> Result<()> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials, Message,
            SmtpTransport, Transport,
        };

        for to_email in &self.to_emails {
            let email = Message::builder()
                .from(self.from_email.parse().map_err(|e| {
                    Error::Configuration(format!("Invalid from email: {}", e))
                })?)
                .to(to_email.parse().map_err(|e| {
                    Error::Configuration(format!("Invalid to email '{}': {}", to_email, e))
                })?)
                .subject(subject)
                .header(ContentType::TEXT_PLAIN)
                .body(body.to_string())
                .map_err(|e| Error::Report(format!("Failed to build email: {}", e)))?;

            let creds = Credentials::new(self.smtp_username.clone(), self.smtp_password.clone());

            let mailer = SmtpTransport::relay(&self.smtp_host)
                .map_err(|e| Error::Report(format!("Failed to create SMTP transport: {}", e)))?
                .port(self.smtp_port)
                .credentials(creds)
                .build();

            mailer.send(&email).map_err(|e| {
                Error::Report(format!("Failed to send email to {}: {}", to_email, e))
            })?;

            info!("Report email sent to {}", to_email);
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn report_failure(&self, target: &str, detail: &str) -> Result<()> {
        let subject = format!("[dbcourier] Backup of '{}' failed", target);
        let body = format!(
            "Backup Failure\n\
             ==============\n\
             \n\
             Database: {}\n\
             \n\
             Error Detail:\n\
             {}\n\
             \n\
             Timestamp: {}\n",
            target,
            detail,
            chrono::Utc::now().to_rfc3339()
        );
        self.send_plain(&subject, &body)
    }

    async fn report_summary(&self, summary: &BatchSummary) -> Result<()> {
        let status = if summary.is_clean() { "OK" } else { "FAILURES" };
        let subject = format!(
            "[dbcourier] Backup run finished: {} ({}/{} succeeded)",
            status, summary.succeeded, summary.total
        );
        let body = format!(
            "Backup Run Summary\n\
             ==================\n\
             \n\
             Databases: {}\n\
             Succeeded: {}\n\
             Failed:    {}\n\
             Duration:  {} s\n\
             \n\
             Timestamp: {}\n",
            summary.total,
            summary.succeeded,
            summary.failed,
            summary.elapsed_secs(),
            chrono::Utc::now().to_rfc3339()
        );
        self.send_plain(&subject, &body)
    }
}
