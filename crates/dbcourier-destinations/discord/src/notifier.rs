use async_trait::async_trait;
use chrono::Utc;
use dbcourier_core::{BatchSummary, Notifier, Result};
use tracing::debug;

use crate::webhook::{Embed, EmbedField, WebhookClient, COLOR_FAILURE, COLOR_SUCCESS};

/// Posts failure and summary embeds to the configured report channel.
pub struct DiscordNotifier {
    webhook: Option<WebhookClient>,
}

impl DiscordNotifier {
    /// An unset report channel makes every report a silent no-op.
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook: webhook_url.map(WebhookClient::new),
        }
    }
}

fn failure_embed(target: &str, detail: &str) -> Embed {
    Embed {
        title: format!("Backup of `{}` failed", target),
        description: Some(format!("```\n{}\n```", detail)),
        color: COLOR_FAILURE,
        fields: Vec::new(),
        timestamp: Utc::now().to_rfc3339(),
    }
}

fn summary_embed(summary: &BatchSummary) -> Embed {
    let color = if summary.is_clean() {
        COLOR_SUCCESS
    } else {
        COLOR_FAILURE
    };
    Embed {
        title: "Backup run finished".to_string(),
        description: None,
        color,
        fields: vec![
            EmbedField::inline("Databases", summary.total.to_string()),
            EmbedField::inline("Succeeded", summary.succeeded.to_string()),
            EmbedField::inline("Failed", summary.failed.to_string()),
            EmbedField::inline("Duration", format!("{} s", summary.elapsed_secs())),
        ],
        timestamp: Utc::now().to_rfc3339(),
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn report_failure(&self, target: &str, detail: &str) -> Result<()> {
        let Some(webhook) = &self.webhook else {
            debug!("[{}] No report channel configured; failure not reported", target);
            return Ok(());
        };
        webhook.post_embed(failure_embed(target, detail)).await
    }

    async fn report_summary(&self, summary: &BatchSummary) -> Result<()> {
        let Some(webhook) = &self.webhook else {
            debug!("No report channel configured; summary not reported");
            return Ok(());
        };
        webhook.post_embed(summary_embed(summary)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn summary(failed: usize) -> BatchSummary {
        BatchSummary {
            total: 3,
            succeeded: 3 - failed,
            failed,
            elapsed: Duration::from_millis(12_340),
        }
    }

    #[test]
    fn failure_embed_names_the_target_in_a_code_block() {
        let embed = failure_embed("shop", "Query error: table scan failed");
        assert!(embed.title.contains("`shop`"));
        let description = embed.description.unwrap();
        assert!(description.starts_with("```\n"));
        assert!(description.contains("table scan failed"));
        assert_eq!(embed.color, COLOR_FAILURE);
    }

    #[test]
    fn summary_severity_follows_the_failure_count() {
        assert_eq!(summary_embed(&summary(0)).color, COLOR_SUCCESS);
        assert_eq!(summary_embed(&summary(1)).color, COLOR_FAILURE);
    }

    #[test]
    fn summary_fields_carry_counts_and_duration() {
        let embed = summary_embed(&summary(1));
        let values: Vec<&str> = embed.fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, vec!["3", "2", "1", "12.34 s"]);
    }

    #[tokio::test]
    async fn reports_without_a_channel_are_silent_no_ops() {
        let notifier = DiscordNotifier::new(None);
        notifier.report_failure("shop", "boom").await.unwrap();
        notifier.report_summary(&summary(0)).await.unwrap();
    }
}
