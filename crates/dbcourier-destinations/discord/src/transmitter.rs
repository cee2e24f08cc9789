use std::path::Path;

use async_trait::async_trait;
use dbcourier_core::{format_size_mib, DeliveryReceipt, Error, Result, Transmitter};
use tracing::info;

use crate::webhook::WebhookClient;

/// Delivers finished archives to the configured backup channel.
pub struct DiscordTransmitter {
    webhook: Option<WebhookClient>,
}

impl DiscordTransmitter {
    /// `None` models a destination that was never configured; sending then
    /// fails with the distinguished misconfiguration error instead of a
    /// delivery error.
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook: webhook_url.map(WebhookClient::new),
        }
    }
}

#[async_trait]
impl Transmitter for DiscordTransmitter {
    async fn send(&self, artifact: &Path, label: &str) -> Result<DeliveryReceipt> {
        let webhook = self.webhook.as_ref().ok_or(Error::DestinationUnset)?;

        let bytes_sent = tokio::fs::metadata(artifact).await?.len();
        let size = format_size_mib(bytes_sent);
        let caption = format!("`{}` ({})", label, size);

        webhook.upload_file(artifact, &caption).await?;
        info!("[{}] Delivered {} to the backup channel", label, size);

        Ok(DeliveryReceipt { bytes_sent })
    }
}
