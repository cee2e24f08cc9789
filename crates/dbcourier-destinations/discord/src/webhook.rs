use std::path::Path;

use dbcourier_core::{Error, Result};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::debug;

/// Severity colors used by the report embeds.
pub const COLOR_SUCCESS: u32 = 0x2ECC71;
pub const COLOR_FAILURE: u32 = 0xE74C3C;

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: true,
        }
    }
}

/// Minimal Discord webhook client: structured embeds and file uploads with a
/// caption. One webhook URL per client.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    url: String,
    http: reqwest::Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn post_embed(&self, embed: Embed) -> Result<()> {
        let payload = serde_json::json!({ "embeds": [embed] });
        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Report(format!("Webhook request failed: {}", e)))?;
        response
            .error_for_status()
            .map_err(|e| Error::Report(format!("Webhook rejected the embed: {}", e)))?;
        debug!("Posted embed to webhook");
        Ok(())
    }

    pub async fn upload_file(&self, path: &Path, caption: &str) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());

        let part = Part::bytes(bytes).file_name(file_name);
        let form = Form::new()
            .text("content", caption.to_string())
            .part("files[0]", part);

        let response = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("Webhook upload failed: {}", e)))?;
        response
            .error_for_status()
            .map_err(|e| Error::Delivery(format!("Webhook rejected the upload: {}", e)))?;
        debug!("Uploaded {} to webhook", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_serialize_in_webhook_shape() {
        let embed = Embed {
            title: "Backup run finished".into(),
            description: None,
            color: COLOR_SUCCESS,
            fields: vec![EmbedField::inline("Databases", "3")],
            timestamp: "2024-03-09T17:05:42+00:00".into(),
        };

        let value = serde_json::to_value(&embed).unwrap();
        assert_eq!(value["title"], "Backup run finished");
        assert_eq!(value["color"], COLOR_SUCCESS);
        assert_eq!(value["fields"][0]["name"], "Databases");
        assert_eq!(value["fields"][0]["inline"], true);
        assert!(value.get("description").is_none());
    }
}
