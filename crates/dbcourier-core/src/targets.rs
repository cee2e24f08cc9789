use async_trait::async_trait;

use crate::Result;

/// Durable, ordered list of backup targets, read at run start and mutable via
/// administrative commands between runs.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Load the configured target list. A missing document yields an empty
    /// list, not an error.
    async fn load(&self) -> Result<Vec<String>>;

    /// Replace the stored target list.
    async fn save(&self, targets: &[String]) -> Result<()>;
}
