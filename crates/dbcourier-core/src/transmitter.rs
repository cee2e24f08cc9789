use std::path::Path;

use async_trait::async_trait;

use crate::Result;

/// Confirmation that an artifact reached its destination.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryReceipt {
    pub bytes_sent: u64,
}

/// Trait for delivering artifacts to a destination channel
#[async_trait]
pub trait Transmitter: Send + Sync {
    /// Deliver the artifact at `artifact` under the human-readable `label`.
    ///
    /// Fails with [`Error::DestinationUnset`](crate::Error::DestinationUnset)
    /// before any network call when no destination is configured, and with
    /// [`Error::Delivery`](crate::Error::Delivery) otherwise.
    async fn send(&self, artifact: &Path, label: &str) -> Result<DeliveryReceipt>;
}

/// Formats a byte count as mebibytes with two decimal places.
pub fn format_size_mib(bytes: u64) -> String {
    format!("{:.2} MiB", bytes as f64 / (1024.0 * 1024.0))
}
