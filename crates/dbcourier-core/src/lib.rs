mod dumper;
mod error;
mod notifier;
mod packager;
mod pipeline;
mod targets;
mod transmitter;
mod value;

pub use dumper::{dump_preamble, DumpDocument, Dumper};
pub use error::{Error, Result};
pub use notifier::{EmailNotifier, NoopNotifier, Notifier};
pub use packager::{Artifact, Packager};
pub use pipeline::{BackupOutcome, BackupPipeline, BatchSummary};
pub use targets::TargetStore;
pub use transmitter::{format_size_mib, DeliveryReceipt, Transmitter};
pub use value::{SqlValue, TIMESTAMP_FORMAT};
