use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::dumper::Dumper;
use crate::notifier::Notifier;
use crate::packager::{Artifact, Packager};
use crate::targets::TargetStore;
use crate::transmitter::Transmitter;
use crate::{Error, Result};

/// Result of one target's pass through the pipeline.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BackupOutcome {
    pub target: String,
    pub error: Option<String>,
}

impl BackupOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate of one orchestration run, handed to the notifier and discarded.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Elapsed seconds with two decimal places, for reports.
    pub fn elapsed_secs(&self) -> String {
        format!("{:.2}", self.elapsed.as_secs_f64())
    }
}

/// Orchestrates dump → compress → transmit → cleanup over the configured
/// targets, strictly in list order and strictly sequentially.
pub struct BackupPipeline {
    store: Arc<dyn TargetStore>,
    dumper: Arc<dyn Dumper>,
    packager: Packager,
    transmitter: Arc<dyn Transmitter>,
    notifier: Arc<dyn Notifier>,
    staging_dir: PathBuf,
    running: AtomicBool,
}

impl BackupPipeline {
    pub fn new(
        store: Arc<dyn TargetStore>,
        dumper: Arc<dyn Dumper>,
        transmitter: Arc<dyn Transmitter>,
        notifier: Arc<dyn Notifier>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            dumper,
            packager: Packager,
            transmitter,
            notifier,
            staging_dir: staging_dir.into(),
            running: AtomicBool::new(false),
        }
    }

    /// Execute one full run over the stored target list.
    ///
    /// Per-target failures are absorbed into the returned summary; only
    /// precondition failures ([`Error::EmptyTargetList`],
    /// [`Error::RunInProgress`] and a failing store load) propagate.
    pub async fn run(&self) -> Result<BatchSummary> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::RunInProgress);
        }

        let result = self.run_guarded().await;
        self.running.store(false, Ordering::Release);
        result
    }

    async fn run_guarded(&self) -> Result<BatchSummary> {
        let targets = self.store.load().await?;
        if targets.is_empty() {
            return Err(Error::EmptyTargetList);
        }

        info!("Starting backup run over {} target(s)", targets.len());
        let started = Instant::now();
        let mut succeeded = 0usize;
        let mut failed = 0usize;

        for target in &targets {
            let outcome = self.process_target(target).await;
            match &outcome.error {
                Some(detail) => {
                    failed += 1;
                    error!("[{}] Backup failed: {}", target, detail);
                    if let Err(e) = self.notifier.report_failure(target, detail).await {
                        warn!("[{}] Failure report was not delivered: {}", target, e);
                    }
                }
                None => {
                    succeeded += 1;
                    info!("[{}] Backup completed", target);
                }
            }
        }

        let summary = BatchSummary {
            total: targets.len(),
            succeeded,
            failed,
            elapsed: started.elapsed(),
        };
        info!(
            "Backup run finished: {}/{} succeeded in {} s",
            summary.succeeded,
            summary.total,
            summary.elapsed_secs()
        );

        if let Err(e) = self.notifier.report_summary(&summary).await {
            warn!("Summary report was not delivered: {}", e);
        }

        Ok(summary)
    }

    /// Runs one target through the pipeline; the staged files are removed on
    /// every outcome before this returns.
    async fn process_target(&self, target: &str) -> BackupOutcome {
        let mut staged: Option<Artifact> = None;
        let result = self.back_up(target, &mut staged).await;

        if let Some(artifact) = &staged {
            self.clean_up(artifact);
        }

        BackupOutcome {
            target: target.to_string(),
            error: result.err().map(|e| e.to_string()),
        }
    }

    async fn back_up(&self, target: &str, staged: &mut Option<Artifact>) -> Result<()> {
        let document = self.dumper.dump(target).await?;

        // record the staging paths before any file exists so cleanup covers
        // a packager that failed mid-write
        let artifact = Artifact::for_document(&document, &self.staging_dir);
        *staged = Some(artifact.clone());

        self.packager.compress(&document, &artifact)?;

        let receipt = self
            .transmitter
            .send(&artifact.archive_path, target)
            .await?;
        debug!("[{}] Delivered {} byte(s)", target, receipt.bytes_sent);

        Ok(())
    }

    /// Deletion must never raise; leftovers are logged and forgotten.
    fn clean_up(&self, artifact: &Artifact) {
        for path in [&artifact.dump_path, &artifact.archive_path] {
            if !path.exists() {
                continue;
            }
            if let Err(e) = fs::remove_file(path) {
                debug!("Leaving {} behind: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dumper::DumpDocument;
    use crate::transmitter::DeliveryReceipt;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::path::Path;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    struct MemoryStore(Vec<String>);

    #[async_trait]
    impl TargetStore for MemoryStore {
        async fn load(&self) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }

        async fn save(&self, _targets: &[String]) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct ScriptedDumper {
        failing: Vec<String>,
        dumped: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Dumper for ScriptedDumper {
        async fn dump(&self, target: &str) -> Result<DumpDocument> {
            self.dumped.lock().unwrap().push(target.to_string());
            if self.failing.iter().any(|t| t == target) {
                return Err(Error::Query(format!("table scan failed on '{target}'")));
            }
            Ok(DumpDocument {
                database: target.to_string(),
                generated_at: Utc::now(),
                sql: format!("-- dump of {target}\n"),
            })
        }
    }

    #[derive(Default)]
    struct RecordingTransmitter {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transmitter for RecordingTransmitter {
        async fn send(&self, artifact: &Path, label: &str) -> Result<DeliveryReceipt> {
            assert!(artifact.exists(), "artifact must exist when transmitted");
            self.sent.lock().unwrap().push(label.to_string());
            Ok(DeliveryReceipt { bytes_sent: 1 })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        failures: Mutex<Vec<String>>,
        summaries: Mutex<Vec<BatchSummary>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn report_failure(&self, target: &str, _detail: &str) -> Result<()> {
            self.failures.lock().unwrap().push(target.to_string());
            Ok(())
        }

        async fn report_summary(&self, summary: &BatchSummary) -> Result<()> {
            self.summaries.lock().unwrap().push(summary.clone());
            Ok(())
        }
    }

    fn pipeline_with(
        targets: &[&str],
        dumper: Arc<ScriptedDumper>,
        transmitter: Arc<RecordingTransmitter>,
        notifier: Arc<RecordingNotifier>,
        staging_dir: &Path,
    ) -> BackupPipeline {
        let targets = targets.iter().map(|t| t.to_string()).collect();
        BackupPipeline::new(
            Arc::new(MemoryStore(targets)),
            dumper,
            transmitter,
            notifier,
            staging_dir,
        )
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let dumper = Arc::new(ScriptedDumper {
            failing: vec!["beta".to_string()],
            ..Default::default()
        });
        let transmitter = Arc::new(RecordingTransmitter::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let pipeline = pipeline_with(
            &["alpha", "beta"],
            dumper.clone(),
            transmitter.clone(),
            notifier.clone(),
            dir.path(),
        );

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded + summary.failed, summary.total);

        assert_eq!(*dumper.dumped.lock().unwrap(), vec!["alpha", "beta"]);
        assert_eq!(*transmitter.sent.lock().unwrap(), vec!["alpha"]);
        assert_eq!(*notifier.failures.lock().unwrap(), vec!["beta"]);
        assert_eq!(notifier.summaries.lock().unwrap().len(), 1);

        // no staged file survives either target's processing step
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_target_list_fails_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let dumper = Arc::new(ScriptedDumper::default());
        let transmitter = Arc::new(RecordingTransmitter::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let pipeline = pipeline_with(
            &[],
            dumper.clone(),
            transmitter.clone(),
            notifier.clone(),
            dir.path(),
        );

        let result = pipeline.run().await;

        assert!(matches!(result, Err(Error::EmptyTargetList)));
        assert!(dumper.dumped.lock().unwrap().is_empty());
        assert!(transmitter.sent.lock().unwrap().is_empty());
        assert!(notifier.summaries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn targets_are_processed_in_configured_order() {
        let dir = tempfile::tempdir().unwrap();
        let dumper = Arc::new(ScriptedDumper::default());
        let transmitter = Arc::new(RecordingTransmitter::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let pipeline = pipeline_with(
            &["zeta", "alpha", "mu"],
            dumper.clone(),
            transmitter.clone(),
            notifier.clone(),
            dir.path(),
        );

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.succeeded, 3);
        assert_eq!(*dumper.dumped.lock().unwrap(), vec!["zeta", "alpha", "mu"]);
        assert_eq!(*transmitter.sent.lock().unwrap(), vec!["zeta", "alpha", "mu"]);
    }

    struct FailingTransmitter;

    #[async_trait]
    impl Transmitter for FailingTransmitter {
        async fn send(&self, _artifact: &Path, _label: &str) -> Result<DeliveryReceipt> {
            Err(Error::Delivery("channel rejected the upload".to_string()))
        }
    }

    #[tokio::test]
    async fn staged_files_are_removed_when_transmission_fails() {
        let dir = tempfile::tempdir().unwrap();
        let dumper = Arc::new(ScriptedDumper::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let pipeline = BackupPipeline::new(
            Arc::new(MemoryStore(vec!["alpha".to_string()])),
            dumper,
            Arc::new(FailingTransmitter),
            notifier.clone(),
            dir.path(),
        );

        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(*notifier.failures.lock().unwrap(), vec!["alpha"]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    struct BlockingDumper {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Dumper for BlockingDumper {
        async fn dump(&self, target: &str) -> Result<DumpDocument> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(DumpDocument {
                database: target.to_string(),
                generated_at: Utc::now(),
                sql: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn overlapping_runs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dumper = Arc::new(BlockingDumper {
            started: Notify::new(),
            release: Notify::new(),
        });
        let pipeline = Arc::new(BackupPipeline::new(
            Arc::new(MemoryStore(vec!["alpha".to_string()])),
            dumper.clone(),
            Arc::new(RecordingTransmitter::default()),
            Arc::new(RecordingNotifier::default()),
            dir.path(),
        ));

        let first = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.run().await }
        });
        dumper.started.notified().await;

        let second = pipeline.run().await;
        assert!(matches!(second, Err(Error::RunInProgress)));

        dumper.release.notify_one();
        let summary = first.await.unwrap().unwrap();
        assert_eq!(summary.total, 1);

        // the guard is released once the run completes
        dumper.release.notify_one();
        let third = pipeline.run().await;
        assert!(third.is_ok());
    }
}
